/// SQL DDL for the kazi-store database.
/// WAL mode + foreign keys enabled at connection time.
/// Monetary columns are decimal text; timestamps are RFC 3339 text.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS engagements (
    id TEXT PRIMARY KEY,
    client TEXT NOT NULL,
    service TEXT NOT NULL,
    review_partner_id TEXT,
    deleted_at TEXT,
    deleted_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task_templates (
    id TEXT PRIMARY KEY,
    service TEXT NOT NULL,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    engagement_id TEXT NOT NULL REFERENCES engagements(id),
    template_id TEXT REFERENCES task_templates(id),
    title TEXT NOT NULL,
    description TEXT,
    assignee_id TEXT NOT NULL,
    creator_id TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'assigned',
    priority TEXT NOT NULL DEFAULT 'medium',
    recurrence TEXT NOT NULL DEFAULT 'none',
    estimated_minutes INTEGER,
    deadline TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    deleted_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id TEXT NOT NULL REFERENCES tasks(id),
    actor_id TEXT NOT NULL,
    status TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT
);

CREATE TABLE IF NOT EXISTS task_approvals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id TEXT NOT NULL REFERENCES tasks(id),
    reviewer_id TEXT NOT NULL,
    stage TEXT NOT NULL,
    decision TEXT NOT NULL,
    remarks TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS period_ledgers (
    id TEXT PRIMARY KEY,
    engagement_id TEXT NOT NULL REFERENCES engagements(id),
    period TEXT NOT NULL,
    nature_of_business TEXT,
    comments TEXT,
    reg_vatable_16 TEXT NOT NULL DEFAULT '0',
    reg_vatable_8 TEXT NOT NULL DEFAULT '0',
    reg_zero_rated TEXT NOT NULL DEFAULT '0',
    reg_exempt TEXT NOT NULL DEFAULT '0',
    non_reg_vatable_16 TEXT NOT NULL DEFAULT '0',
    non_reg_vatable_8 TEXT NOT NULL DEFAULT '0',
    non_reg_zero_rated TEXT NOT NULL DEFAULT '0',
    non_reg_exempt TEXT NOT NULL DEFAULT '0',
    purchases_vatable_16 TEXT NOT NULL DEFAULT '0',
    purchases_vatable_8 TEXT NOT NULL DEFAULT '0',
    purchases_zero_rated TEXT NOT NULL DEFAULT '0',
    purchases_exempt TEXT NOT NULL DEFAULT '0',
    vat_wh_credit TEXT NOT NULL DEFAULT '0',
    credit_bf TEXT NOT NULL DEFAULT '0',
    vat_payable_override TEXT,
    paye_employees INTEGER,
    paye_amount TEXT,
    shif_employees INTEGER,
    shif_amount TEXT,
    nssf_employees INTEGER,
    nssf_amount TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (engagement_id, period)
);

CREATE TABLE IF NOT EXISTS monthly_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    engagement_id TEXT NOT NULL REFERENCES engagements(id),
    month TEXT NOT NULL,
    sales_zero_rated TEXT NOT NULL DEFAULT '0',
    sales_exempt TEXT NOT NULL DEFAULT '0',
    sales_vatable_16 TEXT NOT NULL DEFAULT '0',
    sales_vatable_8 TEXT NOT NULL DEFAULT '0',
    output_vat_16 TEXT NOT NULL DEFAULT '0',
    output_vat_8 TEXT NOT NULL DEFAULT '0',
    purchases_zero_rated TEXT NOT NULL DEFAULT '0',
    purchases_exempt TEXT NOT NULL DEFAULT '0',
    purchases_vatable_16 TEXT NOT NULL DEFAULT '0',
    purchases_vatable_8 TEXT NOT NULL DEFAULT '0',
    input_vat_16 TEXT NOT NULL DEFAULT '0',
    input_vat_8 TEXT NOT NULL DEFAULT '0',
    withheld_vat TEXT NOT NULL DEFAULT '0',
    balance_bf TEXT NOT NULL DEFAULT '0',
    paid TEXT NOT NULL DEFAULT '0',
    UNIQUE (engagement_id, month)
);

CREATE TABLE IF NOT EXISTS banking_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    engagement_id TEXT NOT NULL REFERENCES engagements(id),
    month TEXT NOT NULL,
    total_credits TEXT NOT NULL DEFAULT '0',
    UNIQUE (engagement_id, month)
);

CREATE TABLE IF NOT EXISTS salary_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    engagement_id TEXT NOT NULL REFERENCES engagements(id),
    month TEXT NOT NULL,
    gross_salary TEXT NOT NULL DEFAULT '0',
    UNIQUE (engagement_id, month)
);

CREATE TABLE IF NOT EXISTS installment_taxes (
    engagement_id TEXT PRIMARY KEY REFERENCES engagements(id),
    amount_1 TEXT NOT NULL DEFAULT '0',
    paid_1 INTEGER NOT NULL DEFAULT 0,
    amount_2 TEXT NOT NULL DEFAULT '0',
    paid_2 INTEGER NOT NULL DEFAULT 0,
    amount_3 TEXT NOT NULL DEFAULT '0',
    paid_3 INTEGER NOT NULL DEFAULT 0,
    amount_4 TEXT NOT NULL DEFAULT '0',
    paid_4 INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tax_liabilities (
    id TEXT PRIMARY KEY,
    engagement_id TEXT NOT NULL REFERENCES engagements(id),
    period TEXT NOT NULL,
    tax_head TEXT NOT NULL DEFAULT '',
    principal TEXT NOT NULL DEFAULT '0',
    penalty TEXT NOT NULL DEFAULT '0',
    interest TEXT NOT NULL DEFAULT '0'
);

CREATE INDEX IF NOT EXISTS idx_tasks_assignee_status ON tasks(assignee_id, status, deleted_at);
CREATE INDEX IF NOT EXISTS idx_tasks_engagement ON tasks(engagement_id);
CREATE INDEX IF NOT EXISTS idx_tasks_occurrence ON tasks(engagement_id, template_id, deadline);
CREATE INDEX IF NOT EXISTS idx_task_logs_task ON task_logs(task_id, actor_id, status);
CREATE INDEX IF NOT EXISTS idx_task_approvals_task ON task_approvals(task_id);
CREATE INDEX IF NOT EXISTS idx_ledgers_engagement ON period_ledgers(engagement_id);
CREATE INDEX IF NOT EXISTS idx_summaries_engagement ON monthly_summaries(engagement_id);
CREATE INDEX IF NOT EXISTS idx_liabilities_engagement ON tax_liabilities(engagement_id);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
