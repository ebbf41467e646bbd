use chrono::{DateTime, Utc};
use tracing::instrument;

use kazi_core::finance::PeriodLedger;
use kazi_core::ids::{EngagementId, LedgerId};
use kazi_core::month::FilingPeriod;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const LEDGER_COLUMNS: &str = "id, engagement_id, period, nature_of_business, comments,
     reg_vatable_16, reg_vatable_8, reg_zero_rated, reg_exempt,
     non_reg_vatable_16, non_reg_vatable_8, non_reg_zero_rated, non_reg_exempt,
     purchases_vatable_16, purchases_vatable_8, purchases_zero_rated, purchases_exempt,
     vat_wh_credit, credit_bf, vat_payable_override,
     paye_employees, paye_amount, shif_employees, shif_amount, nssf_employees, nssf_amount,
     created_at";

/// Create a ledger for (engagement, period) unless one exists. Returns None
/// when the period is already present — the duplicate is the caller's no-op.
pub fn create_if_absent(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    period: FilingPeriod,
    nature_of_business: Option<&str>,
) -> Result<Option<PeriodLedger>, StoreError> {
    if find(conn, engagement, period)?.is_some() {
        return Ok(None);
    }

    let mut ledger = PeriodLedger::new(engagement.clone(), period);
    ledger.nature_of_business = nature_of_business.map(str::to_owned);

    conn.execute(
        "INSERT INTO period_ledgers (id, engagement_id, period, nature_of_business, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            ledger.id.as_str(),
            engagement.as_str(),
            period.to_string(),
            ledger.nature_of_business,
            ledger.created_at.to_rfc3339(),
        ],
    )?;

    Ok(Some(ledger))
}

pub fn find(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    period: FilingPeriod,
) -> Result<Option<PeriodLedger>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEDGER_COLUMNS} FROM period_ledgers WHERE engagement_id = ?1 AND period = ?2"
    ))?;
    let mut rows = stmt.query(rusqlite::params![engagement.as_str(), period.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_ledger(row)?)),
        None => Ok(None),
    }
}

/// Full-field update of the raw inputs. Derived figures are never stored.
pub fn update(conn: &rusqlite::Connection, ledger: &PeriodLedger) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE period_ledgers SET
            nature_of_business = ?1, comments = ?2,
            reg_vatable_16 = ?3, reg_vatable_8 = ?4, reg_zero_rated = ?5, reg_exempt = ?6,
            non_reg_vatable_16 = ?7, non_reg_vatable_8 = ?8,
            non_reg_zero_rated = ?9, non_reg_exempt = ?10,
            purchases_vatable_16 = ?11, purchases_vatable_8 = ?12,
            purchases_zero_rated = ?13, purchases_exempt = ?14,
            vat_wh_credit = ?15, credit_bf = ?16, vat_payable_override = ?17,
            paye_employees = ?18, paye_amount = ?19,
            shif_employees = ?20, shif_amount = ?21,
            nssf_employees = ?22, nssf_amount = ?23
         WHERE id = ?24",
        rusqlite::params![
            ledger.nature_of_business,
            ledger.comments,
            ledger.reg_vatable_16.to_string(),
            ledger.reg_vatable_8.to_string(),
            ledger.reg_zero_rated.to_string(),
            ledger.reg_exempt.to_string(),
            ledger.non_reg_vatable_16.to_string(),
            ledger.non_reg_vatable_8.to_string(),
            ledger.non_reg_zero_rated.to_string(),
            ledger.non_reg_exempt.to_string(),
            ledger.purchases_vatable_16.to_string(),
            ledger.purchases_vatable_8.to_string(),
            ledger.purchases_zero_rated.to_string(),
            ledger.purchases_exempt.to_string(),
            ledger.vat_wh_credit.to_string(),
            ledger.credit_bf.to_string(),
            ledger.vat_payable_override.map(|d| d.to_string()),
            ledger.paye_employees,
            ledger.paye_amount.map(|d| d.to_string()),
            ledger.shif_employees,
            ledger.shif_amount.map(|d| d.to_string()),
            ledger.nssf_employees,
            ledger.nssf_amount.map(|d| d.to_string()),
            ledger.id.as_str(),
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("ledger {}", ledger.id)));
    }
    Ok(())
}

pub struct LedgerRepo {
    db: Database,
}

impl LedgerRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(engagement_id = %engagement))]
    pub fn list(&self, engagement: &EngagementId) -> Result<Vec<PeriodLedger>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEDGER_COLUMNS} FROM period_ledgers
                 WHERE engagement_id = ?1 ORDER BY created_at"
            ))?;
            let mut rows = stmt.query([engagement.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_ledger(row)?);
            }
            Ok(results)
        })
    }

    pub fn find(
        &self,
        engagement: &EngagementId,
        period: FilingPeriod,
    ) -> Result<Option<PeriodLedger>, StoreError> {
        self.db.with_conn(|conn| find(conn, engagement, period))
    }

    #[instrument(skip(self, ledger), fields(ledger_id = %ledger.id))]
    pub fn update(&self, ledger: &PeriodLedger) -> Result<(), StoreError> {
        self.db.with_conn(|conn| update(conn, ledger))
    }
}

fn row_to_ledger(row: &rusqlite::Row<'_>) -> Result<PeriodLedger, StoreError> {
    const T: &str = "period_ledgers";
    let period_str: String = row_helpers::get(row, 2, T, "period")?;
    let period = row_helpers::parse_enum(&period_str, T, "period")?;
    let created_at_str: String = row_helpers::get(row, 26, T, "created_at")?;
    let created_at = created_at_str
        .parse::<DateTime<Utc>>()
        .map_err(|_| StoreError::CorruptRow {
            table: T,
            column: "created_at",
            detail: format!("invalid timestamp: {created_at_str}"),
        })?;

    Ok(PeriodLedger {
        id: LedgerId::from_raw(row_helpers::get::<String>(row, 0, T, "id")?),
        engagement: EngagementId::from_raw(row_helpers::get::<String>(row, 1, T, "engagement_id")?),
        period,
        nature_of_business: row_helpers::get_opt(row, 3, T, "nature_of_business")?,
        comments: row_helpers::get_opt(row, 4, T, "comments")?,
        created_at,
        reg_vatable_16: row_helpers::get_decimal(row, 5, T, "reg_vatable_16")?,
        reg_vatable_8: row_helpers::get_decimal(row, 6, T, "reg_vatable_8")?,
        reg_zero_rated: row_helpers::get_decimal(row, 7, T, "reg_zero_rated")?,
        reg_exempt: row_helpers::get_decimal(row, 8, T, "reg_exempt")?,
        non_reg_vatable_16: row_helpers::get_decimal(row, 9, T, "non_reg_vatable_16")?,
        non_reg_vatable_8: row_helpers::get_decimal(row, 10, T, "non_reg_vatable_8")?,
        non_reg_zero_rated: row_helpers::get_decimal(row, 11, T, "non_reg_zero_rated")?,
        non_reg_exempt: row_helpers::get_decimal(row, 12, T, "non_reg_exempt")?,
        purchases_vatable_16: row_helpers::get_decimal(row, 13, T, "purchases_vatable_16")?,
        purchases_vatable_8: row_helpers::get_decimal(row, 14, T, "purchases_vatable_8")?,
        purchases_zero_rated: row_helpers::get_decimal(row, 15, T, "purchases_zero_rated")?,
        purchases_exempt: row_helpers::get_decimal(row, 16, T, "purchases_exempt")?,
        vat_wh_credit: row_helpers::get_decimal(row, 17, T, "vat_wh_credit")?,
        credit_bf: row_helpers::get_decimal(row, 18, T, "credit_bf")?,
        vat_payable_override: row_helpers::get_decimal_opt(row, 19, T, "vat_payable_override")?,
        paye_employees: row_helpers::get_opt(row, 20, T, "paye_employees")?,
        paye_amount: row_helpers::get_decimal_opt(row, 21, T, "paye_amount")?,
        shif_employees: row_helpers::get_opt(row, 22, T, "shif_employees")?,
        shif_amount: row_helpers::get_decimal_opt(row, 23, T, "shif_amount")?,
        nssf_employees: row_helpers::get_opt(row, 24, T, "nssf_employees")?,
        nssf_amount: row_helpers::get_decimal_opt(row, 25, T, "nssf_amount")?,
    })
}
