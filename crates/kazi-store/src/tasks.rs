use chrono::{DateTime, NaiveDate, Utc};
use tracing::instrument;

use kazi_core::ids::{ActorId, EngagementId, TaskId, TemplateId};
use kazi_core::lifecycle::SoftDelete;
use kazi_core::task::{Priority, Recurrence, TaskStatus};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug)]
pub struct TaskRow {
    pub id: TaskId,
    pub engagement_id: EngagementId,
    pub template_id: Option<TemplateId>,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: ActorId,
    pub creator_id: ActorId,
    pub status: TaskStatus,
    pub priority: Priority,
    pub recurrence: Recurrence,
    pub estimated_minutes: Option<u32>,
    pub deadline: Option<NaiveDate>,
    /// Optimistic-concurrency counter, bumped on every status change.
    pub version: i64,
    pub deleted: SoftDelete,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields a caller supplies when creating a task; everything else is
/// defaulted here.
#[derive(Clone, Debug)]
pub struct NewTask {
    pub engagement_id: EngagementId,
    pub template_id: Option<TemplateId>,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: ActorId,
    pub creator_id: ActorId,
    pub priority: Priority,
    pub recurrence: Recurrence,
    pub estimated_minutes: Option<u32>,
    pub deadline: Option<NaiveDate>,
}

const TASK_COLUMNS: &str = "id, engagement_id, template_id, title, description, assignee_id,
     creator_id, status, priority, recurrence, estimated_minutes, deadline,
     version, deleted_at, deleted_by, created_at, updated_at";

/// Insert a new task with status ASSIGNED and version 0. Conn-level so the
/// recurrence scheduler can run it inside the review transaction.
pub fn insert(conn: &rusqlite::Connection, new: &NewTask) -> Result<TaskRow, StoreError> {
    let id = TaskId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO tasks (id, engagement_id, template_id, title, description, assignee_id,
             creator_id, status, priority, recurrence, estimated_minutes, deadline,
             version, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'assigned', ?8, ?9, ?10, ?11, 0, ?12, ?12)",
        rusqlite::params![
            id.as_str(),
            new.engagement_id.as_str(),
            new.template_id.as_ref().map(|t| t.as_str()),
            new.title,
            new.description,
            new.assignee_id.as_str(),
            new.creator_id.as_str(),
            new.priority.to_string(),
            new.recurrence.to_string(),
            new.estimated_minutes,
            new.deadline.map(|d| d.to_string()),
            now,
        ],
    )?;

    Ok(TaskRow {
        id,
        engagement_id: new.engagement_id.clone(),
        template_id: new.template_id.clone(),
        title: new.title.clone(),
        description: new.description.clone(),
        assignee_id: new.assignee_id.clone(),
        creator_id: new.creator_id.clone(),
        status: TaskStatus::Assigned,
        priority: new.priority,
        recurrence: new.recurrence,
        estimated_minutes: new.estimated_minutes,
        deadline: new.deadline,
        version: 0,
        deleted: SoftDelete::live(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn get(conn: &rusqlite::Connection, id: &TaskId) -> Result<TaskRow, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
    let mut rows = stmt.query([id.as_str()])?;
    match rows.next()? {
        Some(row) => row_to_task(row),
        None => Err(StoreError::NotFound(format!("task {id}"))),
    }
}

/// Compare-and-swap status update. Affects zero rows when another writer
/// got there first; that race surfaces as Conflict.
pub fn update_status_checked(
    conn: &rusqlite::Connection,
    id: &TaskId,
    expected_version: i64,
    new_status: TaskStatus,
) -> Result<i64, StoreError> {
    let now = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE tasks SET status = ?1, version = version + 1, updated_at = ?2
         WHERE id = ?3 AND version = ?4",
        rusqlite::params![new_status.to_string(), now, id.as_str(), expected_version],
    )?;
    if changed == 0 {
        return Err(StoreError::Conflict(format!(
            "task {id} modified concurrently (expected version {expected_version})"
        )));
    }
    Ok(expected_version + 1)
}

/// Recurrence dedup probe: does an occurrence already exist for this
/// (engagement, template, deadline)?
pub fn exists_occurrence(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    template: &TemplateId,
    deadline: NaiveDate,
) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks
         WHERE engagement_id = ?1 AND template_id = ?2 AND deadline = ?3",
        rusqlite::params![engagement.as_str(), template.as_str(), deadline.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(engagement_id = %new.engagement_id, assignee = %new.assignee_id))]
    pub fn create(&self, new: &NewTask) -> Result<TaskRow, StoreError> {
        self.db.with_conn(|conn| insert(conn, new))
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub fn get(&self, id: &TaskId) -> Result<TaskRow, StoreError> {
        self.db.with_conn(|conn| get(conn, id))
    }

    /// Tasks assigned to an actor, live rows only, newest first.
    #[instrument(skip(self), fields(assignee = %assignee))]
    pub fn list_for_assignee(&self, assignee: &ActorId) -> Result<Vec<TaskRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE assignee_id = ?1 AND deleted_at IS NULL
                 ORDER BY created_at DESC"
            ))?;
            let mut rows = stmt.query([assignee.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_task(row)?);
            }
            Ok(results)
        })
    }

    /// Per-status counts for the workload dashboard. Soft-deleted rows are
    /// excluded.
    #[instrument(skip(self), fields(assignee = %assignee))]
    pub fn status_counts(&self, assignee: &ActorId) -> Result<Vec<(TaskStatus, u32)>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM tasks
                 WHERE assignee_id = ?1 AND deleted_at IS NULL
                 GROUP BY status ORDER BY status",
            )?;
            let mut rows = stmt.query([assignee.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                let raw: String = row_helpers::get(row, 0, "tasks", "status")?;
                let status = row_helpers::parse_enum(&raw, "tasks", "status")?;
                let count: u32 = row_helpers::get(row, 1, "tasks", "count")?;
                results.push((status, count));
            }
            Ok(results)
        })
    }

    #[instrument(skip(self), fields(task_id = %id, actor = %by))]
    pub fn soft_delete(&self, id: &TaskId, by: &ActorId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE tasks SET deleted_at = ?1, deleted_by = ?2, updated_at = ?1
                 WHERE id = ?3 AND deleted_at IS NULL",
                rusqlite::params![now, by.as_str(), id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("live task {id}")));
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub fn restore(&self, id: &TaskId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "UPDATE tasks SET deleted_at = NULL, deleted_by = NULL, updated_at = ?1
                 WHERE id = ?2",
                rusqlite::params![now, id.as_str()],
            )?;
            Ok(())
        })
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<TaskRow, StoreError> {
    let status_str: String = row_helpers::get(row, 7, "tasks", "status")?;
    let priority_str: String = row_helpers::get(row, 8, "tasks", "priority")?;
    let recurrence_str: String = row_helpers::get(row, 9, "tasks", "recurrence")?;
    let deadline_str: Option<String> = row_helpers::get_opt(row, 11, "tasks", "deadline")?;
    let deadline = deadline_str
        .map(|d| {
            d.parse::<NaiveDate>().map_err(|_| StoreError::CorruptRow {
                table: "tasks",
                column: "deadline",
                detail: format!("invalid date: {d}"),
            })
        })
        .transpose()?;
    let deleted_at_str: Option<String> = row_helpers::get_opt(row, 13, "tasks", "deleted_at")?;
    let deleted_at = deleted_at_str
        .map(|t| {
            t.parse::<DateTime<Utc>>().map_err(|_| StoreError::CorruptRow {
                table: "tasks",
                column: "deleted_at",
                detail: format!("invalid timestamp: {t}"),
            })
        })
        .transpose()?;

    Ok(TaskRow {
        id: TaskId::from_raw(row_helpers::get::<String>(row, 0, "tasks", "id")?),
        engagement_id: EngagementId::from_raw(row_helpers::get::<String>(
            row,
            1,
            "tasks",
            "engagement_id",
        )?),
        template_id: row_helpers::get_opt::<String>(row, 2, "tasks", "template_id")?
            .map(TemplateId::from_raw),
        title: row_helpers::get(row, 3, "tasks", "title")?,
        description: row_helpers::get_opt(row, 4, "tasks", "description")?,
        assignee_id: ActorId::from_raw(row_helpers::get::<String>(row, 5, "tasks", "assignee_id")?),
        creator_id: ActorId::from_raw(row_helpers::get::<String>(row, 6, "tasks", "creator_id")?),
        status: row_helpers::parse_enum(&status_str, "tasks", "status")?,
        priority: row_helpers::parse_enum(&priority_str, "tasks", "priority")?,
        recurrence: row_helpers::parse_enum(&recurrence_str, "tasks", "recurrence")?,
        estimated_minutes: row_helpers::get_opt(row, 10, "tasks", "estimated_minutes")?,
        deadline,
        version: row_helpers::get(row, 12, "tasks", "version")?,
        deleted: SoftDelete {
            deleted_at,
            deleted_by: row_helpers::get_opt::<String>(row, 14, "tasks", "deleted_by")?
                .map(ActorId::from_raw),
        },
        created_at: row_helpers::get(row, 15, "tasks", "created_at")?,
        updated_at: row_helpers::get(row, 16, "tasks", "updated_at")?,
    })
}
