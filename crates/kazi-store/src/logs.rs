use chrono::Utc;
use tracing::instrument;

use kazi_core::ids::{ActorId, TaskId};
use kazi_core::task::LogStatus;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug)]
pub struct LogRow {
    pub id: i64,
    pub task_id: TaskId,
    pub actor_id: ActorId,
    pub status: LogStatus,
    pub start_time: String,
    pub end_time: Option<String>,
}

/// Open a new STARTED log. At most one open log per (task, actor) is
/// allowed; opening a second is a Conflict.
pub fn open(
    conn: &rusqlite::Connection,
    task: &TaskId,
    actor: &ActorId,
) -> Result<LogRow, StoreError> {
    if find_open(conn, task, actor)?.is_some() {
        return Err(StoreError::Conflict(format!(
            "open log already exists for task {task}"
        )));
    }

    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO task_logs (task_id, actor_id, status, start_time)
         VALUES (?1, ?2, 'started', ?3)",
        rusqlite::params![task.as_str(), actor.as_str(), now],
    )?;

    Ok(LogRow {
        id: conn.last_insert_rowid(),
        task_id: task.clone(),
        actor_id: actor.clone(),
        status: LogStatus::Started,
        start_time: now,
        end_time: None,
    })
}

/// The open STARTED log for (task, actor), if any.
pub fn find_open(
    conn: &rusqlite::Connection,
    task: &TaskId,
    actor: &ActorId,
) -> Result<Option<LogRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, actor_id, status, start_time, end_time
         FROM task_logs
         WHERE task_id = ?1 AND actor_id = ?2 AND status = 'started' AND end_time IS NULL
         ORDER BY id DESC LIMIT 1",
    )?;
    let mut rows = stmt.query([task.as_str(), actor.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_log(row)?)),
        None => Ok(None),
    }
}

/// Close a log with an end time and terminal status (PAUSED or COMPLETED).
pub fn close(
    conn: &rusqlite::Connection,
    log_id: i64,
    status: LogStatus,
) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();
    let changed = conn.execute(
        "UPDATE task_logs SET status = ?1, end_time = ?2 WHERE id = ?3 AND end_time IS NULL",
        rusqlite::params![status.to_string(), now, log_id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("open log {log_id}")));
    }
    Ok(())
}

pub struct LogRepo {
    db: Database,
}

impl LogRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(task_id = %task))]
    pub fn list_for_task(&self, task: &TaskId) -> Result<Vec<LogRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, actor_id, status, start_time, end_time
                 FROM task_logs WHERE task_id = ?1 ORDER BY id",
            )?;
            let mut rows = stmt.query([task.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_log(row)?);
            }
            Ok(results)
        })
    }
}

fn row_to_log(row: &rusqlite::Row<'_>) -> Result<LogRow, StoreError> {
    let status_str: String = row_helpers::get(row, 3, "task_logs", "status")?;
    Ok(LogRow {
        id: row_helpers::get(row, 0, "task_logs", "id")?,
        task_id: TaskId::from_raw(row_helpers::get::<String>(row, 1, "task_logs", "task_id")?),
        actor_id: ActorId::from_raw(row_helpers::get::<String>(row, 2, "task_logs", "actor_id")?),
        status: row_helpers::parse_enum(&status_str, "task_logs", "status")?,
        start_time: row_helpers::get(row, 4, "task_logs", "start_time")?,
        end_time: row_helpers::get_opt(row, 5, "task_logs", "end_time")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagements::{self, NewEngagement};
    use crate::tasks::{self, NewTask};
    use kazi_core::task::{Priority, Recurrence};

    fn setup() -> (Database, TaskId, ActorId) {
        let db = Database::in_memory().unwrap();
        let actor = ActorId::new();
        let task = db
            .with_tx(|conn| {
                let eng = engagements::insert(
                    conn,
                    &NewEngagement {
                        client: "Acme Ltd".into(),
                        service: "audit".into(),
                        review_partner_id: None,
                    },
                )?;
                tasks::insert(
                    conn,
                    &NewTask {
                        engagement_id: eng.id,
                        template_id: None,
                        title: "Draft accounts".into(),
                        description: None,
                        assignee_id: actor.clone(),
                        creator_id: ActorId::new(),
                        priority: Priority::Medium,
                        recurrence: Recurrence::None,
                        estimated_minutes: None,
                        deadline: None,
                    },
                )
            })
            .unwrap();
        (db, task.id, actor)
    }

    #[test]
    fn open_then_find() {
        let (db, task, actor) = setup();
        let log = db.with_conn(|conn| open(conn, &task, &actor)).unwrap();
        assert_eq!(log.status, LogStatus::Started);
        assert!(log.end_time.is_none());

        let found = db
            .with_conn(|conn| find_open(conn, &task, &actor))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, log.id);
    }

    #[test]
    fn second_open_is_conflict() {
        let (db, task, actor) = setup();
        db.with_conn(|conn| open(conn, &task, &actor)).unwrap();
        let result = db.with_conn(|conn| open(conn, &task, &actor));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn close_sets_end_time_and_status() {
        let (db, task, actor) = setup();
        let log = db.with_conn(|conn| open(conn, &task, &actor)).unwrap();
        db.with_conn(|conn| close(conn, log.id, LogStatus::Paused)).unwrap();

        assert!(db.with_conn(|conn| find_open(conn, &task, &actor)).unwrap().is_none());

        let all = LogRepo::new(db).list_for_task(&task).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, LogStatus::Paused);
        assert!(all[0].end_time.is_some());
    }

    #[test]
    fn close_twice_fails() {
        let (db, task, actor) = setup();
        let log = db.with_conn(|conn| open(conn, &task, &actor)).unwrap();
        db.with_conn(|conn| close(conn, log.id, LogStatus::Completed)).unwrap();
        let result = db.with_conn(|conn| close(conn, log.id, LogStatus::Completed));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn reopen_after_pause() {
        let (db, task, actor) = setup();
        let log = db.with_conn(|conn| open(conn, &task, &actor)).unwrap();
        db.with_conn(|conn| close(conn, log.id, LogStatus::Paused)).unwrap();
        let second = db.with_conn(|conn| open(conn, &task, &actor)).unwrap();
        assert!(second.id > log.id);
    }
}
