use chrono::Utc;
use tracing::instrument;

use kazi_core::ids::{ActorId, TaskId};
use kazi_core::task::{Decision, TaskStatus};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Append-only review record: who decided what, at which stage.
#[derive(Clone, Debug)]
pub struct ApprovalRow {
    pub id: i64,
    pub task_id: TaskId,
    pub reviewer_id: ActorId,
    pub stage: TaskStatus,
    pub decision: Decision,
    pub remarks: Option<String>,
    pub created_at: String,
}

pub fn insert(
    conn: &rusqlite::Connection,
    task: &TaskId,
    reviewer: &ActorId,
    stage: TaskStatus,
    decision: Decision,
    remarks: Option<&str>,
) -> Result<ApprovalRow, StoreError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO task_approvals (task_id, reviewer_id, stage, decision, remarks, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            task.as_str(),
            reviewer.as_str(),
            stage.to_string(),
            decision.to_string(),
            remarks,
            now,
        ],
    )?;

    Ok(ApprovalRow {
        id: conn.last_insert_rowid(),
        task_id: task.clone(),
        reviewer_id: reviewer.clone(),
        stage,
        decision,
        remarks: remarks.map(str::to_owned),
        created_at: now,
    })
}

pub struct ApprovalRepo {
    db: Database,
}

impl ApprovalRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(task_id = %task))]
    pub fn list_for_task(&self, task: &TaskId) -> Result<Vec<ApprovalRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, reviewer_id, stage, decision, remarks, created_at
                 FROM task_approvals WHERE task_id = ?1 ORDER BY id",
            )?;
            let mut rows = stmt.query([task.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_approval(row)?);
            }
            Ok(results)
        })
    }
}

fn row_to_approval(row: &rusqlite::Row<'_>) -> Result<ApprovalRow, StoreError> {
    let stage_str: String = row_helpers::get(row, 3, "task_approvals", "stage")?;
    let decision_str: String = row_helpers::get(row, 4, "task_approvals", "decision")?;
    Ok(ApprovalRow {
        id: row_helpers::get(row, 0, "task_approvals", "id")?,
        task_id: TaskId::from_raw(row_helpers::get::<String>(row, 1, "task_approvals", "task_id")?),
        reviewer_id: ActorId::from_raw(row_helpers::get::<String>(
            row,
            2,
            "task_approvals",
            "reviewer_id",
        )?),
        stage: row_helpers::parse_enum(&stage_str, "task_approvals", "stage")?,
        decision: row_helpers::parse_enum(&decision_str, "task_approvals", "decision")?,
        remarks: row_helpers::get_opt(row, 5, "task_approvals", "remarks")?,
        created_at: row_helpers::get(row, 6, "task_approvals", "created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagements::{self, NewEngagement};
    use crate::tasks::{self, NewTask};
    use kazi_core::task::{Priority, Recurrence};

    fn setup() -> (Database, TaskId) {
        let db = Database::in_memory().unwrap();
        let task = db
            .with_tx(|conn| {
                let eng = engagements::insert(
                    conn,
                    &NewEngagement {
                        client: "Acme Ltd".into(),
                        service: "tax-filing".into(),
                        review_partner_id: None,
                    },
                )?;
                tasks::insert(
                    conn,
                    &NewTask {
                        engagement_id: eng.id,
                        template_id: None,
                        title: "File VAT return".into(),
                        description: None,
                        assignee_id: ActorId::new(),
                        creator_id: ActorId::new(),
                        priority: Priority::High,
                        recurrence: Recurrence::Monthly,
                        estimated_minutes: None,
                        deadline: None,
                    },
                )
            })
            .unwrap();
        (db, task.id)
    }

    #[test]
    fn insert_and_list() {
        let (db, task) = setup();
        let reviewer = ActorId::new();
        db.with_conn(|conn| {
            insert(conn, &task, &reviewer, TaskStatus::ManagerReview, Decision::Approve, None)?;
            insert(
                conn,
                &task,
                &reviewer,
                TaskStatus::PartnerReview,
                Decision::Redo,
                Some("numbers off"),
            )?;
            Ok(())
        })
        .unwrap();

        let listed = ApprovalRepo::new(db).list_for_task(&task).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].stage, TaskStatus::ManagerReview);
        assert_eq!(listed[0].decision, Decision::Approve);
        assert_eq!(listed[1].decision, Decision::Redo);
        assert_eq!(listed[1].remarks.as_deref(), Some("numbers off"));
    }
}
