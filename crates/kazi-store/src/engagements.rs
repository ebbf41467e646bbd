use chrono::{DateTime, Utc};
use tracing::instrument;

use kazi_core::ids::{ActorId, EngagementId, TemplateId};
use kazi_core::lifecycle::SoftDelete;
use kazi_core::month::MonthKey;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

#[derive(Clone, Debug)]
pub struct EngagementRow {
    pub id: EngagementId,
    pub client: String,
    pub service: String,
    pub review_partner_id: Option<ActorId>,
    pub deleted: SoftDelete,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug)]
pub struct NewEngagement {
    pub client: String,
    pub service: String,
    pub review_partner_id: Option<ActorId>,
}

#[derive(Clone, Debug)]
pub struct TemplateRow {
    pub id: TemplateId,
    pub service: String,
    pub title: String,
}

/// Insert an engagement and pre-seed its recurring structures: one monthly
/// summary, one banking summary and one salary summary per calendar month,
/// plus the single installment-tax record. Callers run this inside with_tx
/// so a partial seed never survives.
pub fn insert(
    conn: &rusqlite::Connection,
    new: &NewEngagement,
) -> Result<EngagementRow, StoreError> {
    let id = EngagementId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO engagements (id, client, service, review_partner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        rusqlite::params![
            id.as_str(),
            new.client,
            new.service,
            new.review_partner_id.as_ref().map(|a| a.as_str()),
            now,
        ],
    )?;

    for month in MonthKey::ALL {
        conn.execute(
            "INSERT INTO monthly_summaries (engagement_id, month) VALUES (?1, ?2)",
            rusqlite::params![id.as_str(), month.as_str()],
        )?;
        conn.execute(
            "INSERT INTO banking_summaries (engagement_id, month) VALUES (?1, ?2)",
            rusqlite::params![id.as_str(), month.as_str()],
        )?;
        conn.execute(
            "INSERT INTO salary_summaries (engagement_id, month) VALUES (?1, ?2)",
            rusqlite::params![id.as_str(), month.as_str()],
        )?;
    }
    conn.execute(
        "INSERT INTO installment_taxes (engagement_id) VALUES (?1)",
        [id.as_str()],
    )?;

    Ok(EngagementRow {
        id,
        client: new.client.clone(),
        service: new.service.clone(),
        review_partner_id: new.review_partner_id.clone(),
        deleted: SoftDelete::live(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn get(conn: &rusqlite::Connection, id: &EngagementId) -> Result<EngagementRow, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, client, service, review_partner_id, deleted_at, deleted_by,
                created_at, updated_at
         FROM engagements WHERE id = ?1",
    )?;
    let mut rows = stmt.query([id.as_str()])?;
    match rows.next()? {
        Some(row) => row_to_engagement(row),
        None => Err(StoreError::NotFound(format!("engagement {id}"))),
    }
}

pub fn insert_template(
    conn: &rusqlite::Connection,
    service: &str,
    title: &str,
) -> Result<TemplateRow, StoreError> {
    let id = TemplateId::new();
    conn.execute(
        "INSERT INTO task_templates (id, service, title) VALUES (?1, ?2, ?3)",
        rusqlite::params![id.as_str(), service, title],
    )?;
    Ok(TemplateRow {
        id,
        service: service.to_owned(),
        title: title.to_owned(),
    })
}

/// Template lookup used for category resolution on completion.
pub fn get_template(
    conn: &rusqlite::Connection,
    id: &TemplateId,
) -> Result<TemplateRow, StoreError> {
    let mut stmt = conn.prepare("SELECT id, service, title FROM task_templates WHERE id = ?1")?;
    let mut rows = stmt.query([id.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(TemplateRow {
            id: TemplateId::from_raw(row_helpers::get::<String>(row, 0, "task_templates", "id")?),
            service: row_helpers::get(row, 1, "task_templates", "service")?,
            title: row_helpers::get(row, 2, "task_templates", "title")?,
        }),
        None => Err(StoreError::NotFound(format!("template {id}"))),
    }
}

pub struct EngagementRepo {
    db: Database,
}

impl EngagementRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create with all recurring structures, atomically.
    #[instrument(skip(self, new), fields(client = %new.client, service = %new.service))]
    pub fn create(&self, new: &NewEngagement) -> Result<EngagementRow, StoreError> {
        self.db.with_tx(|conn| insert(conn, new))
    }

    #[instrument(skip(self), fields(engagement_id = %id))]
    pub fn get(&self, id: &EngagementId) -> Result<EngagementRow, StoreError> {
        self.db.with_conn(|conn| get(conn, id))
    }

    #[instrument(skip(self), fields(engagement_id = %id, partner = %partner))]
    pub fn set_review_partner(
        &self,
        id: &EngagementId,
        partner: &ActorId,
    ) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE engagements SET review_partner_id = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![partner.as_str(), now, id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("engagement {id}")));
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(engagement_id = %id, actor = %by))]
    pub fn soft_delete(&self, id: &EngagementId, by: &ActorId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let changed = conn.execute(
                "UPDATE engagements SET deleted_at = ?1, deleted_by = ?2, updated_at = ?1
                 WHERE id = ?3 AND deleted_at IS NULL",
                rusqlite::params![now, by.as_str(), id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("live engagement {id}")));
            }
            Ok(())
        })
    }
}

fn row_to_engagement(row: &rusqlite::Row<'_>) -> Result<EngagementRow, StoreError> {
    let deleted_at_str: Option<String> =
        row_helpers::get_opt(row, 4, "engagements", "deleted_at")?;
    let deleted_at = deleted_at_str
        .map(|t| {
            t.parse::<DateTime<Utc>>().map_err(|_| StoreError::CorruptRow {
                table: "engagements",
                column: "deleted_at",
                detail: format!("invalid timestamp: {t}"),
            })
        })
        .transpose()?;

    Ok(EngagementRow {
        id: EngagementId::from_raw(row_helpers::get::<String>(row, 0, "engagements", "id")?),
        client: row_helpers::get(row, 1, "engagements", "client")?,
        service: row_helpers::get(row, 2, "engagements", "service")?,
        review_partner_id: row_helpers::get_opt::<String>(row, 3, "engagements", "review_partner_id")?
            .map(ActorId::from_raw),
        deleted: SoftDelete {
            deleted_at,
            deleted_by: row_helpers::get_opt::<String>(row, 5, "engagements", "deleted_by")?
                .map(ActorId::from_raw),
        },
        created_at: row_helpers::get(row, 6, "engagements", "created_at")?,
        updated_at: row_helpers::get(row, 7, "engagements", "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_engagement() -> NewEngagement {
        NewEngagement {
            client: "Acme Ltd".into(),
            service: "tax-filing".into(),
            review_partner_id: None,
        }
    }

    #[test]
    fn create_seeds_recurring_structures() {
        let db = Database::in_memory().unwrap();
        let repo = EngagementRepo::new(db.clone());
        let eng = repo.create(&new_engagement()).unwrap();

        db.with_conn(|conn| {
            for table in ["monthly_summaries", "banking_summaries", "salary_summaries"] {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE engagement_id = ?1"),
                    [eng.id.as_str()],
                    |row| row.get(0),
                )?;
                assert_eq!(count, 12, "{table}");
            }
            let installments: i64 = conn.query_row(
                "SELECT COUNT(*) FROM installment_taxes WHERE engagement_id = ?1",
                [eng.id.as_str()],
                |row| row.get(0),
            )?;
            assert_eq!(installments, 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn get_roundtrip() {
        let db = Database::in_memory().unwrap();
        let repo = EngagementRepo::new(db);
        let eng = repo.create(&new_engagement()).unwrap();
        let fetched = repo.get(&eng.id).unwrap();
        assert_eq!(fetched.client, "Acme Ltd");
        assert_eq!(fetched.service, "tax-filing");
        assert!(fetched.review_partner_id.is_none());
    }

    #[test]
    fn set_review_partner() {
        let db = Database::in_memory().unwrap();
        let repo = EngagementRepo::new(db);
        let eng = repo.create(&new_engagement()).unwrap();
        let partner = ActorId::new();
        repo.set_review_partner(&eng.id, &partner).unwrap();
        assert_eq!(repo.get(&eng.id).unwrap().review_partner_id, Some(partner));
    }

    #[test]
    fn soft_delete() {
        let db = Database::in_memory().unwrap();
        let repo = EngagementRepo::new(db);
        let eng = repo.create(&new_engagement()).unwrap();
        repo.soft_delete(&eng.id, &ActorId::new()).unwrap();
        assert!(repo.get(&eng.id).unwrap().deleted.is_deleted());
    }

    #[test]
    fn template_lookup() {
        let db = Database::in_memory().unwrap();
        let tpl = db
            .with_conn(|conn| insert_template(conn, "tax-filing", "VAT return"))
            .unwrap();
        let fetched = db.with_conn(|conn| get_template(conn, &tpl.id)).unwrap();
        assert_eq!(fetched.service, "tax-filing");
        assert_eq!(fetched.title, "VAT return");
    }
}
