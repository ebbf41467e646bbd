use tracing::instrument;

use kazi_core::finance::TaxLiability;
use kazi_core::ids::{EngagementId, LiabilityId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

pub fn insert(conn: &rusqlite::Connection, liability: &TaxLiability) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO tax_liabilities (id, engagement_id, period, tax_head, principal, penalty, interest)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            liability.id.as_str(),
            liability.engagement.as_str(),
            liability.period,
            liability.tax_head,
            liability.principal.to_string(),
            liability.penalty.to_string(),
            liability.interest.to_string(),
        ],
    )?;
    Ok(())
}

pub fn update(conn: &rusqlite::Connection, liability: &TaxLiability) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE tax_liabilities SET period = ?1, tax_head = ?2,
            principal = ?3, penalty = ?4, interest = ?5
         WHERE id = ?6",
        rusqlite::params![
            liability.period,
            liability.tax_head,
            liability.principal.to_string(),
            liability.penalty.to_string(),
            liability.interest.to_string(),
            liability.id.as_str(),
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("liability {}", liability.id)));
    }
    Ok(())
}

/// Hard delete. Unknown ids are a no-op: batch submissions may carry
/// markers for rows another user already removed.
pub fn delete(conn: &rusqlite::Connection, id: &LiabilityId) -> Result<(), StoreError> {
    conn.execute("DELETE FROM tax_liabilities WHERE id = ?1", [id.as_str()])?;
    Ok(())
}

pub fn list(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
) -> Result<Vec<TaxLiability>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, engagement_id, period, tax_head, principal, penalty, interest
         FROM tax_liabilities WHERE engagement_id = ?1 ORDER BY id",
    )?;
    let mut rows = stmt.query([engagement.as_str()])?;
    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        results.push(row_to_liability(row)?);
    }
    Ok(results)
}

pub struct LiabilityRepo {
    db: Database,
}

impl LiabilityRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(engagement_id = %engagement))]
    pub fn list(&self, engagement: &EngagementId) -> Result<Vec<TaxLiability>, StoreError> {
        self.db.with_conn(|conn| list(conn, engagement))
    }
}

fn row_to_liability(row: &rusqlite::Row<'_>) -> Result<TaxLiability, StoreError> {
    const T: &str = "tax_liabilities";
    Ok(TaxLiability {
        id: LiabilityId::from_raw(row_helpers::get::<String>(row, 0, T, "id")?),
        engagement: EngagementId::from_raw(row_helpers::get::<String>(row, 1, T, "engagement_id")?),
        period: row_helpers::get(row, 2, T, "period")?,
        tax_head: row_helpers::get(row, 3, T, "tax_head")?,
        principal: row_helpers::get_decimal(row, 4, T, "principal")?,
        penalty: row_helpers::get_decimal(row, 5, T, "penalty")?,
        interest: row_helpers::get_decimal(row, 6, T, "interest")?,
    })
}
