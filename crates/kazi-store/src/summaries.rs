use rust_decimal::Decimal;
use tracing::instrument;

use kazi_core::finance::{BankingSummary, InstallmentTax, MonthlySummary, SalarySummary};
use kazi_core::ids::EngagementId;
use kazi_core::month::MonthKey;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const SUMMARY_COLUMNS: &str = "engagement_id, month,
     sales_zero_rated, sales_exempt, sales_vatable_16, sales_vatable_8,
     output_vat_16, output_vat_8,
     purchases_zero_rated, purchases_exempt, purchases_vatable_16, purchases_vatable_8,
     input_vat_16, input_vat_8,
     withheld_vat, balance_bf, paid";

pub fn get_summary(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    month: MonthKey,
) -> Result<Option<MonthlySummary>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM monthly_summaries
         WHERE engagement_id = ?1 AND month = ?2"
    ))?;
    let mut rows = stmt.query(rusqlite::params![engagement.as_str(), month.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_summary(row)?)),
        None => Ok(None),
    }
}

/// Write a summary row, creating it when the month was never seeded
/// (historical bulk edits may touch engagements created before seeding
/// existed).
pub fn upsert_summary(
    conn: &rusqlite::Connection,
    summary: &MonthlySummary,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO monthly_summaries (engagement_id, month,
             sales_zero_rated, sales_exempt, sales_vatable_16, sales_vatable_8,
             output_vat_16, output_vat_8,
             purchases_zero_rated, purchases_exempt, purchases_vatable_16, purchases_vatable_8,
             input_vat_16, input_vat_8, withheld_vat, balance_bf, paid)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
         ON CONFLICT (engagement_id, month) DO UPDATE SET
             sales_zero_rated = excluded.sales_zero_rated,
             sales_exempt = excluded.sales_exempt,
             sales_vatable_16 = excluded.sales_vatable_16,
             sales_vatable_8 = excluded.sales_vatable_8,
             output_vat_16 = excluded.output_vat_16,
             output_vat_8 = excluded.output_vat_8,
             purchases_zero_rated = excluded.purchases_zero_rated,
             purchases_exempt = excluded.purchases_exempt,
             purchases_vatable_16 = excluded.purchases_vatable_16,
             purchases_vatable_8 = excluded.purchases_vatable_8,
             input_vat_16 = excluded.input_vat_16,
             input_vat_8 = excluded.input_vat_8,
             withheld_vat = excluded.withheld_vat,
             balance_bf = excluded.balance_bf,
             paid = excluded.paid",
        rusqlite::params![
            summary.engagement.as_str(),
            summary.month.as_str(),
            summary.sales_zero_rated.to_string(),
            summary.sales_exempt.to_string(),
            summary.sales_vatable_16.to_string(),
            summary.sales_vatable_8.to_string(),
            summary.output_vat_16.to_string(),
            summary.output_vat_8.to_string(),
            summary.purchases_zero_rated.to_string(),
            summary.purchases_exempt.to_string(),
            summary.purchases_vatable_16.to_string(),
            summary.purchases_vatable_8.to_string(),
            summary.input_vat_16.to_string(),
            summary.input_vat_8.to_string(),
            summary.withheld_vat.to_string(),
            summary.balance_bf.to_string(),
            summary.paid.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_banking(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    month: MonthKey,
) -> Result<Option<BankingSummary>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT engagement_id, month, total_credits FROM banking_summaries
         WHERE engagement_id = ?1 AND month = ?2",
    )?;
    let mut rows = stmt.query(rusqlite::params![engagement.as_str(), month.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(BankingSummary {
            engagement: EngagementId::from_raw(row_helpers::get::<String>(
                row,
                0,
                "banking_summaries",
                "engagement_id",
            )?),
            month: parse_month(row, 1, "banking_summaries")?,
            total_credits: row_helpers::get_decimal(row, 2, "banking_summaries", "total_credits")?,
        })),
        None => Ok(None),
    }
}

/// Banking rows are seeded at engagement creation and only ever updated.
pub fn update_banking(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    month: MonthKey,
    total_credits: Decimal,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE banking_summaries SET total_credits = ?1
         WHERE engagement_id = ?2 AND month = ?3",
        rusqlite::params![total_credits.to_string(), engagement.as_str(), month.as_str()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!(
            "banking summary {engagement}/{month}"
        )));
    }
    Ok(())
}

pub fn get_salary(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    month: MonthKey,
) -> Result<Option<SalarySummary>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT engagement_id, month, gross_salary FROM salary_summaries
         WHERE engagement_id = ?1 AND month = ?2",
    )?;
    let mut rows = stmt.query(rusqlite::params![engagement.as_str(), month.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(Some(SalarySummary {
            engagement: EngagementId::from_raw(row_helpers::get::<String>(
                row,
                0,
                "salary_summaries",
                "engagement_id",
            )?),
            month: parse_month(row, 1, "salary_summaries")?,
            gross_salary: row_helpers::get_decimal(row, 2, "salary_summaries", "gross_salary")?,
        })),
        None => Ok(None),
    }
}

pub fn update_salary(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    month: MonthKey,
    gross_salary: Decimal,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE salary_summaries SET gross_salary = ?1
         WHERE engagement_id = ?2 AND month = ?3",
        rusqlite::params![gross_salary.to_string(), engagement.as_str(), month.as_str()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!(
            "salary summary {engagement}/{month}"
        )));
    }
    Ok(())
}

pub fn get_installment(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
) -> Result<InstallmentTax, StoreError> {
    const T: &str = "installment_taxes";
    let mut stmt = conn.prepare(
        "SELECT engagement_id, amount_1, paid_1, amount_2, paid_2,
                amount_3, paid_3, amount_4, paid_4
         FROM installment_taxes WHERE engagement_id = ?1",
    )?;
    let mut rows = stmt.query([engagement.as_str()])?;
    match rows.next()? {
        Some(row) => Ok(InstallmentTax {
            engagement: EngagementId::from_raw(row_helpers::get::<String>(
                row,
                0,
                T,
                "engagement_id",
            )?),
            amounts: [
                row_helpers::get_decimal(row, 1, T, "amount_1")?,
                row_helpers::get_decimal(row, 3, T, "amount_2")?,
                row_helpers::get_decimal(row, 5, T, "amount_3")?,
                row_helpers::get_decimal(row, 7, T, "amount_4")?,
            ],
            paid: [
                row_helpers::get(row, 2, T, "paid_1")?,
                row_helpers::get(row, 4, T, "paid_2")?,
                row_helpers::get(row, 6, T, "paid_3")?,
                row_helpers::get(row, 8, T, "paid_4")?,
            ],
        }),
        None => Err(StoreError::NotFound(format!("installment tax {engagement}"))),
    }
}

pub fn update_installment(
    conn: &rusqlite::Connection,
    installment: &InstallmentTax,
) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE installment_taxes SET
            amount_1 = ?1, paid_1 = ?2, amount_2 = ?3, paid_2 = ?4,
            amount_3 = ?5, paid_3 = ?6, amount_4 = ?7, paid_4 = ?8
         WHERE engagement_id = ?9",
        rusqlite::params![
            installment.amounts[0].to_string(),
            installment.paid[0],
            installment.amounts[1].to_string(),
            installment.paid[1],
            installment.amounts[2].to_string(),
            installment.paid[2],
            installment.amounts[3].to_string(),
            installment.paid[3],
            installment.engagement.as_str(),
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!(
            "installment tax {}",
            installment.engagement
        )));
    }
    Ok(())
}

pub struct SummaryRepo {
    db: Database,
}

impl SummaryRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All 12 summary rows in calendar order.
    #[instrument(skip(self), fields(engagement_id = %engagement))]
    pub fn list(&self, engagement: &EngagementId) -> Result<Vec<MonthlySummary>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUMMARY_COLUMNS} FROM monthly_summaries WHERE engagement_id = ?1"
            ))?;
            let mut rows = stmt.query([engagement.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_summary(row)?);
            }
            results.sort_by_key(|s| s.month);
            Ok(results)
        })
    }

    pub fn get(
        &self,
        engagement: &EngagementId,
        month: MonthKey,
    ) -> Result<Option<MonthlySummary>, StoreError> {
        self.db.with_conn(|conn| get_summary(conn, engagement, month))
    }

    pub fn installment(&self, engagement: &EngagementId) -> Result<InstallmentTax, StoreError> {
        self.db.with_conn(|conn| get_installment(conn, engagement))
    }
}

fn parse_month(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
) -> Result<MonthKey, StoreError> {
    let raw: String = row_helpers::get(row, idx, table, "month")?;
    row_helpers::parse_enum(&raw, table, "month")
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> Result<MonthlySummary, StoreError> {
    const T: &str = "monthly_summaries";
    Ok(MonthlySummary {
        engagement: EngagementId::from_raw(row_helpers::get::<String>(row, 0, T, "engagement_id")?),
        month: parse_month(row, 1, T)?,
        sales_zero_rated: row_helpers::get_decimal(row, 2, T, "sales_zero_rated")?,
        sales_exempt: row_helpers::get_decimal(row, 3, T, "sales_exempt")?,
        sales_vatable_16: row_helpers::get_decimal(row, 4, T, "sales_vatable_16")?,
        sales_vatable_8: row_helpers::get_decimal(row, 5, T, "sales_vatable_8")?,
        output_vat_16: row_helpers::get_decimal(row, 6, T, "output_vat_16")?,
        output_vat_8: row_helpers::get_decimal(row, 7, T, "output_vat_8")?,
        purchases_zero_rated: row_helpers::get_decimal(row, 8, T, "purchases_zero_rated")?,
        purchases_exempt: row_helpers::get_decimal(row, 9, T, "purchases_exempt")?,
        purchases_vatable_16: row_helpers::get_decimal(row, 10, T, "purchases_vatable_16")?,
        purchases_vatable_8: row_helpers::get_decimal(row, 11, T, "purchases_vatable_8")?,
        input_vat_16: row_helpers::get_decimal(row, 12, T, "input_vat_16")?,
        input_vat_8: row_helpers::get_decimal(row, 13, T, "input_vat_8")?,
        withheld_vat: row_helpers::get_decimal(row, 14, T, "withheld_vat")?,
        balance_bf: row_helpers::get_decimal(row, 15, T, "balance_bf")?,
        paid: row_helpers::get_decimal(row, 16, T, "paid")?,
    })
}
