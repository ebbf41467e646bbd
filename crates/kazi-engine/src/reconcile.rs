//! Monthly-summary reconciliation.
//!
//! Two write origins converge here: the current-period path (a live
//! ledger edit, recomputed field by field) and the historical-bulk path
//! (typed deltas from the form boundary). Both funnel through
//! `apply_summary_deltas`, so neither can clobber the other's columns
//! and replaying a submission reproduces the same stored state.

use rust_decimal::Decimal;
use tracing::instrument;

use kazi_core::finance::{rate_16, rate_8, MonthlySummary, PeriodLedger, TaxLiability};
use kazi_core::ids::EngagementId;
use kazi_core::month::MonthKey;
use kazi_store::{liabilities, summaries, StoreError};

use crate::forms::{LiabilityBatch, SummaryDeltas};

/// Merge per-month field deltas into the stored summaries. Months not in
/// the delta map are untouched; fields not in a month's map keep their
/// stored value.
pub fn apply_summary_deltas(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    deltas: &SummaryDeltas,
) -> Result<(), StoreError> {
    for (month, fields) in deltas {
        let mut summary = summaries::get_summary(conn, engagement, *month)?
            .unwrap_or_else(|| MonthlySummary::empty(engagement.clone(), *month));
        for (field, value) in fields {
            field.set(&mut summary, *value);
        }
        summaries::upsert_summary(conn, &summary)?;
    }
    Ok(())
}

/// Recompute the summary for the ledger's month from its raw fields and
/// rate-derived VAT splits. `paid` comes from the form when present.
pub fn reconcile_current(
    conn: &rusqlite::Connection,
    ledger: &PeriodLedger,
    paid: Option<Decimal>,
) -> Result<MonthlySummary, StoreError> {
    let month = ledger.period.month;
    let mut summary = summaries::get_summary(conn, &ledger.engagement, month)?
        .unwrap_or_else(|| MonthlySummary::empty(ledger.engagement.clone(), month));

    let sales_16 = ledger.reg_vatable_16 + ledger.non_reg_vatable_16;
    let sales_8 = ledger.reg_vatable_8 + ledger.non_reg_vatable_8;

    summary.sales_zero_rated = ledger.total_sales_zero_rated();
    summary.sales_exempt = ledger.total_sales_exempt();
    summary.sales_vatable_16 = sales_16;
    summary.sales_vatable_8 = sales_8;
    summary.output_vat_16 = sales_16 * rate_16();
    summary.output_vat_8 = sales_8 * rate_8();

    summary.purchases_zero_rated = ledger.purchases_zero_rated;
    summary.purchases_exempt = ledger.purchases_exempt;
    summary.purchases_vatable_16 = ledger.purchases_vatable_16;
    summary.purchases_vatable_8 = ledger.purchases_vatable_8;
    summary.input_vat_16 = ledger.purchases_vatable_16 * rate_16();
    summary.input_vat_8 = ledger.purchases_vatable_8 * rate_8();

    summary.withheld_vat = ledger.vat_wh_credit;
    summary.balance_bf = ledger.credit_bf;
    if let Some(p) = paid {
        summary.paid = p;
    }

    summaries::upsert_summary(conn, &summary)?;
    Ok(summary)
}

/// Update-in-place of the pre-seeded banking rows.
pub fn apply_banking(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    values: &std::collections::BTreeMap<MonthKey, Decimal>,
) -> Result<(), StoreError> {
    for (month, total_credits) in values {
        summaries::update_banking(conn, engagement, *month, *total_credits)?;
    }
    Ok(())
}

/// Update-in-place of the pre-seeded salary rows.
pub fn apply_salary(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    values: &std::collections::BTreeMap<MonthKey, Decimal>,
) -> Result<(), StoreError> {
    for (month, gross_salary) in values {
        summaries::update_salary(conn, engagement, *month, *gross_salary)?;
    }
    Ok(())
}

/// Merge installment inputs into the engagement's single record. Absent
/// positions keep their stored value.
pub fn apply_installment(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    amounts: &[Option<Decimal>; 4],
    paid: &[Option<bool>; 4],
) -> Result<(), StoreError> {
    let mut installment = summaries::get_installment(conn, engagement)?;
    for i in 0..4 {
        if let Some(a) = amounts[i] {
            installment.amounts[i] = a;
        }
        if let Some(p) = paid[i] {
            installment.paid[i] = p;
        }
    }
    summaries::update_installment(conn, &installment)
}

/// Apply a liability batch: deletes first, then field updates for the
/// survivors, then creations. Updates naming unknown ids are skipped —
/// another user may have removed the row since the form was rendered.
#[instrument(skip(conn, batch), fields(engagement_id = %engagement, deletes = batch.deletes.len(), creates = batch.creates.len()))]
pub fn apply_liability_batch(
    conn: &rusqlite::Connection,
    engagement: &EngagementId,
    batch: &LiabilityBatch,
) -> Result<(), StoreError> {
    for id in &batch.deletes {
        liabilities::delete(conn, id)?;
    }

    let existing = liabilities::list(conn, engagement)?;
    for mut row in existing {
        let Some(update) = batch.updates.get(row.id.as_str()) else {
            continue;
        };
        if let Some(period) = &update.period {
            row.period = period.clone();
        }
        if let Some(head) = &update.tax_head {
            row.tax_head = head.clone();
        }
        if let Some(principal) = update.principal {
            row.principal = principal;
        }
        if let Some(penalty) = update.penalty {
            row.penalty = penalty;
        }
        if let Some(interest) = update.interest {
            row.interest = interest;
        }
        liabilities::update(conn, &row)?;
    }

    for new in &batch.creates {
        let mut liability = TaxLiability::new(engagement.clone(), new.period.clone());
        liability.tax_head = new.tax_head.clone();
        liability.principal = new.principal;
        liability.penalty = new.penalty;
        liability.interest = new.interest;
        liabilities::insert(conn, &liability)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms;
    use kazi_store::engagements::{self, NewEngagement};
    use kazi_store::{ledgers, Database};

    fn setup() -> (Database, EngagementId) {
        let db = Database::in_memory().unwrap();
        let eng = db
            .with_tx(|conn| {
                engagements::insert(
                    conn,
                    &NewEngagement {
                        client: "Acme Ltd".into(),
                        service: "Tax Services".into(),
                        review_partner_id: None,
                    },
                )
            })
            .unwrap();
        (db, eng.id)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn bulk_deltas_update_only_named_fields() {
        let (db, eng) = setup();

        // Pre-set a field the delta does not touch.
        db.with_conn(|conn| {
            let mut s = summaries::get_summary(conn, &eng, MonthKey::Sep)?.unwrap();
            s.withheld_vat = Decimal::from(55);
            summaries::upsert_summary(conn, &s)
        })
        .unwrap();

        let (deltas, errors) = forms::parse_summary_bulk(&pairs(&[
            ("sales_vatable_16_SEP", "1000"),
            ("paid_SEP", "200"),
        ]));
        assert!(errors.is_empty());
        db.with_tx(|conn| apply_summary_deltas(conn, &eng, &deltas))
            .unwrap();

        let s = db
            .with_conn(|conn| summaries::get_summary(conn, &eng, MonthKey::Sep))
            .unwrap()
            .unwrap();
        assert_eq!(s.sales_vatable_16, Decimal::from(1000));
        assert_eq!(s.paid, Decimal::from(200));
        assert_eq!(s.withheld_vat, Decimal::from(55));
    }

    #[test]
    fn bulk_deltas_are_idempotent() {
        let (db, eng) = setup();
        let (deltas, _) =
            forms::parse_summary_bulk(&pairs(&[("balance_bf_JAN", "10"), ("paid_JAN", "4")]));

        for _ in 0..2 {
            db.with_tx(|conn| apply_summary_deltas(conn, &eng, &deltas))
                .unwrap();
        }

        let s = db
            .with_conn(|conn| summaries::get_summary(conn, &eng, MonthKey::Jan))
            .unwrap()
            .unwrap();
        assert_eq!(s.balance_bf, Decimal::from(10));
        assert_eq!(s.paid, Decimal::from(4));
        assert_eq!(s.balance_cf(), Decimal::from(6));
    }

    #[test]
    fn current_period_recomputes_from_ledger() {
        let (db, eng) = setup();
        let period = "Sep-2025".parse().unwrap();
        let mut ledger = db
            .with_conn(|conn| ledgers::create_if_absent(conn, &eng, period, Some("Acme Ltd")))
            .unwrap()
            .unwrap();

        ledger.reg_vatable_16 = Decimal::from(6000);
        ledger.non_reg_vatable_16 = Decimal::from(4000);
        ledger.reg_vatable_8 = Decimal::from(500);
        ledger.reg_zero_rated = Decimal::from(100);
        ledger.purchases_vatable_16 = Decimal::from(5000);
        ledger.vat_wh_credit = Decimal::from(100);
        ledger.credit_bf = Decimal::from(50);
        db.with_conn(|conn| ledgers::update(conn, &ledger)).unwrap();

        let summary = db
            .with_tx(|conn| {
                reconcile_current(conn, &ledger, Some(Decimal::from(300)))
            })
            .unwrap();

        assert_eq!(summary.sales_vatable_16, Decimal::from(10000));
        assert_eq!(summary.output_vat_16, Decimal::new(160000, 2)); // 1600.00
        assert_eq!(summary.output_vat_8, Decimal::new(4000, 2)); // 40.00
        assert_eq!(summary.sales_zero_rated, Decimal::from(100));
        assert_eq!(summary.input_vat_16, Decimal::new(80000, 2)); // 800.00
        assert_eq!(summary.withheld_vat, Decimal::from(100));
        assert_eq!(summary.balance_bf, Decimal::from(50));
        assert_eq!(summary.paid, Decimal::from(300));
        // balance_cf = 50 + (1640 - 800 - 100) - 300
        assert_eq!(summary.balance_cf(), Decimal::new(49000, 2));
    }

    #[test]
    fn current_period_without_paid_keeps_stored_paid() {
        let (db, eng) = setup();
        let period = "Jan-2025".parse().unwrap();
        let ledger = db
            .with_conn(|conn| ledgers::create_if_absent(conn, &eng, period, None))
            .unwrap()
            .unwrap();

        db.with_conn(|conn| {
            let mut s = summaries::get_summary(conn, &eng, MonthKey::Jan)?.unwrap();
            s.paid = Decimal::from(77);
            summaries::upsert_summary(conn, &s)
        })
        .unwrap();

        let summary = db
            .with_tx(|conn| reconcile_current(conn, &ledger, None))
            .unwrap();
        assert_eq!(summary.paid, Decimal::from(77));
    }

    #[test]
    fn banking_and_salary_updates() {
        let (db, eng) = setup();
        let (banking, _) =
            forms::parse_month_keyed(&pairs(&[("bc_total_credits_MAR", "11600")]), "bc_total_credits");
        let (salary, _) =
            forms::parse_month_keyed(&pairs(&[("gs_gross_salary_MAR", "90000")]), "gs_gross_salary");

        db.with_tx(|conn| {
            apply_banking(conn, &eng, &banking)?;
            apply_salary(conn, &eng, &salary)
        })
        .unwrap();

        let fetched = db
            .with_conn(|conn| summaries::get_banking(conn, &eng, MonthKey::Mar))
            .unwrap()
            .unwrap();
        assert_eq!(fetched.net_credits(), Decimal::from(10000));

        let sal = db
            .with_conn(|conn| summaries::get_salary(conn, &eng, MonthKey::Mar))
            .unwrap()
            .unwrap();
        assert_eq!(sal.gross_salary, Decimal::from(90000));
    }

    #[test]
    fn installment_merge_preserves_untouched_slots() {
        let (db, eng) = setup();
        let (amounts, paid, _) = forms::parse_installment(&pairs(&[
            ("installment_tax_1", "100"),
            ("installment_paid_2", "yes"),
        ]));
        db.with_tx(|conn| apply_installment(conn, &eng, &amounts, &paid)).unwrap();

        let inst = db.with_conn(|conn| summaries::get_installment(conn, &eng)).unwrap();
        assert_eq!(inst.amounts[0], Decimal::from(100));
        assert_eq!(inst.amounts[1], Decimal::ZERO);
        assert!(inst.paid[1]);
        assert!(!inst.paid[0]);
    }

    #[test]
    fn liability_batch_full_cycle() {
        let (db, eng) = setup();

        // Seed two rows.
        let (doomed, kept) = db
            .with_tx::<_, _, kazi_store::StoreError>(|conn| {
                let mut a = TaxLiability::new(eng.clone(), "Q1 2025");
                a.tax_head = "VAT".into();
                liabilities::insert(conn, &a)?;
                let mut b = TaxLiability::new(eng.clone(), "Q2 2025");
                b.tax_head = "PAYE".into();
                liabilities::insert(conn, &b)?;
                Ok((a.id, b.id))
            })
            .unwrap();

        let batch = forms::parse_liability_batch(&pairs(&[
            (&format!("tl_delete_{doomed}"), "on"),
            (&format!("tl_principal_{kept}"), "1500"),
            ("new_tl_period", "Q3 2025"),
            ("new_tl_tax_head", "NSSF"),
            ("new_tl_principal", "800"),
        ]));

        db.with_tx(|conn| apply_liability_batch(conn, &eng, &batch))
            .unwrap();

        let rows = db.with_conn(|conn| liabilities::list(conn, &eng)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.id != doomed));
        let updated = rows.iter().find(|r| r.id == kept).unwrap();
        assert_eq!(updated.principal, Decimal::from(1500));
        let created = rows.iter().find(|r| r.tax_head == "NSSF").unwrap();
        assert_eq!(created.period, "Q3 2025");
        assert_eq!(created.principal, Decimal::from(800));
    }

    #[test]
    fn update_for_missing_liability_skipped() {
        let (db, eng) = setup();
        let batch = forms::parse_liability_batch(&pairs(&[("tl_principal_tl_ghost", "10")]));
        db.with_tx(|conn| apply_liability_batch(conn, &eng, &batch))
            .unwrap();
        assert!(db.with_conn(|conn| liabilities::list(conn, &eng)).unwrap().is_empty());
    }
}
