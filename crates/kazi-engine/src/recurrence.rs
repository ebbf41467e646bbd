//! Successor scheduling on completion.
//!
//! Runs inside the review transaction: either the approval, the status
//! change, the successor task and any new period ledger all commit, or
//! none do.

use chrono::{Months, NaiveDate};
use tracing::debug;

use kazi_core::month::FilingPeriod;
use kazi_core::task::Recurrence;
use kazi_store::tasks::{self, NewTask, TaskRow};
use kazi_store::{ledgers, StoreError};

/// What a scheduler pass produced. Both fields stay None when the
/// occurrence or period already existed — duplicates are absorbed, not
/// reported.
#[derive(Debug, Default)]
pub struct RecurrenceOutcome {
    pub created_task: Option<TaskRow>,
    pub created_period: Option<FilingPeriod>,
}

/// `deadline + cadence`. Month and year steps clamp to the end of the
/// target month the way calendar arithmetic must (Jan 31 + 1 month =
/// Feb 28/29).
pub fn next_deadline(deadline: NaiveDate, cadence: Recurrence) -> Option<NaiveDate> {
    match cadence {
        Recurrence::None => None,
        Recurrence::Daily => deadline.checked_add_days(chrono::Days::new(1)),
        Recurrence::Weekly => deadline.checked_add_days(chrono::Days::new(7)),
        Recurrence::Monthly => deadline.checked_add_months(Months::new(1)),
        Recurrence::Yearly => deadline.checked_add_months(Months::new(12)),
    }
}

/// The VAT return filed on a deadline covers the prior calendar month.
pub fn filing_period_for(deadline: NaiveDate) -> Option<FilingPeriod> {
    deadline
        .checked_sub_months(Months::new(1))
        .map(FilingPeriod::from_date)
}

/// Create the deduplicated successor task and, for VAT-return tasks, the
/// deduplicated period ledger seeded with the client name.
pub fn run(
    conn: &rusqlite::Connection,
    completed: &TaskRow,
    client: &str,
    vat_return: bool,
) -> Result<RecurrenceOutcome, StoreError> {
    let mut outcome = RecurrenceOutcome::default();

    let Some(deadline) = completed.deadline else {
        return Ok(outcome);
    };
    let Some(next) = next_deadline(deadline, completed.recurrence) else {
        return Ok(outcome);
    };

    let duplicate = match &completed.template_id {
        Some(tpl) => tasks::exists_occurrence(conn, &completed.engagement_id, tpl, next)?,
        None => false,
    };

    if duplicate {
        debug!(task_id = %completed.id, deadline = %next, "occurrence exists, skipping");
    } else {
        let successor = tasks::insert(
            conn,
            &NewTask {
                engagement_id: completed.engagement_id.clone(),
                template_id: completed.template_id.clone(),
                title: completed.title.clone(),
                description: completed.description.clone(),
                assignee_id: completed.assignee_id.clone(),
                creator_id: completed.creator_id.clone(),
                priority: completed.priority,
                recurrence: completed.recurrence,
                estimated_minutes: completed.estimated_minutes,
                deadline: Some(next),
            },
        )?;
        outcome.created_task = Some(successor);
    }

    if vat_return {
        if let Some(period) = filing_period_for(next) {
            let created =
                ledgers::create_if_absent(conn, &completed.engagement_id, period, Some(client))?;
            if created.is_some() {
                outcome.created_period = Some(period);
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kazi_core::ids::{ActorId, EngagementId};
    use kazi_core::task::{Priority, TaskStatus};
    use kazi_store::engagements::{self, NewEngagement};
    use kazi_store::Database;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cadence_arithmetic() {
        let d = date(2025, 9, 20);
        assert_eq!(next_deadline(d, Recurrence::Daily), Some(date(2025, 9, 21)));
        assert_eq!(next_deadline(d, Recurrence::Weekly), Some(date(2025, 9, 27)));
        assert_eq!(next_deadline(d, Recurrence::Monthly), Some(date(2025, 10, 20)));
        assert_eq!(next_deadline(d, Recurrence::Yearly), Some(date(2026, 9, 20)));
        assert_eq!(next_deadline(d, Recurrence::None), None);
    }

    #[test]
    fn month_end_clamps() {
        assert_eq!(
            next_deadline(date(2025, 1, 31), Recurrence::Monthly),
            Some(date(2025, 2, 28))
        );
        assert_eq!(
            next_deadline(date(2024, 1, 31), Recurrence::Monthly),
            Some(date(2024, 2, 29))
        );
    }

    #[test]
    fn filing_period_is_prior_month() {
        assert_eq!(
            filing_period_for(date(2025, 10, 20)),
            Some("Sep-2025".parse().unwrap())
        );
        // Year boundary
        assert_eq!(
            filing_period_for(date(2026, 1, 20)),
            Some("Dec-2025".parse().unwrap())
        );
    }

    fn setup(recurrence: Recurrence) -> (Database, TaskRow, EngagementId) {
        let db = Database::in_memory().unwrap();
        let (task, eng) = db
            .with_tx::<_, _, StoreError>(|conn| {
                let eng = engagements::insert(
                    conn,
                    &NewEngagement {
                        client: "Acme Ltd".into(),
                        service: "Tax Services".into(),
                        review_partner_id: None,
                    },
                )?;
                let tpl = engagements::insert_template(conn, "Tax Services", "VAT Returns")?;
                let task = tasks::insert(
                    conn,
                    &NewTask {
                        engagement_id: eng.id.clone(),
                        template_id: Some(tpl.id),
                        title: "File VAT return".into(),
                        description: Some("monthly filing".into()),
                        assignee_id: ActorId::new(),
                        creator_id: ActorId::new(),
                        priority: Priority::High,
                        recurrence,
                        estimated_minutes: Some(90),
                        deadline: Some(date(2025, 10, 20)),
                    },
                )?;
                Ok((task, eng.id))
            })
            .unwrap();
        (db, task, eng)
    }

    #[test]
    fn creates_successor_with_copied_fields() {
        let (db, task, _) = setup(Recurrence::Monthly);
        let outcome = db
            .with_tx(|conn| run(conn, &task, "Acme Ltd", false))
            .unwrap();

        let successor = outcome.created_task.unwrap();
        assert_eq!(successor.title, task.title);
        assert_eq!(successor.assignee_id, task.assignee_id);
        assert_eq!(successor.status, TaskStatus::Assigned);
        assert_eq!(successor.deadline, Some(date(2025, 11, 20)));
        assert_eq!(successor.estimated_minutes, Some(90));
        assert!(outcome.created_period.is_none());
    }

    #[test]
    fn duplicate_occurrence_absorbed() {
        let (db, task, _) = setup(Recurrence::Monthly);
        db.with_tx(|conn| run(conn, &task, "Acme Ltd", false)).unwrap();
        let second = db
            .with_tx(|conn| run(conn, &task, "Acme Ltd", false))
            .unwrap();
        assert!(second.created_task.is_none());
    }

    #[test]
    fn vat_return_seeds_period_ledger() {
        let (db, task, eng) = setup(Recurrence::Monthly);
        let outcome = db
            .with_tx(|conn| run(conn, &task, "Acme Ltd", true))
            .unwrap();

        // Next deadline 2025-11-20, so the new period covers October.
        let period: FilingPeriod = "Oct-2025".parse().unwrap();
        assert_eq!(outcome.created_period, Some(period));

        let ledger = db
            .with_conn(|conn| ledgers::find(conn, &eng, period))
            .unwrap()
            .unwrap();
        assert_eq!(ledger.nature_of_business.as_deref(), Some("Acme Ltd"));
    }

    #[test]
    fn existing_period_absorbed() {
        let (db, task, _) = setup(Recurrence::Monthly);
        db.with_tx(|conn| run(conn, &task, "Acme Ltd", true)).unwrap();
        let second = db.with_tx(|conn| run(conn, &task, "Acme Ltd", true)).unwrap();
        assert!(second.created_period.is_none());
    }

    #[test]
    fn no_recurrence_is_noop() {
        let (db, task, _) = setup(Recurrence::None);
        let outcome = db
            .with_tx(|conn| run(conn, &task, "Acme Ltd", true))
            .unwrap();
        assert!(outcome.created_task.is_none());
        assert!(outcome.created_period.is_none());
    }

    #[test]
    fn missing_deadline_is_noop() {
        let (db, mut task, _) = setup(Recurrence::Monthly);
        task.deadline = None;
        let outcome = db
            .with_tx(|conn| run(conn, &task, "Acme Ltd", false))
            .unwrap();
        assert!(outcome.created_task.is_none());
    }
}
