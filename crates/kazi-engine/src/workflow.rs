//! The workflow orchestrator.
//!
//! Every operation is authorize → mutate → schedule inside one `with_tx`
//! scope, so a failure anywhere rolls the whole unit back. Notifications
//! are collected during the transaction and dispatched only after commit.

use std::sync::Arc;

use tracing::instrument;

use kazi_core::attachments::Attachments;
use kazi_core::directory::Identity;
use kazi_core::ids::{ActorId, TaskId};
use kazi_core::notify::{Notification, NotificationKind, Notifier};
use kazi_core::task::{Decision, LogStatus, TaskStatus};
use kazi_store::tasks::TaskRow;
use kazi_store::{engagements, logs, tasks, Database, StoreError};

use crate::approval::{self, ReviewContext};
use crate::error::WorkflowError;
use crate::recurrence::{self, RecurrenceOutcome};

/// Result of a review decision: the task's new state plus anything the
/// recurrence scheduler created alongside it.
pub struct ReviewOutcome {
    pub task: TaskRow,
    pub scheduled: RecurrenceOutcome,
}

pub struct WorkflowEngine {
    db: Database,
    identity: Arc<dyn Identity>,
    attachments: Arc<dyn Attachments>,
    notifier: Arc<dyn Notifier>,
}

/// Store conflicts on the task row are lost optimistic races, surfaced
/// with their own taxonomy entry.
fn map_store(e: StoreError) -> WorkflowError {
    match e {
        StoreError::Conflict(m) => WorkflowError::Conflict(m),
        other => WorkflowError::Store(other),
    }
}

impl WorkflowEngine {
    pub fn new(
        db: Database,
        identity: Arc<dyn Identity>,
        attachments: Arc<dyn Attachments>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            identity,
            attachments,
            notifier,
        }
    }

    /// Start or resume work: assignee only, from ASSIGNED, PAUSED or
    /// RE_ASSIGNED. Opens a STARTED log and moves the task to IN_PROGRESS.
    #[instrument(skip(self), fields(task_id = %task_id, actor = %actor))]
    pub fn start(&self, task_id: &TaskId, actor: &ActorId) -> Result<TaskRow, WorkflowError> {
        self.db.with_tx(|conn| {
            let mut task = tasks::get(conn, task_id)?;
            guard_live(&task)?;
            guard_assignee(&task, actor)?;
            if !task.status.can_start_from() {
                return Err(WorkflowError::InvalidTransition(format!(
                    "cannot start from {}",
                    task.status
                )));
            }

            logs::open(conn, task_id, actor).map_err(map_store)?;
            task.version = tasks::update_status_checked(
                conn,
                task_id,
                task.version,
                TaskStatus::InProgress,
            )
            .map_err(map_store)?;
            task.status = TaskStatus::InProgress;
            Ok(task)
        })
    }

    /// Pause: assignee only, from IN_PROGRESS. Closes the open log.
    #[instrument(skip(self), fields(task_id = %task_id, actor = %actor))]
    pub fn pause(&self, task_id: &TaskId, actor: &ActorId) -> Result<TaskRow, WorkflowError> {
        self.db.with_tx(|conn| {
            let mut task = tasks::get(conn, task_id)?;
            guard_live(&task)?;
            guard_assignee(&task, actor)?;
            if task.status != TaskStatus::InProgress {
                return Err(WorkflowError::InvalidTransition(format!(
                    "cannot pause from {}",
                    task.status
                )));
            }

            if let Some(log) = logs::find_open(conn, task_id, actor)? {
                logs::close(conn, log.id, LogStatus::Paused)?;
            }
            task.version =
                tasks::update_status_checked(conn, task_id, task.version, TaskStatus::Paused)
                    .map_err(map_store)?;
            task.status = TaskStatus::Paused;
            Ok(task)
        })
    }

    /// Submit for review: assignee only, from IN_PROGRESS, and only with
    /// at least one note or document attached. Routes to MANAGER_REVIEW
    /// for VAT-return tasks (notifying the creator's department reviewers),
    /// REVIEW otherwise (notifying the creator).
    #[instrument(skip(self), fields(task_id = %task_id, actor = %actor))]
    pub fn complete(&self, task_id: &TaskId, actor: &ActorId) -> Result<TaskRow, WorkflowError> {
        let (task, notifications) = self.db.with_tx(|conn| {
            let mut task = tasks::get(conn, task_id)?;
            guard_live(&task)?;
            guard_assignee(&task, actor)?;
            if task.status != TaskStatus::InProgress {
                return Err(WorkflowError::InvalidTransition(format!(
                    "cannot complete from {}",
                    task.status
                )));
            }
            if !self.attachments.has_evidence(task_id) {
                return Err(WorkflowError::Precondition(
                    "a note or document must be attached before completion".into(),
                ));
            }

            // Historical imports may have no open log; tolerate that.
            if let Some(log) = logs::find_open(conn, task_id, actor)? {
                logs::close(conn, log.id, LogStatus::Completed)?;
            }

            let next = approval::review_route(vat_return(conn, &task)?);
            task.version = tasks::update_status_checked(conn, task_id, task.version, next)
                .map_err(map_store)?;
            task.status = next;

            let mut notifications = Vec::new();
            match next {
                TaskStatus::ManagerReview => {
                    let dept = self
                        .identity
                        .lookup(&task.creator_id)
                        .and_then(|p| p.department);
                    if let Some(dept) = dept {
                        for reviewer in self.identity.reviewers_for(&dept) {
                            if reviewer != *actor {
                                notifications.push(Notification::new(
                                    reviewer,
                                    NotificationKind::ReviewRequested,
                                    task.id.clone(),
                                    format!("'{}' requires your review", task.title),
                                ));
                            }
                        }
                    }
                }
                _ => notifications.push(Notification::new(
                    task.creator_id.clone(),
                    NotificationKind::ReviewRequested,
                    task.id.clone(),
                    format!("'{}' submitted for review", task.title),
                )),
            }
            Ok((task, notifications))
        })?;

        for notification in notifications {
            self.notifier.send(notification);
        }
        Ok(task)
    }

    /// Record a reviewer decision. The approval row, status change and any
    /// recurrence output commit together.
    #[instrument(skip(self, remarks), fields(task_id = %task_id, actor = %actor, decision = %decision))]
    pub fn review(
        &self,
        task_id: &TaskId,
        actor: &ActorId,
        decision: Decision,
        remarks: Option<&str>,
    ) -> Result<ReviewOutcome, WorkflowError> {
        let (outcome, notifications) = self.db.with_tx::<_, _, WorkflowError>(|conn| {
            let mut task = tasks::get(conn, task_id)?;
            guard_live(&task)?;
            let stage = task.status;

            let profile = self
                .identity
                .lookup(actor)
                .ok_or_else(|| WorkflowError::Authorization(format!("unknown actor {actor}")))?;
            let engagement = engagements::get(conn, &task.engagement_id)?;
            let ctx = ReviewContext {
                creator: task.creator_id.clone(),
                creator_department: self
                    .identity
                    .lookup(&task.creator_id)
                    .and_then(|p| p.department),
                assignee_department: self
                    .identity
                    .lookup(&task.assignee_id)
                    .and_then(|p| p.department),
                review_partner: engagement.review_partner_id.clone(),
            };
            approval::can_review(stage, &profile, &ctx)?;

            kazi_store::approvals::insert(conn, task_id, actor, stage, decision, remarks)?;

            let next = approval::next_status(stage, decision).ok_or_else(|| {
                WorkflowError::InvalidTransition(format!("task in {stage} is not reviewable"))
            })?;
            task.version = tasks::update_status_checked(conn, task_id, task.version, next)
                .map_err(map_store)?;
            task.status = next;

            let mut notifications = Vec::new();
            let mut scheduled = RecurrenceOutcome::default();
            match next {
                TaskStatus::ReAssigned => notifications.push(Notification::new(
                    task.assignee_id.clone(),
                    NotificationKind::TaskRejected,
                    task.id.clone(),
                    format!("'{}' returned for rework", task.title),
                )),
                TaskStatus::PartnerReview => {
                    if let Some(partner) = &engagement.review_partner_id {
                        notifications.push(Notification::new(
                            partner.clone(),
                            NotificationKind::ReviewRequested,
                            task.id.clone(),
                            format!("'{}' awaits partner review", task.title),
                        ));
                    }
                }
                TaskStatus::Completed => {
                    scheduled =
                        recurrence::run(conn, &task, &engagement.client, vat_return(conn, &task)?)?;
                    notifications.push(Notification::new(
                        task.assignee_id.clone(),
                        NotificationKind::TaskCompleted,
                        task.id.clone(),
                        format!("'{}' approved and completed", task.title),
                    ));
                }
                _ => {}
            }

            Ok((ReviewOutcome { task, scheduled }, notifications))
        })?;

        for notification in notifications {
            self.notifier.send(notification);
        }
        Ok(outcome)
    }
}

fn guard_live(task: &TaskRow) -> Result<(), WorkflowError> {
    if task.deleted.is_deleted() {
        return Err(WorkflowError::InvalidTransition(format!(
            "task {} is deleted",
            task.id
        )));
    }
    Ok(())
}

fn guard_assignee(task: &TaskRow, actor: &ActorId) -> Result<(), WorkflowError> {
    if task.assignee_id != *actor {
        return Err(WorkflowError::Authorization(format!(
            "only the assignee may act on task {}",
            task.id
        )));
    }
    Ok(())
}

/// Category test: the engagement's service is the tax service and the
/// task's template is the VAT-return template.
fn vat_return(conn: &rusqlite::Connection, task: &TaskRow) -> Result<bool, WorkflowError> {
    let Some(tpl_id) = &task.template_id else {
        return Ok(false);
    };
    let engagement = engagements::get(conn, &task.engagement_id)?;
    let template = engagements::get_template(conn, tpl_id)?;
    Ok(approval::is_vat_return(&engagement.service, &template.title))
}
