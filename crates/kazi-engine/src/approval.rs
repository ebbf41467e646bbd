//! Review authorization and routing rules.
//!
//! Pure functions over actor profiles and task context so the rules are
//! testable without a database. The orchestrator in `workflow` applies
//! them inside the transaction.

use kazi_core::directory::ActorProfile;
use kazi_core::ids::{ActorId, DepartmentId};
use kazi_core::task::{Decision, TaskStatus};

use crate::error::WorkflowError;

/// Service whose VAT-return tasks take the manager → partner path.
pub const TAX_SERVICE: &str = "Tax Services";
pub const VAT_RETURN_TEMPLATE: &str = "VAT Returns";

/// Relationship facts a reviewer decision is judged against.
#[derive(Clone, Debug)]
pub struct ReviewContext {
    pub creator: ActorId,
    pub creator_department: Option<DepartmentId>,
    pub assignee_department: Option<DepartmentId>,
    pub review_partner: Option<ActorId>,
}

/// True when the task's template routes it through manager review.
pub fn is_vat_return(service: &str, template_title: &str) -> bool {
    service == TAX_SERVICE && template_title == VAT_RETURN_TEMPLATE
}

/// Status a submitted task enters on completion.
pub fn review_route(vat_return: bool) -> TaskStatus {
    if vat_return {
        TaskStatus::ManagerReview
    } else {
        TaskStatus::Review
    }
}

fn reviews_assignee_dept(actor: &ActorProfile, ctx: &ReviewContext) -> bool {
    ctx.assignee_department
        .as_ref()
        .is_some_and(|dept| actor.is_reviewer_of(dept))
}

/// Capability table: may this actor decide a task sitting in `stage`?
pub fn can_review(
    stage: TaskStatus,
    actor: &ActorProfile,
    ctx: &ReviewContext,
) -> Result<(), WorkflowError> {
    let not_creator = actor.id != ctx.creator;
    let allowed = match stage {
        TaskStatus::ManagerReview => {
            actor.is_director() || (reviews_assignee_dept(actor, ctx) && not_creator)
        }
        // The single most exclusive gate: only the engagement's review
        // partner, with no director override.
        TaskStatus::PartnerReview => ctx.review_partner.as_ref() == Some(&actor.id),
        TaskStatus::Review => {
            let supervisor_same_dept = actor.role == kazi_core::directory::Role::Supervisor
                && actor.department.is_some()
                && actor.department == ctx.creator_department;
            actor.is_director()
                || (supervisor_same_dept && not_creator)
                || (reviews_assignee_dept(actor, ctx) && not_creator)
        }
        other => {
            return Err(WorkflowError::InvalidTransition(format!(
                "task in {other} is not currently reviewable"
            )))
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::Authorization(format!(
            "actor {} may not review at {stage}",
            actor.id
        )))
    }
}

/// Transition table for a recorded decision. None for non-review stages.
pub fn next_status(stage: TaskStatus, decision: Decision) -> Option<TaskStatus> {
    if !stage.is_reviewable() {
        return None;
    }
    Some(match decision {
        Decision::Redo => TaskStatus::ReAssigned,
        Decision::Approve => match stage {
            TaskStatus::ManagerReview => TaskStatus::PartnerReview,
            _ => TaskStatus::Completed,
        },
    })
}
