use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task lifecycle states. `ReAssigned` is a rejection outcome but behaves
/// like `Assigned` for the purpose of starting work again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Assigned,
    ReAssigned,
    InProgress,
    Paused,
    Review,
    ManagerReview,
    PartnerReview,
    Completed,
}

impl TaskStatus {
    /// States from which the assignee may open a new work log.
    pub fn can_start_from(self) -> bool {
        matches!(self, Self::Assigned | Self::Paused | Self::ReAssigned)
    }

    /// States in which a reviewer decision is accepted.
    pub fn is_reviewable(self) -> bool {
        matches!(self, Self::Review | Self::ManagerReview | Self::PartnerReview)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Assigned => "assigned",
            Self::ReAssigned => "re_assigned",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Review => "review",
            Self::ManagerReview => "manager_review",
            Self::PartnerReview => "partner_review",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigned" => Ok(Self::Assigned),
            "re_assigned" => Ok(Self::ReAssigned),
            "in_progress" => Ok(Self::InProgress),
            "paused" => Ok(Self::Paused),
            "review" => Ok(Self::Review),
            "manager_review" => Ok(Self::ManagerReview),
            "partner_review" => Ok(Self::PartnerReview),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

impl FromStr for Recurrence {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!("unknown recurrence: {other}")),
        }
    }
}

/// Work-log entry states. A log opens as `Started` and closes as either
/// `Paused` or `Completed` with an end time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Started,
    Paused,
    Completed,
}

impl LogStatus {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Started | Self::Paused)
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for LogStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown log status: {other}")),
        }
    }
}

/// Reviewer verdict on a submitted task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Redo,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => f.write_str("approve"),
            Self::Redo => f.write_str("redo"),
        }
    }
}

impl FromStr for Decision {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "redo" => Ok(Self::Redo),
            other => Err(format!("unknown decision: {other}")),
        }
    }
}

/// Normalizes an estimated-effort input of (value, unit) to minutes.
/// Unrecognized units are treated as minutes.
pub fn effort_minutes(value: u32, unit: &str) -> u32 {
    match unit {
        "days" => value * 24 * 60,
        "hours" => value * 60,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_allowed_states() {
        assert!(TaskStatus::Assigned.can_start_from());
        assert!(TaskStatus::Paused.can_start_from());
        assert!(TaskStatus::ReAssigned.can_start_from());
        assert!(!TaskStatus::InProgress.can_start_from());
        assert!(!TaskStatus::Review.can_start_from());
        assert!(!TaskStatus::Completed.can_start_from());
    }

    #[test]
    fn reviewable_states() {
        assert!(TaskStatus::Review.is_reviewable());
        assert!(TaskStatus::ManagerReview.is_reviewable());
        assert!(TaskStatus::PartnerReview.is_reviewable());
        assert!(!TaskStatus::Assigned.is_reviewable());
        assert!(!TaskStatus::Completed.is_reviewable());
    }

    #[test]
    fn only_completed_is_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(!TaskStatus::PartnerReview.is_terminal());
        assert!(!TaskStatus::ReAssigned.is_terminal());
    }

    #[test]
    fn status_display_from_str_roundtrip() {
        for status in [
            TaskStatus::Assigned,
            TaskStatus::ReAssigned,
            TaskStatus::InProgress,
            TaskStatus::Paused,
            TaskStatus::Review,
            TaskStatus::ManagerReview,
            TaskStatus::PartnerReview,
            TaskStatus::Completed,
        ] {
            let parsed: TaskStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert!("submitted".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Urgent);
    }

    #[test]
    fn open_log_states() {
        assert!(LogStatus::Started.is_open());
        assert!(LogStatus::Paused.is_open());
        assert!(!LogStatus::Completed.is_open());
    }

    #[test]
    fn effort_unit_conversion() {
        assert_eq!(effort_minutes(2, "days"), 2880);
        assert_eq!(effort_minutes(3, "hours"), 180);
        assert_eq!(effort_minutes(45, "minutes"), 45);
        assert_eq!(effort_minutes(45, "fortnights"), 45);
    }
}
