use serde::{Deserialize, Serialize};

use crate::ids::{ActorId, TaskId};

/// Kind of event being announced. Carried so sinks can route or template
/// per-kind without parsing the message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    ReviewRequested,
    TaskApproved,
    TaskRejected,
    TaskCompleted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: ActorId,
    pub kind: NotificationKind,
    pub task: TaskId,
    pub message: String,
}

impl Notification {
    pub fn new(
        recipient: ActorId,
        kind: NotificationKind,
        task: TaskId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            kind,
            task,
            message: message.into(),
        }
    }
}

/// Outbound notification sink. Delivery is fire-and-forget: callers must
/// never let a send failure affect the workflow outcome.
pub trait Notifier: Send + Sync {
    fn send(&self, notification: Notification);
}

/// Drops everything. Useful as a default and in tests that don't assert
/// on notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, _notification: Notification) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_notifier_accepts_anything() {
        let n = NullNotifier;
        n.send(Notification::new(
            ActorId::new(),
            NotificationKind::TaskAssigned,
            TaskId::new(),
            "you have work",
        ));
    }
}
