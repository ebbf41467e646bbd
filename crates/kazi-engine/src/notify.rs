use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use kazi_core::notify::{Notification, Notifier};

/// Underlying delivery channel (mail gateway, webhook, ...). Failures are
/// logged by the dispatcher and never reach the workflow.
pub trait Transport: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification) -> Result<(), String>;
}

/// Hands notifications to a background tokio task so delivery latency
/// never sits inside a request. Falls back to inline delivery when no
/// runtime is running (tests, CLI).
pub struct SpawnedNotifier<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> SpawnedNotifier<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }
}

fn deliver_logged<T: Transport>(transport: &T, notification: &Notification) {
    if let Err(e) = transport.deliver(notification) {
        warn!(
            recipient = %notification.recipient,
            task_id = %notification.task,
            error = %e,
            "notification delivery failed"
        );
    }
}

impl<T: Transport> Notifier for SpawnedNotifier<T> {
    fn send(&self, notification: Notification) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = self.transport.clone();
                handle.spawn(async move {
                    deliver_logged(transport.as_ref(), &notification);
                });
            }
            Err(_) => deliver_logged(self.transport.as_ref(), &notification),
        }
    }
}

/// Captures everything sent; for tests.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}
