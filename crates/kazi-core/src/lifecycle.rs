use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ActorId;

/// Embeddable soft-delete marker. A record is live until `delete` stamps
/// it; `restore` clears both fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftDelete {
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<ActorId>,
}

impl SoftDelete {
    pub fn live() -> Self {
        Self::default()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn delete(&mut self, by: ActorId) {
        self.deleted_at = Some(Utc::now());
        self.deleted_by = Some(by);
    }

    pub fn restore(&mut self) {
        self.deleted_at = None;
        self.deleted_by = None;
    }
}
