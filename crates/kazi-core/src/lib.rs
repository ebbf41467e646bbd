pub mod attachments;
pub mod directory;
pub mod finance;
pub mod ids;
pub mod lifecycle;
pub mod month;
pub mod notify;
pub mod task;
