pub mod approvals;
pub mod database;
pub mod engagements;
pub mod error;
pub mod ledgers;
pub mod liabilities;
pub mod logs;
pub mod row_helpers;
pub mod schema;
pub mod summaries;
pub mod tasks;

pub use database::Database;
pub use error::StoreError;
