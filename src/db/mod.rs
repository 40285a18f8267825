pub mod connection;
pub mod documents;
pub mod ingest_runs;
pub mod pending_changes;
pub mod recalls;
pub mod users;

pub use connection::{init_db, Database};
