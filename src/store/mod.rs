//! Document store: persisted entities and the SQLite-backed gateway.

pub mod models;
pub mod sqlite;

pub use models::*;
pub use sqlite::Store;
