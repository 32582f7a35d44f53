// ABOUTME: Persistence layer for billboard, storing users and announcements in SQLite.
// ABOUTME: Implements the core DocumentStore port with real BEGIN/COMMIT/ROLLBACK units of work.

pub mod sqlite;

pub use sqlite::{SqliteError, SqliteStore};
