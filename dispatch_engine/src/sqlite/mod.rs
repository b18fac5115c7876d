//! SQLite backend for the dispatch engine.
//!
//! The schema lives in `migrations/` and is embedded into the binary. Call [`SqliteDatabase::migrate`] once at
//! startup.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
