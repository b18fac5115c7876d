//! Helpers for tests that need a real, freshly migrated database.
pub mod prepare_env;
