//! Usage: Infrastructure adapters (settings loading, SQLite).

pub(crate) mod db;
pub(crate) mod settings;
