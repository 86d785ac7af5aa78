//! Usage: Domain modules (business concepts and use-cases).

pub(crate) mod refresh_tokens;
