//! Usage: Spotify OAuth helpers (authorize URL, state, token endpoint, Web API lookups).

pub(crate) mod client_credentials;
pub(crate) mod credentials;
pub(crate) mod profile;
pub(crate) mod provider;
pub(crate) mod state;
pub(crate) mod token_exchange;
