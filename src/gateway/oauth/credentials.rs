//! Usage: Client credentials and the HTTP Basic header sent to the token endpoint.

use crate::shared::security::mask_token;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

#[derive(Clone)]
pub(crate) struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    pub(crate) fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn authorization_header(&self) -> String {
        basic_authorization_header(&self.client_id, &self.client_secret)
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &mask_token(&self.client_secret))
            .finish()
    }
}

/// `"Basic " + base64(client_id ":" client_secret)`, standard alphabet with padding.
/// The inputs are used verbatim; no trimming.
pub(crate) fn basic_authorization_header(client_id: &str, client_secret: &str) -> String {
    let mut raw = String::with_capacity(client_id.len() + client_secret.len() + 1);
    raw.push_str(client_id);
    raw.push(':');
    raw.push_str(client_secret);
    format!("Basic {}", STANDARD.encode(raw.as_bytes()))
}
