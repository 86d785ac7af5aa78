//! Usage: Token endpoint helpers (authorization_code, refresh_token and client_credentials grants).

use crate::gateway::oauth::credentials::ClientCredentials;
use crate::shared::error::AppError;
use crate::shared::security::mask_token;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;

const ERROR_SNIPPET_MAX_CHARS: usize = 500;
const ERROR_MESSAGE_MAX_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OAuthTokenSet {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_in: Option<i64>,
    pub(crate) scope: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum TokenEndpointError {
    #[error("oauth token request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("oauth token endpoint returned status={}{detail}", .status.as_u16())]
    Status { status: StatusCode, detail: String },
    #[error("oauth token response invalid: {0}")]
    InvalidResponse(String),
}

impl TokenEndpointError {
    /// The provider's status code, when the provider answered at all.
    pub(crate) fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::InvalidResponse(_) => None,
        }
    }
}

impl From<TokenEndpointError> for AppError {
    fn from(value: TokenEndpointError) -> Self {
        AppError::new("UPSTREAM_ERROR", value.to_string()).with_source(value)
    }
}

pub(crate) async fn exchange_authorization_code(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &ClientCredentials,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthTokenSet, TokenEndpointError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("code", code.trim()),
        ("redirect_uri", redirect_uri.trim()),
    ];
    post_token_form(client, token_url, credentials, &form).await
}

pub(crate) async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &ClientCredentials,
    refresh_token: &str,
) -> Result<OAuthTokenSet, TokenEndpointError> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.trim()),
    ];
    post_token_form(client, token_url, credentials, &form).await
}

pub(crate) async fn request_client_credentials_token(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &ClientCredentials,
) -> Result<OAuthTokenSet, TokenEndpointError> {
    let form = [("grant_type", "client_credentials")];
    post_token_form(client, token_url, credentials, &form).await
}

async fn post_token_form(
    client: &reqwest::Client,
    token_url: &str,
    credentials: &ClientCredentials,
    form: &[(&str, &str)],
) -> Result<OAuthTokenSet, TokenEndpointError> {
    let response = client
        .post(token_url.trim())
        .header(AUTHORIZATION, credentials.authorization_header())
        .header(ACCEPT, "application/json")
        .form(form)
        .send()
        .await
        .map_err(TokenEndpointError::Transport)?;

    let status = response.status();
    let body = response.text().await.map_err(TokenEndpointError::Transport)?;
    parse_token_response(status, &body)
}

pub(crate) fn parse_token_response(
    status: StatusCode,
    body: &str,
) -> Result<OAuthTokenSet, TokenEndpointError> {
    if !status.is_success() {
        let (error_code, error_message) = parse_oauth_error_details(body);
        let mut detail = String::new();
        if let Some(code) = error_code {
            detail.push_str(" code=");
            detail.push_str(code.as_str());
        }
        if let Some(message) = error_message {
            detail.push_str(" message=");
            detail.push_str(
                message
                    .chars()
                    .take(ERROR_MESSAGE_MAX_CHARS)
                    .collect::<String>()
                    .as_str(),
            );
        }
        detail.push_str(" body=");
        detail.push_str(sanitize_oauth_error_body_snippet(body).as_str());
        return Err(TokenEndpointError::Status { status, detail });
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| TokenEndpointError::InvalidResponse(format!("json invalid: {e}")))?;

    let access_token = non_empty_str(&value, "access_token")
        .ok_or_else(|| TokenEndpointError::InvalidResponse("missing access_token".to_string()))?;

    Ok(OAuthTokenSet {
        access_token,
        refresh_token: non_empty_str(&value, "refresh_token"),
        expires_in: value
            .get("expires_in")
            .and_then(parse_i64_lossy)
            .filter(|v| *v > 0),
        scope: non_empty_str(&value, "scope"),
    })
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token")
        || key_lc.contains("secret")
        || key_lc == "code"
        || key_lc == "authorization"
}

fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

fn sanitize_oauth_error_body_snippet(body: &str) -> String {
    if let Ok(mut value) = serde_json::from_str::<Value>(body) {
        redact_sensitive_json_fields(&mut value);
        if let Ok(encoded) = serde_json::to_string(&value) {
            return encoded.chars().take(ERROR_SNIPPET_MAX_CHARS).collect();
        }
    }
    body.chars().take(ERROR_SNIPPET_MAX_CHARS).collect()
}

/// Reads `{error, error_description}` (OAuth standard) or the Web API's
/// `{error: {status, message}}` shape.
fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let mut code = None;
    let mut message = non_empty_str(&value, "error_description");

    if let Some(error_value) = value.get("error") {
        if let Some(err_str) = error_value.as_str() {
            code = Some(err_str.trim().to_string()).filter(|v| !v.is_empty());
        } else if let Some(err_obj) = error_value.as_object() {
            code = err_obj
                .get("status")
                .and_then(parse_i64_lossy)
                .map(|v| v.to_string());
            if message.is_none() {
                message = err_obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
        }
    }

    (code, message)
}
