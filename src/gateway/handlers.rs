//! Usage: `/login`, `/callback` and `/refresh_token` handlers.

use crate::app_state::AppState;
use crate::blocking;
use crate::domain::refresh_tokens::RefreshTokenStore;
use crate::gateway::oauth::profile::spawn_profile_diagnostic;
use crate::gateway::oauth::provider::build_authorize_url;
use crate::gateway::oauth::state::{generate_state, verify_state, STATE_COOKIE};
use crate::gateway::oauth::token_exchange::{exchange_authorization_code, refresh_access_token};
use crate::settings::RefreshTokenSource;
use crate::shared::security::mask_token;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const ERROR_STATE_MISMATCH: &str = "/#error=state_mismatch";
const ERROR_INVALID_TOKEN: &str = "/#error=invalid_token";

const ERROR_REFRESH_TOKEN_REQUIRED: &str = "refresh_token must be supplied";
const ERROR_NO_STORED_REFRESH_TOKEN: &str = "no refresh token stored";
const ERROR_STORE_READ_FAILED: &str = "failed to read stored refresh token";
const ERROR_REFRESH_FAILED: &str = "Failed to refresh token";

const SUCCESS_HTML: &str = r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8" />
    <title>Spotify login complete</title>
  </head>
  <body>
    <h1>Login complete</h1>
    <p>You can close this window.</p>
  </body>
</html>"#;

/// 302 with `Location`. axum's `Redirect` only offers 303/307/308.
fn found(location: &str) -> (StatusCode, [(header::HeaderName, String); 1]) {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())])
}

fn state_cookie(value: String) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn json_error(status: StatusCode, message: &'static str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

pub(super) async fn login(State(state): State<AppState>, jar: CookieJar) -> Response {
    let auth_state = generate_state();
    let settings = &state.settings;

    let location = match build_authorize_url(
        &state.endpoints,
        state.credentials.client_id(),
        &settings.scopes,
        &settings.redirect_uri,
        &auth_state,
    ) {
        Ok(url) => url,
        Err(err) => {
            tracing::error!(error = %err, "failed to build authorize url");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tracing::debug!(scopes = %settings.scopes, "redirecting to spotify authorize");
    (jar.add(state_cookie(auth_state)), found(&location)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub(super) async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let stored_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    // Single use: cleared whatever the outcome.
    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/"));

    // A query that does not parse cannot carry a trustworthy state.
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "oauth callback query rejected");
            return (jar, found(ERROR_STATE_MISMATCH)).into_response();
        }
    };

    let check = verify_state(query.state.as_deref(), stored_state.as_deref());
    if !check.is_match() {
        tracing::warn!(reason = check.as_str(), "oauth callback state check failed");
        return (jar, found(ERROR_STATE_MISMATCH)).into_response();
    }

    if let Some(error) = query.error.as_deref().filter(|v| !v.trim().is_empty()) {
        tracing::warn!(provider_error = %error, "authorization denied by provider");
        return (jar, found(ERROR_INVALID_TOKEN)).into_response();
    }
    let Some(code) = query.code.as_deref().filter(|v| !v.trim().is_empty()) else {
        tracing::warn!("oauth callback without authorization code");
        return (jar, found(ERROR_INVALID_TOKEN)).into_response();
    };

    let tokens = match exchange_authorization_code(
        &state.client,
        &state.endpoints.token_url,
        &state.credentials,
        code,
        &state.settings.redirect_uri,
    )
    .await
    {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::warn!(error = %err, "authorization code exchange failed");
            return (jar, found(ERROR_INVALID_TOKEN)).into_response();
        }
    };

    tracing::info!(
        access_token = %mask_token(&tokens.access_token),
        refresh_token_issued = tokens.refresh_token.is_some(),
        expires_in = tokens.expires_in.unwrap_or_default(),
        scope = tokens.scope.as_deref().unwrap_or(""),
        "authorization code exchanged"
    );

    if let (Some(store), Some(refresh_token)) =
        (state.token_store.clone(), tokens.refresh_token.clone())
    {
        persist_refresh_token(store, refresh_token).await;
    }

    if state.settings.fetch_profile {
        spawn_profile_diagnostic(
            state.client.clone(),
            state.endpoints.profile_url(),
            tokens.access_token,
        );
    }

    (jar, Html(SUCCESS_HTML)).into_response()
}

/// Failures are logged only; the caller's response does not depend on them.
async fn persist_refresh_token(store: Arc<dyn RefreshTokenStore>, refresh_token: String) {
    let masked = mask_token(&refresh_token);
    match blocking::run("refresh_token_upsert", move || store.upsert(&refresh_token)).await {
        Ok(()) => tracing::info!(refresh_token = %masked, "refresh token stored"),
        Err(err) => {
            tracing::error!(refresh_token = %masked, error = %err, "failed to store refresh token")
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RefreshQuery {
    refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

pub(super) async fn refresh_token(
    State(state): State<AppState>,
    query: Result<Query<RefreshQuery>, QueryRejection>,
) -> Response {
    let source = state.settings.refresh_token_source;
    let refresh_token = match source {
        RefreshTokenSource::Query => {
            let supplied = query.ok().and_then(|Query(query)| query.refresh_token);
            match supplied.filter(|v| !v.trim().is_empty()) {
                Some(token) => token,
                None => return json_error(StatusCode::BAD_REQUEST, ERROR_REFRESH_TOKEN_REQUIRED),
            }
        }
        RefreshTokenSource::Store => {
            let Some(store) = state.token_store.clone() else {
                tracing::error!("refresh token store is not configured");
                return json_error(StatusCode::INTERNAL_SERVER_ERROR, ERROR_STORE_READ_FAILED);
            };
            match blocking::run("refresh_token_load", move || store.load()).await {
                Ok(Some(token)) => token,
                Ok(None) => {
                    return json_error(StatusCode::BAD_REQUEST, ERROR_NO_STORED_REFRESH_TOKEN)
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to read stored refresh token");
                    return json_error(StatusCode::INTERNAL_SERVER_ERROR, ERROR_STORE_READ_FAILED);
                }
            }
        }
    };

    let tokens = match refresh_access_token(
        &state.client,
        &state.endpoints.token_url,
        &state.credentials,
        &refresh_token,
    )
    .await
    {
        Ok(tokens) => tokens,
        Err(err) => {
            let status = err
                .upstream_status()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            tracing::warn!(
                source = source.as_str(),
                refresh_token = %mask_token(&refresh_token),
                status = status.as_u16(),
                error = %err,
                "token refresh failed"
            );
            return json_error(status, ERROR_REFRESH_FAILED);
        }
    };

    tracing::info!(
        source = source.as_str(),
        access_token = %mask_token(&tokens.access_token),
        refresh_token_rotated = tokens.refresh_token.is_some(),
        "access token refreshed"
    );

    if source == RefreshTokenSource::Store {
        if let (Some(store), Some(rotated)) =
            (state.token_store.clone(), tokens.refresh_token.clone())
        {
            persist_refresh_token(store, rotated).await;
        }
    }

    Json(RefreshResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
    .into_response()
}
