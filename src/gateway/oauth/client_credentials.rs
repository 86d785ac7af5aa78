//! Usage: App-only access (client_credentials grant) and a playlist lookup with that token.

use crate::gateway::oauth::credentials::ClientCredentials;
use crate::gateway::oauth::provider::{http_client, SpotifyEndpoints};
use crate::gateway::oauth::token_exchange::request_client_credentials_token;
use crate::settings::AppSettings;
use crate::shared::error::AppResult;
use crate::shared::security::mask_token;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub owner: Option<String>,
    pub track_total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PlaylistBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    owner: Option<OwnerBody>,
    #[serde(default)]
    tracks: Option<TracksBody>,
}

#[derive(Debug, Deserialize)]
struct OwnerBody {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TracksBody {
    #[serde(default)]
    total: Option<u64>,
}

pub(crate) async fn request_app_token(
    client: &reqwest::Client,
    endpoints: &SpotifyEndpoints,
    credentials: &ClientCredentials,
) -> AppResult<String> {
    let tokens =
        request_client_credentials_token(client, &endpoints.token_url, credentials).await?;
    Ok(tokens.access_token)
}

pub(crate) fn parse_playlist(requested_id: &str, body: &str) -> AppResult<PlaylistSummary> {
    let parsed: PlaylistBody = serde_json::from_str(body)
        .map_err(|e| format!("UPSTREAM_ERROR: playlist json invalid: {e}"))?;
    let owner = parsed
        .owner
        .and_then(|owner| owner.display_name.or(owner.id))
        .filter(|v| !v.trim().is_empty());
    Ok(PlaylistSummary {
        id: parsed
            .id
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| requested_id.trim().to_string()),
        name: parsed.name.unwrap_or_default(),
        owner,
        track_total: parsed.tracks.and_then(|t| t.total),
    })
}

pub(crate) async fn fetch_playlist(
    client: &reqwest::Client,
    endpoints: &SpotifyEndpoints,
    access_token: &str,
    playlist_id: &str,
) -> AppResult<PlaylistSummary> {
    let url = endpoints.playlist_url(playlist_id)?;
    let response = client
        .get(&url)
        .header(AUTHORIZATION, format!("Bearer {}", access_token.trim()))
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| format!("UPSTREAM_ERROR: playlist request failed: {e}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("UPSTREAM_ERROR: playlist body read failed: {e}"))?;
    if !status.is_success() {
        let snippet: String = body.chars().take(200).collect();
        return Err(format!(
            "UPSTREAM_ERROR: playlist lookup returned status={} body={snippet}",
            status.as_u16()
        )
        .into());
    }
    parse_playlist(playlist_id, &body)
}

/// App token, then one playlist lookup. No user login involved.
pub(crate) async fn lookup_playlist(
    settings: &AppSettings,
    playlist_id: &str,
) -> AppResult<PlaylistSummary> {
    let client = http_client()?;
    let endpoints = SpotifyEndpoints::from_settings(settings);
    let credentials = ClientCredentials::new(&settings.client_id, &settings.client_secret);

    let access_token = request_app_token(&client, &endpoints, &credentials).await?;
    tracing::debug!(
        client_id = credentials.client_id(),
        access_token = %mask_token(&access_token),
        "obtained app access token"
    );
    fetch_playlist(&client, &endpoints, &access_token, playlist_id).await
}
