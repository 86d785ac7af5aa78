//! Usage: Spotify Accounts / Web API endpoint definitions and authorize URL building.

use crate::settings::AppSettings;
use crate::shared::error::AppResult;
use std::time::Duration;

const AUTHORIZE_PATH: &str = "/authorize";
const TOKEN_PATH: &str = "/api/token";
const PROFILE_PATH: &str = "/v1/me";
const PLAYLISTS_PATH: &str = "/v1/playlists";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpotifyEndpoints {
    pub(crate) authorize_url: String,
    pub(crate) token_url: String,
    pub(crate) api_base_url: String,
}

impl SpotifyEndpoints {
    pub(crate) fn from_settings(settings: &AppSettings) -> Self {
        let accounts = settings.accounts_base_url.trim_end_matches('/');
        Self {
            authorize_url: format!("{accounts}{AUTHORIZE_PATH}"),
            token_url: format!("{accounts}{TOKEN_PATH}"),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn profile_url(&self) -> String {
        format!("{}{PROFILE_PATH}", self.api_base_url)
    }

    pub(crate) fn playlist_url(&self, playlist_id: &str) -> AppResult<String> {
        let playlist_id = playlist_id.trim();
        if playlist_id.is_empty() {
            return Err("SEC_INVALID_INPUT: playlist id is required".into());
        }
        let mut url = reqwest::Url::parse(&format!("{}{PLAYLISTS_PATH}", self.api_base_url))
            .map_err(|e| format!("CONFIG_ERROR: invalid api base url: {e}"))?;
        url.path_segments_mut()
            .map_err(|_| "CONFIG_ERROR: api base url cannot be a base".to_string())?
            .push(playlist_id);
        Ok(url.to_string())
    }
}

/// Authorization Code request URL: `response_type`, `client_id`, `scope`,
/// `redirect_uri`, `state`, in that order.
pub(crate) fn build_authorize_url(
    endpoints: &SpotifyEndpoints,
    client_id: &str,
    scope: &str,
    redirect_uri: &str,
    state: &str,
) -> AppResult<String> {
    let mut url = reqwest::Url::parse(&endpoints.authorize_url)
        .map_err(|e| format!("SYSTEM_ERROR: invalid oauth authorize url: {e}"))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client_id)
        .append_pair("scope", scope)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("state", state);
    Ok(url.to_string())
}

pub(crate) fn http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("spotify-auth/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| format!("SYSTEM_ERROR: oauth client init failed: {e}").into())
}
