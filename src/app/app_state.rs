//! Usage: Shared router state and refresh token store initialization used by `gateway/*`.

use crate::domain::refresh_tokens::{RefreshTokenStore, SqliteRefreshTokenStore};
use crate::gateway::oauth::credentials::ClientCredentials;
use crate::gateway::oauth::provider::{http_client, SpotifyEndpoints};
use crate::settings::{AppSettings, RefreshTokenSource};
use crate::shared::error::AppResult;
use crate::{blocking, db};
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) settings: Arc<AppSettings>,
    pub(crate) endpoints: Arc<SpotifyEndpoints>,
    pub(crate) credentials: ClientCredentials,
    pub(crate) client: reqwest::Client,
    /// Present only when refresh tokens are read from the store.
    pub(crate) token_store: Option<Arc<dyn RefreshTokenStore>>,
}

impl AppState {
    pub(crate) fn new(
        settings: AppSettings,
        token_store: Option<Arc<dyn RefreshTokenStore>>,
    ) -> AppResult<Self> {
        let endpoints = SpotifyEndpoints::from_settings(&settings);
        let credentials = ClientCredentials::new(&settings.client_id, &settings.client_secret);
        Ok(Self {
            settings: Arc::new(settings),
            endpoints: Arc::new(endpoints),
            credentials,
            client: http_client()?,
            token_store,
        })
    }
}

/// Opens the SQLite store when the deployment reads refresh tokens from it.
pub(crate) async fn open_token_store(
    settings: &AppSettings,
) -> AppResult<Option<Arc<dyn RefreshTokenStore>>> {
    if settings.refresh_token_source != RefreshTokenSource::Store {
        return Ok(None);
    }
    let path = settings.db_path.clone();
    let db = blocking::run("db_init", move || db::init(&path)).await?;
    Ok(Some(Arc::new(SqliteRefreshTokenStore::new(db))))
}
