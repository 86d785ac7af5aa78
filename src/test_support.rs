//! Usage: Public test helpers for integration tests.

use std::path::Path;
use std::sync::Arc;

pub use crate::domain::refresh_tokens::RefreshTokenStore;
pub use crate::gateway::oauth::client_credentials::PlaylistSummary;
pub use crate::settings::{AppSettings, RefreshTokenSource};
pub use crate::shared::error::{AppError, AppResult};

/// The full application router over the given settings and optional store.
pub fn build_router(
    settings: AppSettings,
    token_store: Option<Arc<dyn RefreshTokenStore>>,
) -> AppResult<axum::Router> {
    let state = crate::app_state::AppState::new(settings, token_store)?;
    Ok(crate::gateway::build_router(state))
}

pub fn open_sqlite_store(path: &Path) -> AppResult<Arc<dyn RefreshTokenStore>> {
    let db = crate::db::init(path)?;
    Ok(Arc::new(
        crate::domain::refresh_tokens::SqliteRefreshTokenStore::new(db),
    ))
}

pub async fn open_token_store(
    settings: &AppSettings,
) -> AppResult<Option<Arc<dyn RefreshTokenStore>>> {
    crate::app_state::open_token_store(settings).await
}

pub fn basic_authorization_header(client_id: &str, client_secret: &str) -> String {
    crate::gateway::oauth::credentials::basic_authorization_header(client_id, client_secret)
}

pub async fn lookup_playlist(
    settings: &AppSettings,
    playlist_id: &str,
) -> AppResult<PlaylistSummary> {
    crate::gateway::oauth::client_credentials::lookup_playlist(settings, playlist_id).await
}

pub fn settings_from_vars(vars: &[(&str, &str)]) -> AppResult<AppSettings> {
    AppSettings::from_sources(Default::default(), |key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    })
}
