//! Usage: Process settings (env vars layered over an optional TOML file).

use crate::shared::error::AppResult;
use crate::shared::security::mask_token;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";
pub const DEFAULT_SCOPES: &str = "user-read-private user-read-email";
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com";
const DEFAULT_DB_FILE_NAME: &str = "spotify-auth.db";
const DEFAULT_FETCH_PROFILE: bool = true;

pub const CONFIG_FILE_ENV: &str = "SPOTIFY_AUTH_CONFIG_FILE";
const CLIENT_ID_ENV: &str = "CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "CLIENT_SECRET";
const REDIRECT_URI_ENV: &str = "REDIRECT_URI";
const PORT_ENV: &str = "PORT";
const LISTEN_HOST_ENV: &str = "SPOTIFY_AUTH_LISTEN_HOST";
const SCOPES_ENV: &str = "SPOTIFY_AUTH_SCOPES";
const ACCOUNTS_URL_ENV: &str = "SPOTIFY_AUTH_ACCOUNTS_URL";
const API_URL_ENV: &str = "SPOTIFY_AUTH_API_URL";
const REFRESH_SOURCE_ENV: &str = "SPOTIFY_AUTH_REFRESH_SOURCE";
const DB_PATH_ENV: &str = "SPOTIFY_AUTH_DB_PATH";
const FETCH_PROFILE_ENV: &str = "SPOTIFY_AUTH_FETCH_PROFILE";
const STATIC_DIR_ENV: &str = "SPOTIFY_AUTH_STATIC_DIR";
const LOG_DIR_ENV: &str = "SPOTIFY_AUTH_LOG_DIR";

/// Where `/refresh_token` takes its refresh token from. Fixed per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTokenSource {
    /// `?refresh_token=` query parameter.
    #[default]
    Query,
    /// The single persisted row.
    Store,
}

impl RefreshTokenSource {
    pub(crate) fn parse_strict(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "query" => Some(Self::Query),
            "store" => Some(Self::Store),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Store => "store",
        }
    }
}

/// Shape of the optional TOML settings file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct FileSettings {
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    listen_host: Option<String>,
    port: Option<u16>,
    scopes: Option<String>,
    accounts_base_url: Option<String>,
    api_base_url: Option<String>,
    refresh_token_source: Option<RefreshTokenSource>,
    db_path: Option<PathBuf>,
    fetch_profile: Option<bool>,
    static_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
}

#[derive(Clone)]
pub struct AppSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub listen_host: String,
    pub port: u16,
    pub scopes: String,
    pub accounts_base_url: String,
    pub api_base_url: String,
    pub refresh_token_source: RefreshTokenSource,
    pub db_path: PathBuf,
    pub fetch_profile: bool,
    pub static_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &mask_token(&self.client_secret))
            .field("redirect_uri", &self.redirect_uri)
            .field("listen_host", &self.listen_host)
            .field("port", &self.port)
            .field("scopes", &self.scopes)
            .field("accounts_base_url", &self.accounts_base_url)
            .field("api_base_url", &self.api_base_url)
            .field("refresh_token_source", &self.refresh_token_source)
            .field("db_path", &self.db_path)
            .field("fetch_profile", &self.fetch_profile)
            .field("static_dir", &self.static_dir)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl AppSettings {
    /// Settings with defaults for everything except the client credentials.
    pub fn with_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            listen_host: DEFAULT_LISTEN_HOST.to_string(),
            port: DEFAULT_PORT,
            scopes: DEFAULT_SCOPES.to_string(),
            accounts_base_url: DEFAULT_ACCOUNTS_BASE_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            refresh_token_source: RefreshTokenSource::Query,
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            fetch_profile: DEFAULT_FETCH_PROFILE,
            static_dir: None,
            log_dir: None,
        }
    }

    pub(crate) fn from_sources(
        file: FileSettings,
        mut get: impl FnMut(&str) -> Option<String>,
    ) -> AppResult<Self> {
        // Credentials go into the Basic header as given; only blank counts as unset.
        let client_id = verbatim(get(CLIENT_ID_ENV))
            .or_else(|| verbatim(file.client_id))
            .ok_or_else(|| format!("CONFIG_ERROR: {CLIENT_ID_ENV} is required"))?;
        let client_secret = verbatim(get(CLIENT_SECRET_ENV))
            .or_else(|| verbatim(file.client_secret))
            .ok_or_else(|| format!("CONFIG_ERROR: {CLIENT_SECRET_ENV} is required"))?;

        let mut text = |key: &str, fallback: Option<String>| -> Option<String> {
            get(key)
                .as_deref()
                .and_then(normalize_text)
                .or_else(|| fallback.as_deref().and_then(normalize_text))
        };
        let redirect_uri = text(REDIRECT_URI_ENV, file.redirect_uri).unwrap_or_default();

        let listen_host = text(LISTEN_HOST_ENV, file.listen_host)
            .unwrap_or_else(|| DEFAULT_LISTEN_HOST.to_string());
        let port = text(PORT_ENV, None)
            .as_deref()
            .and_then(parse_port)
            .or(file.port.filter(|p| *p > 0))
            .unwrap_or(DEFAULT_PORT);
        let scopes = text(SCOPES_ENV, file.scopes)
            .map(|raw| raw.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string());
        let accounts_base_url = text(ACCOUNTS_URL_ENV, file.accounts_base_url)
            .map(|v| trim_trailing_slash(&v))
            .unwrap_or_else(|| DEFAULT_ACCOUNTS_BASE_URL.to_string());
        let api_base_url = text(API_URL_ENV, file.api_base_url)
            .map(|v| trim_trailing_slash(&v))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let refresh_token_source = match text(REFRESH_SOURCE_ENV, None) {
            Some(raw) => RefreshTokenSource::parse_strict(&raw).ok_or_else(|| {
                format!(
                    "CONFIG_ERROR: {REFRESH_SOURCE_ENV} must be `query` or `store`, got `{raw}`"
                )
            })?,
            None => file.refresh_token_source.unwrap_or_default(),
        };

        let db_path = text(DB_PATH_ENV, None)
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));
        let fetch_profile = text(FETCH_PROFILE_ENV, None)
            .as_deref()
            .and_then(parse_bool_lossy)
            .or(file.fetch_profile)
            .unwrap_or(DEFAULT_FETCH_PROFILE);
        let static_dir = text(STATIC_DIR_ENV, None).map(PathBuf::from).or(file.static_dir);
        let log_dir = text(LOG_DIR_ENV, None).map(PathBuf::from).or(file.log_dir);

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            listen_host,
            port,
            scopes,
            accounts_base_url,
            api_base_url,
            refresh_token_source,
            db_path,
            fetch_profile,
            static_dir,
            log_dir,
        })
    }

    /// Checks the keys only the HTTP server needs.
    pub fn ensure_server_ready(&self) -> AppResult<()> {
        if self.redirect_uri.trim().is_empty() {
            return Err(format!("CONFIG_ERROR: {REDIRECT_URI_ENV} is required").into());
        }
        reqwest::Url::parse(&self.redirect_uri).map_err(|e| {
            format!("CONFIG_ERROR: {REDIRECT_URI_ENV} is not an absolute url: {e}")
        })?;
        Ok(())
    }
}

/// Reads settings from the process environment, on top of the TOML file named by
/// `SPOTIFY_AUTH_CONFIG_FILE` when set.
pub fn load() -> AppResult<AppSettings> {
    let file = match env::var(CONFIG_FILE_ENV) {
        Ok(path) if !path.trim().is_empty() => read_file_settings(Path::new(path.trim()))?,
        _ => FileSettings::default(),
    };
    AppSettings::from_sources(file, |key| env::var(key).ok())
}

fn read_file_settings(path: &Path) -> AppResult<FileSettings> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        format!(
            "CONFIG_ERROR: failed to read config file {}: {e}",
            path.display()
        )
    })?;
    parse_file_settings(&raw)
}

pub(crate) fn parse_file_settings(raw: &str) -> AppResult<FileSettings> {
    toml::from_str(raw).map_err(|e| format!("CONFIG_ERROR: invalid config file: {e}").into())
}

fn verbatim(raw: Option<String>) -> Option<String> {
    raw.filter(|v| !v.trim().is_empty())
}

fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u16>().ok().filter(|p| *p > 0)
}

fn parse_bool_lossy(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn trim_trailing_slash(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> AppResult<AppSettings> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        AppSettings::from_sources(FileSettings::default(), |key| {
            vars.get(key).map(|v| (*v).to_string())
        })
    }

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let cfg = from_vars(&[("CLIENT_ID", "id"), ("CLIENT_SECRET", "secret")]).expect("cfg");
        assert_eq!(cfg.client_id, "id");
        assert_eq!(cfg.client_secret, "secret");
        assert_eq!(cfg.redirect_uri, "");
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.listen_host, DEFAULT_LISTEN_HOST);
        assert_eq!(cfg.scopes, DEFAULT_SCOPES);
        assert_eq!(cfg.accounts_base_url, DEFAULT_ACCOUNTS_BASE_URL);
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(cfg.refresh_token_source, RefreshTokenSource::Query);
        assert!(cfg.fetch_profile);
        assert!(cfg.static_dir.is_none());
    }

    #[test]
    fn missing_client_secret_is_a_config_error() {
        let err = from_vars(&[("CLIENT_ID", "id")]).expect_err("should fail");
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.message().contains("CLIENT_SECRET"));
    }

    #[test]
    fn env_values_are_parsed_and_normalized() {
        let cfg = from_vars(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("REDIRECT_URI", " http://localhost:8888/callback "),
            ("PORT", "9000"),
            ("SPOTIFY_AUTH_SCOPES", "  playlist-read-private   user-read-email "),
            ("SPOTIFY_AUTH_ACCOUNTS_URL", "http://127.0.0.1:4000/"),
            ("SPOTIFY_AUTH_REFRESH_SOURCE", "STORE"),
            ("SPOTIFY_AUTH_FETCH_PROFILE", "no"),
        ])
        .expect("cfg");
        assert_eq!(cfg.client_id, "id");
        assert_eq!(cfg.redirect_uri, "http://localhost:8888/callback");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.scopes, "playlist-read-private user-read-email");
        assert_eq!(cfg.accounts_base_url, "http://127.0.0.1:4000");
        assert_eq!(cfg.refresh_token_source, RefreshTokenSource::Store);
        assert!(!cfg.fetch_profile);
        cfg.ensure_server_ready().expect("server ready");
    }

    #[test]
    fn credentials_are_kept_verbatim() {
        let cfg = from_vars(&[("CLIENT_ID", " id"), ("CLIENT_SECRET", "secret \n")]).expect("cfg");
        assert_eq!(cfg.client_id, " id");
        assert_eq!(cfg.client_secret, "secret \n");
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let err = from_vars(&[("CLIENT_ID", "   "), ("CLIENT_SECRET", "secret")])
            .expect_err("should fail");
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.message().contains("CLIENT_ID"));
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let cfg = from_vars(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("PORT", "eighty"),
        ])
        .expect("cfg");
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn unknown_refresh_source_is_rejected() {
        let err = from_vars(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("SPOTIFY_AUTH_REFRESH_SOURCE", "both"),
        ])
        .expect_err("should fail");
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn server_requires_absolute_redirect_uri() {
        let cfg = from_vars(&[("CLIENT_ID", "id"), ("CLIENT_SECRET", "secret")]).expect("cfg");
        assert!(cfg.ensure_server_ready().is_err());

        let mut cfg = cfg;
        cfg.redirect_uri = "/callback".to_string();
        assert!(cfg.ensure_server_ready().is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let file = parse_file_settings(
            r#"
client_id = "file-id"
client_secret = "file-secret"
port = 7000
refresh_token_source = "store"
db_path = "/tmp/tokens.db"
fetch_profile = false
"#,
        )
        .expect("toml");
        let vars: HashMap<&str, &str> = HashMap::from([("CLIENT_ID", "env-id"), ("PORT", "7100")]);
        let cfg = AppSettings::from_sources(file, |key| vars.get(key).map(|v| (*v).to_string()))
            .expect("cfg");
        assert_eq!(cfg.client_id, "env-id");
        assert_eq!(cfg.client_secret, "file-secret");
        assert_eq!(cfg.port, 7100);
        assert_eq!(cfg.refresh_token_source, RefreshTokenSource::Store);
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/tokens.db"));
        assert!(!cfg.fetch_profile);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = parse_file_settings("port = \"not a number\"").expect_err("should fail");
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn debug_output_masks_client_secret() {
        let cfg = AppSettings::with_credentials("id", "supersecretvalue123", "http://x/callback");
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("supersecretvalue123"));
        assert!(rendered.contains("supers...e123"));
    }
}
