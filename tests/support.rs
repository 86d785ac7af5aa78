#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use tower::ServiceExt;

use spotify_auth_lib::test_support::{
    AppError, AppResult, AppSettings, RefreshTokenSource, RefreshTokenStore,
};

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const STATE_COOKIE: &str = "spotify_auth_state";

pub const DEFAULT_TOKEN_BODY: &str = r#"{
  "access_token": "stub-access-token",
  "token_type": "Bearer",
  "scope": "user-read-private user-read-email",
  "expires_in": 3600,
  "refresh_token": "stub-refresh-token"
}"#;

/// One request as seen by the stub token endpoint.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub authorization: Option<String>,
    pub form: HashMap<String, String>,
}

struct StubInner {
    token_requests: Vec<TokenRequest>,
    token_status: StatusCode,
    token_body: String,
    profile_requests: Vec<Option<String>>,
    playlist_requests: Vec<(String, Option<String>)>,
}

/// In-process stand-in for the accounts service and the Web API.
#[derive(Clone)]
pub struct StubProvider {
    pub base_url: String,
    inner: Arc<Mutex<StubInner>>,
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn stub_token(
    State(inner): State<Arc<Mutex<StubInner>>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut inner = inner.lock().expect("stub lock");
    inner.token_requests.push(TokenRequest {
        authorization: authorization(&headers),
        form,
    });
    (
        inner.token_status,
        [(header::CONTENT_TYPE, "application/json")],
        inner.token_body.clone(),
    )
        .into_response()
}

async fn stub_profile(State(inner): State<Arc<Mutex<StubInner>>>, headers: HeaderMap) -> Response {
    inner
        .lock()
        .expect("stub lock")
        .profile_requests
        .push(authorization(&headers));
    axum::Json(serde_json::json!({
        "id": "stub-user",
        "display_name": "Stub User",
        "country": "SE",
        "product": "premium"
    }))
    .into_response()
}

async fn stub_playlist(
    State(inner): State<Arc<Mutex<StubInner>>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let auth = authorization(&headers);
    inner
        .lock()
        .expect("stub lock")
        .playlist_requests
        .push((id.clone(), auth.clone()));
    if auth.as_deref() != Some("Bearer stub-access-token") {
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({
                "error": {"status": 401, "message": "Invalid access token"}
            })),
        )
            .into_response();
    }
    axum::Json(serde_json::json!({
        "id": id,
        "name": "Stub Playlist",
        "owner": {"display_name": "Stub Owner", "id": "stub-owner"},
        "tracks": {"total": 42, "items": []}
    }))
    .into_response()
}

impl StubProvider {
    pub async fn start() -> Self {
        let inner = Arc::new(Mutex::new(StubInner {
            token_requests: Vec::new(),
            token_status: StatusCode::OK,
            token_body: DEFAULT_TOKEN_BODY.to_string(),
            profile_requests: Vec::new(),
            playlist_requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/api/token", post(stub_token))
            .route("/v1/me", get(stub_profile))
            .route("/v1/playlists/:id", get(stub_playlist))
            .with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub provider");
        let addr = listener.local_addr().expect("stub addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            inner,
        }
    }

    fn inner(&self) -> MutexGuard<'_, StubInner> {
        self.inner.lock().expect("stub lock")
    }

    pub fn reply_with(&self, status: StatusCode, body: &str) {
        let mut inner = self.inner();
        inner.token_status = status;
        inner.token_body = body.to_string();
    }

    pub fn token_requests(&self) -> Vec<TokenRequest> {
        self.inner().token_requests.clone()
    }

    pub fn profile_requests(&self) -> Vec<Option<String>> {
        self.inner().profile_requests.clone()
    }

    pub fn playlist_requests(&self) -> Vec<(String, Option<String>)> {
        self.inner().playlist_requests.clone()
    }

    /// Settings pointing both base urls at this stub.
    pub fn settings(&self) -> AppSettings {
        let mut settings = AppSettings::with_credentials(CLIENT_ID, CLIENT_SECRET, REDIRECT_URI);
        settings.accounts_base_url = self.base_url.clone();
        settings.api_base_url = self.base_url.clone();
        settings.fetch_profile = false;
        settings
    }

    pub fn store_settings(&self) -> AppSettings {
        let mut settings = self.settings();
        settings.refresh_token_source = RefreshTokenSource::Store;
        settings
    }
}

/// Records every upsert attempt; optionally fails reads or writes.
#[derive(Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
    upserts: Mutex<Vec<String>>,
    fail_load: bool,
    fail_upsert: bool,
}

impl MemoryStore {
    pub fn with_token(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new(Some(token.to_string())),
            ..Self::default()
        })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_load: true,
            ..Self::default()
        })
    }

    /// Reads `token`, but every write fails.
    pub fn failing_upsert(token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new(token.map(str::to_string)),
            fail_upsert: true,
            ..Self::default()
        })
    }

    pub fn current(&self) -> Option<String> {
        self.token.lock().expect("store lock").clone()
    }

    pub fn upserts(&self) -> Vec<String> {
        self.upserts.lock().expect("store lock").clone()
    }
}

impl RefreshTokenStore for MemoryStore {
    fn load(&self) -> AppResult<Option<String>> {
        if self.fail_load {
            return Err(AppError::new("DB_ERROR", "simulated read failure"));
        }
        Ok(self.current())
    }

    fn upsert(&self, refresh_token: &str) -> AppResult<()> {
        self.upserts
            .lock()
            .expect("store lock")
            .push(refresh_token.to_string());
        if self.fail_upsert {
            return Err(AppError::new("DB_ERROR", "simulated write failure"));
        }
        *self.token.lock().expect("store lock") = Some(refresh_token.to_string());
        Ok(())
    }
}

pub fn dyn_store(store: &Arc<MemoryStore>) -> Arc<dyn RefreshTokenStore> {
    store.clone()
}

pub fn router(settings: AppSettings, store: Option<Arc<dyn RefreshTokenStore>>) -> Router {
    spotify_auth_lib::test_support::build_router(settings, store).expect("build router")
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.expect("router response")
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn get_with_state_cookie(uri: &str, state: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("{STATE_COOKIE}={state}"))
        .body(Body::empty())
        .expect("request")
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("location str")
        .to_string()
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Value of the state cookie set by `/login`, if any.
pub fn state_cookie_value(response: &Response) -> Option<String> {
    set_cookies(response).into_iter().find_map(|raw| {
        let pair = raw.split(';').next()?.trim().to_string();
        let (name, value) = pair.split_once('=')?;
        (name == STATE_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

pub fn clears_state_cookie(response: &Response) -> bool {
    set_cookies(response)
        .iter()
        .any(|raw| raw.starts_with(&format!("{STATE_COOKIE}=;")) && raw.contains("Max-Age=0"))
}

/// Installs a fmt subscriber for the current thread so log fields are evaluated.
pub fn capture_logs() -> tracing::subscriber::DefaultGuard {
    tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish(),
    )
}

pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
