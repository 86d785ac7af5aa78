//! Usage: Post-login diagnostic profile lookup (`GET /v1/me`); the result is only logged.

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

const PROFILE_BODY_SNIPPET_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct SpotifyProfile {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(default)]
    pub(crate) display_name: Option<String>,
    #[serde(default)]
    pub(crate) country: Option<String>,
    #[serde(default)]
    pub(crate) product: Option<String>,
}

pub(crate) fn parse_profile(body: &str) -> Result<SpotifyProfile, String> {
    serde_json::from_str(body).map_err(|e| format!("profile json invalid: {e}"))
}

pub(crate) async fn fetch_profile(
    client: &reqwest::Client,
    profile_url: &str,
    access_token: &str,
) -> Result<SpotifyProfile, String> {
    let response = client
        .get(profile_url)
        .header(AUTHORIZATION, format!("Bearer {}", access_token.trim()))
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| format!("profile request failed: {e}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("profile body read failed: {e}"))?;
    if !status.is_success() {
        let snippet: String = body.chars().take(PROFILE_BODY_SNIPPET_MAX_CHARS).collect();
        return Err(format!("profile status={} body={snippet}", status.as_u16()));
    }
    parse_profile(&body)
}

/// Fire-and-forget. Never affects the callback response.
pub(crate) fn spawn_profile_diagnostic(
    client: reqwest::Client,
    profile_url: String,
    access_token: String,
) {
    tokio::spawn(async move {
        match fetch_profile(&client, &profile_url, &access_token).await {
            Ok(profile) => tracing::info!(
                user_id = profile.id.as_deref().unwrap_or(""),
                display_name = profile.display_name.as_deref().unwrap_or(""),
                country = profile.country.as_deref().unwrap_or(""),
                product = profile.product.as_deref().unwrap_or(""),
                "fetched spotify profile"
            ),
            Err(err) => tracing::warn!(error = %err, "spotify profile lookup failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile_fields_and_ignores_unknown_keys() {
        let body = r#"{
          "id": "wizzler",
          "display_name": "JM Wizzler",
          "email": "email@example.com",
          "country": "SE",
          "product": "premium",
          "followers": {"total": 3},
          "images": []
        }"#;
        let profile = parse_profile(body).expect("profile");
        assert_eq!(profile.id.as_deref(), Some("wizzler"));
        assert_eq!(profile.display_name.as_deref(), Some("JM Wizzler"));
        assert_eq!(profile.product.as_deref(), Some("premium"));
    }

    #[test]
    fn missing_fields_default_to_none() {
        let profile = parse_profile(r#"{"id":"u1","display_name":null}"#).expect("profile");
        assert_eq!(profile.id.as_deref(), Some("u1"));
        assert_eq!(profile.display_name, None);
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(parse_profile("not json").is_err());
    }
}
