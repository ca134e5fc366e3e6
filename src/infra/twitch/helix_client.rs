// =============================================================================
// TWITCH HELIX CLIENT WITH APP ACCESS TOKEN CACHE
// =============================================================================
//
// Twitch's Helix API authenticates server-to-server calls with an app access
// token obtained through the OAuth2 client-credentials grant. Tokens live for
// hours, so we cache one and refresh it lazily on access.
//
// The cache treats a token as expired five minutes before Twitch says it is,
// so a token can never lapse in the middle of a request that already picked
// it up.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::links::{StreamInfoError, StreamInfoSource};

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const CHANNELS_URL: &str = "https://api.twitch.tv/helix/channels";

/// How early we treat a token as expired, in seconds.
const EXPIRY_MARGIN_SECS: i64 = 300;

/// The client-credentials refresh failed. Not retried here; the Helix
/// client degrades it to `StreamInfoError::Unavailable`.
#[derive(Debug, Error)]
#[error("token refresh failed: {0}")]
pub struct TokenRefreshError(String);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// A cached bearer token. Replaced wholesale on refresh, never mutated.
#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    /// Already includes the safety margin: refresh time plus `expires_in`
    /// minus five minutes.
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            value: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in - EXPIRY_MARGIN_SECS),
        }
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Lazily refreshed app access token. There is no background timer; every
/// caller goes through `bearer_token()`, and the mutex guarantees a single
/// in-flight refresh even if callers ever overlap.
pub struct AppTokenCache {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl AppTokenCache {
    pub fn new(client: Client, client_id: String, client_secret: String) -> Self {
        Self {
            client,
            token_url: TOKEN_URL.to_string(),
            client_id,
            client_secret,
            token: Mutex::new(None),
        }
    }

    /// Returns a currently valid token, refreshing first when the cached one
    /// is absent or inside the expiry margin.
    pub async fn bearer_token(&self) -> Result<String, TokenRefreshError> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        let refreshed = self.refresh().await?;
        let value = refreshed.value.clone();
        *guard = Some(refreshed);
        Ok(value)
    }

    async fn refresh(&self) -> Result<CachedToken, TokenRefreshError> {
        tracing::debug!("refreshing twitch app access token");

        let response = self
            .client
            .post(&self.token_url)
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "grant_type": "client_credentials",
            }))
            .send()
            .await
            .map_err(|e| TokenRefreshError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TokenRefreshError(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenRefreshError(e.to_string()))?;

        Ok(CachedToken::from_response(parsed, Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    data: Vec<ChannelInfo>,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    title: String,
}

/// Fetches channel metadata for one broadcaster. Every failure mode on this
/// path (refresh failure, transport error, non-2xx, empty data) maps to
/// `Unavailable` because a missing title only ever skips one chat event.
pub struct HelixClient {
    client: Client,
    channels_url: String,
    client_id: String,
    broadcaster_id: String,
    tokens: AppTokenCache,
}

impl HelixClient {
    pub fn new(
        client: Client,
        client_id: String,
        client_secret: String,
        broadcaster_id: String,
    ) -> Self {
        let tokens = AppTokenCache::new(client.clone(), client_id.clone(), client_secret);
        Self {
            client,
            channels_url: CHANNELS_URL.to_string(),
            client_id,
            broadcaster_id,
            tokens,
        }
    }
}

#[async_trait]
impl StreamInfoSource for HelixClient {
    async fn current_title(&self) -> Result<String, StreamInfoError> {
        let token = self
            .tokens
            .bearer_token()
            .await
            .map_err(|e| StreamInfoError::Unavailable(e.to_string()))?;

        let response = self
            .client
            .get(&self.channels_url)
            .query(&[("broadcaster_id", self.broadcaster_id.as_str())])
            .header("Authorization", format!("Bearer {token}"))
            .header("Client-Id", &self.client_id)
            .send()
            .await
            .map_err(|e| StreamInfoError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StreamInfoError::Unavailable(format!(
                "helix returned {}",
                response.status()
            )));
        }

        let channels: ChannelsResponse = response
            .json()
            .await
            .map_err(|e| StreamInfoError::Unavailable(e.to_string()))?;

        channels
            .data
            .into_iter()
            .next()
            .map(|channel| channel.title)
            .ok_or_else(|| StreamInfoError::Unavailable("no channel data returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: DateTime<Utc>) -> CachedToken {
        CachedToken {
            value: "abc123".to_string(),
            expires_at,
        }
    }

    #[test]
    fn token_is_valid_strictly_before_expiry() {
        let now = Utc::now();
        assert!(token(now + Duration::seconds(1)).is_valid_at(now));
        assert!(!token(now).is_valid_at(now));
        assert!(!token(now - Duration::seconds(1)).is_valid_at(now));
    }

    #[test]
    fn refresh_applies_five_minute_margin() {
        let now = Utc::now();
        let response = TokenResponse {
            access_token: "abc123".to_string(),
            expires_in: 3600,
        };

        let cached = CachedToken::from_response(response, now);
        assert_eq!(cached.expires_at, now + Duration::seconds(3300));
        assert!(cached.is_valid_at(now + Duration::seconds(3299)));
        assert!(!cached.is_valid_at(now + Duration::seconds(3300)));
    }

    #[tokio::test]
    async fn valid_cached_token_is_returned_without_a_refresh() {
        // Point the refresh path at a dead address: if bearer_token() tried
        // the network, this test would fail instead of returning the cache.
        let mut cache = AppTokenCache::new(
            Client::new(),
            "client".to_string(),
            "secret".to_string(),
        );
        cache.token_url = "http://127.0.0.1:9/oauth2/token".to_string();
        *cache.token.lock().await = Some(token(Utc::now() + Duration::seconds(600)));

        let value = cache.bearer_token().await.unwrap();
        assert_eq!(value, "abc123");
    }

    #[tokio::test]
    async fn expired_token_forces_a_refresh_attempt() {
        let mut cache = AppTokenCache::new(
            Client::new(),
            "client".to_string(),
            "secret".to_string(),
        );
        cache.token_url = "http://127.0.0.1:9/oauth2/token".to_string();
        *cache.token.lock().await = Some(token(Utc::now() - Duration::seconds(1)));

        // The dead endpoint makes the forced refresh observable as an error.
        assert!(cache.bearer_token().await.is_err());
    }

    #[test]
    fn channels_response_takes_first_title() {
        let json = r#"{"data": [{"title": "Hack Night", "broadcaster_id": "1"}]}"#;
        let parsed: ChannelsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data[0].title, "Hack Night");
    }

    #[test]
    fn empty_data_array_parses() {
        let parsed: ChannelsResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(parsed.data.is_empty());
    }
}
