//! Remote data gateway for the monitoring API.
//!
//! One method per resource operation. No caching and no retries: every call
//! is a single request whose failure is handed back to the caller.

pub mod models;

#[cfg(test)]
mod tests;

use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

pub use models::{
    DashboardStats, EpisodeActionResponse, EpisodeDetail, EpisodeStatus, EpisodeSummary, Feed,
    Keyword, MatchType, Mention, MentionQuery, Sentiment, TranscriptionSettings,
    TranscriptionSettingsUpdate,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Construction-time options for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The lookups the episodes view chains together, plus its one mutation.
///
/// [`ApiClient`] is the production implementation; the session driver is
/// generic over this so it can be exercised against scripted responses.
pub trait EpisodeSource: Send + Sync + 'static {
    fn list_feeds(&self) -> impl Future<Output = Result<Vec<Feed>, ApiError>> + Send;

    fn list_episodes(
        &self,
        feed_id: &str,
    ) -> impl Future<Output = Result<Vec<EpisodeSummary>, ApiError>> + Send;

    fn get_episode(
        &self,
        episode_id: &str,
    ) -> impl Future<Output = Result<EpisodeDetail, ApiError>> + Send;

    fn reprocess_episode(
        &self,
        episode_id: &str,
    ) -> impl Future<Output = Result<EpisodeActionResponse, ApiError>> + Send;
}

/// HTTP client for the monitoring API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(options: GatewayOptions) -> Result<Self, ApiError> {
        let base_url = Url::parse(&options.base_url)
            .map_err(|_| ApiError::InvalidUrl(options.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(options.base_url));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // ------------------------------------------------------------------
    // Dashboard & settings
    // ------------------------------------------------------------------

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.fetch(Method::GET, &["dashboard", "stats"], &[], None::<&()>)
            .await
    }

    pub async fn get_transcription_settings(&self) -> Result<TranscriptionSettings, ApiError> {
        self.fetch(Method::GET, &["settings", "transcription"], &[], None::<&()>)
            .await
    }

    pub async fn update_transcription_settings(
        &self,
        payload: &TranscriptionSettingsUpdate,
    ) -> Result<TranscriptionSettings, ApiError> {
        self.fetch(
            Method::PUT,
            &["settings", "transcription"],
            &[],
            Some(payload),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Feeds
    // ------------------------------------------------------------------

    pub async fn list_feeds(&self) -> Result<Vec<Feed>, ApiError> {
        self.fetch(Method::GET, &["feeds"], &[], None::<&()>).await
    }

    pub async fn create_feed(&self, rss_url: &str) -> Result<Feed, ApiError> {
        let rss_url = rss_url.trim();
        if rss_url.is_empty() {
            return Err(ApiError::InvalidId {
                kind: "rss_url",
                value: rss_url.to_string(),
            });
        }
        let body = models::FeedCreate { rss_url };
        self.fetch(Method::POST, &["feeds"], &[], Some(&body)).await
    }

    pub async fn delete_feed(&self, feed_id: &str) -> Result<(), ApiError> {
        let feed_id = validate_id("feed", feed_id)?;
        self.execute(Method::DELETE, &["feeds", feed_id], &[], None::<&()>)
            .await
    }

    // ------------------------------------------------------------------
    // Episodes
    // ------------------------------------------------------------------

    pub async fn list_episodes(&self, feed_id: &str) -> Result<Vec<EpisodeSummary>, ApiError> {
        let feed_id = validate_id("feed", feed_id)?;
        self.fetch(
            Method::GET,
            &["episodes", "by-feed", feed_id],
            &[],
            None::<&()>,
        )
        .await
    }

    pub async fn get_episode(&self, episode_id: &str) -> Result<EpisodeDetail, ApiError> {
        let episode_id = validate_id("episode", episode_id)?;
        self.fetch(Method::GET, &["episodes", episode_id], &[], None::<&()>)
            .await
    }

    pub async fn reprocess_episode(
        &self,
        episode_id: &str,
    ) -> Result<EpisodeActionResponse, ApiError> {
        let episode_id = validate_id("episode", episode_id)?;
        self.fetch(
            Method::POST,
            &["episodes", episode_id, "reprocess"],
            &[],
            None::<&()>,
        )
        .await
    }

    /// Re-run keyword detection and enrichment on an existing transcript.
    pub async fn retry_enrichment(
        &self,
        episode_id: &str,
    ) -> Result<EpisodeActionResponse, ApiError> {
        let episode_id = validate_id("episode", episode_id)?;
        self.fetch(
            Method::POST,
            &["episodes", episode_id, "retry-enrichment"],
            &[],
            None::<&()>,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Keywords
    // ------------------------------------------------------------------

    pub async fn list_keywords(&self) -> Result<Vec<Keyword>, ApiError> {
        self.fetch(Method::GET, &["keywords"], &[], None::<&()>).await
    }

    pub async fn create_keyword(
        &self,
        phrase: &str,
        match_type: MatchType,
    ) -> Result<Keyword, ApiError> {
        if phrase.trim().is_empty() {
            return Err(ApiError::InvalidId {
                kind: "keyword phrase",
                value: phrase.to_string(),
            });
        }
        let body = models::KeywordCreate { phrase, match_type };
        self.fetch(Method::POST, &["keywords"], &[], Some(&body))
            .await
    }

    pub async fn delete_keyword(&self, keyword_id: &str) -> Result<(), ApiError> {
        let keyword_id = validate_id("keyword", keyword_id)?;
        self.execute(Method::DELETE, &["keywords", keyword_id], &[], None::<&()>)
            .await
    }

    // ------------------------------------------------------------------
    // Mentions
    // ------------------------------------------------------------------

    pub async fn list_mentions(&self, query: &MentionQuery) -> Result<Vec<Mention>, ApiError> {
        let pairs = query.pairs();
        self.fetch(Method::GET, &["mentions"], &pairs, None::<&()>)
            .await
    }

    pub async fn get_mention(&self, mention_id: &str) -> Result<Mention, ApiError> {
        let mention_id = validate_id("mention", mention_id)?;
        self.fetch(Method::GET, &["mentions", mention_id], &[], None::<&()>)
            .await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    /// Build `<base>/api/v1/<segments…>?<query>`. Segments are percent-encoded,
    /// so an identifier can never escape its path position.
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }

    /// Send a request and decode its JSON body. A 204 is reported as
    /// `UnexpectedNoContent` instead of being decoded.
    async fn fetch<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments, query);
        let path = url.path().to_string();
        match self.send(method, url, body).await? {
            Some(text) => serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                path,
                message: e.to_string(),
            }),
            None => Err(ApiError::UnexpectedNoContent { path }),
        }
    }

    /// Send a request whose success carries no resource (deletes).
    async fn execute<B>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments, query);
        self.send(method, url, body).await.map(|_| ())
    }

    /// Returns `None` for 204 and the raw body text for any other 2xx.
    #[tracing::instrument(level = "debug", skip(self, body), fields(path = %url.path()))]
    async fn send<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Option<String>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        log::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("API returned {}: {}", status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }
}

impl EpisodeSource for ApiClient {
    async fn list_feeds(&self) -> Result<Vec<Feed>, ApiError> {
        ApiClient::list_feeds(self).await
    }

    async fn list_episodes(&self, feed_id: &str) -> Result<Vec<EpisodeSummary>, ApiError> {
        ApiClient::list_episodes(self, feed_id).await
    }

    async fn get_episode(&self, episode_id: &str) -> Result<EpisodeDetail, ApiError> {
        ApiClient::get_episode(self, episode_id).await
    }

    async fn reprocess_episode(
        &self,
        episode_id: &str,
    ) -> Result<EpisodeActionResponse, ApiError> {
        ApiClient::reprocess_episode(self, episode_id).await
    }
}

fn validate_id<'a>(kind: &'static str, id: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        return Err(ApiError::InvalidId {
            kind,
            value: id.to_string(),
        });
    }
    Ok(trimmed)
}
