use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Feeds
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: String,
    #[serde(default)]
    pub rss_url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub last_polled_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub episode_count: i64,
}

impl Feed {
    /// Title for display, falling back to the RSS URL.
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.rss_url)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedCreate<'a> {
    pub rss_url: &'a str,
}

// ============================================================================
// Episodes
// ============================================================================

/// Server-driven processing state.
///
/// pending → downloading → transcribing → analyzing → completed / failed.
/// The console never computes transitions; the only local write is the
/// optimistic reset to `Pending` after a reprocess request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    Pending,
    Downloading,
    Transcribing,
    Analyzing,
    Completed,
    Failed,
    /// A status value this console does not know about yet.
    #[serde(other)]
    Unknown,
}

impl EpisodeStatus {
    pub const ALL: [EpisodeStatus; 6] = [
        Self::Pending,
        Self::Downloading,
        Self::Transcribing,
        Self::Analyzing,
        Self::Completed,
        Self::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Transcribing => "transcribing",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl Default for EpisodeStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EpisodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown episode status: {}", s))
    }
}

/// List-endpoint projection of an episode. Never carries a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub id: String,
    #[serde(default)]
    pub feed_id: String,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub status: EpisodeStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub mention_count: i64,
}

/// Single-item projection of an episode.
///
/// `mention_count` is optional here: it is a list-side aggregate and the
/// detail endpoint either omits it or reports a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeDetail {
    pub id: String,
    #[serde(default)]
    pub feed_id: String,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub status: EpisodeStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub mention_count: Option<i64>,
    #[serde(default)]
    pub transcript_text: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Canonical client-side episode record, shared by the list and detail views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    pub id: String,
    pub feed_id: String,
    pub guid: String,
    pub title: Option<String>,
    pub audio_url: Option<String>,
    pub published_at: Option<String>,
    pub status: EpisodeStatus,
    pub created_at: Option<String>,
    pub mention_count: i64,
    pub transcript_text: Option<String>,
    pub error_message: Option<String>,
    /// Whether a detail response has been merged into this record.
    pub has_detail: bool,
}

impl Episode {
    /// Title, falling back to the GUID when the feed gave no title.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.guid)
    }

    /// Overwrite the summary fields with a fresher list response, keeping
    /// anything only a detail response carries.
    pub fn merge_summary(&mut self, summary: EpisodeSummary) {
        self.feed_id = summary.feed_id;
        self.guid = summary.guid;
        self.title = summary.title;
        self.audio_url = summary.audio_url;
        self.published_at = summary.published_at;
        self.status = summary.status;
        self.created_at = summary.created_at;
        self.mention_count = summary.mention_count;
    }

    /// Overwrite with a detail response. The list-side mention count survives
    /// because the detail endpoint does not compute it.
    pub fn merge_detail(&mut self, detail: EpisodeDetail) {
        self.feed_id = detail.feed_id;
        self.guid = detail.guid;
        self.title = detail.title;
        self.audio_url = detail.audio_url;
        self.published_at = detail.published_at;
        self.status = detail.status;
        self.created_at = detail.created_at;
        self.transcript_text = detail.transcript_text;
        self.error_message = detail.error_message;
        self.has_detail = true;
    }
}

impl From<EpisodeSummary> for Episode {
    fn from(s: EpisodeSummary) -> Self {
        Self {
            id: s.id,
            feed_id: s.feed_id,
            guid: s.guid,
            title: s.title,
            audio_url: s.audio_url,
            published_at: s.published_at,
            status: s.status,
            created_at: s.created_at,
            mention_count: s.mention_count,
            transcript_text: None,
            error_message: None,
            has_detail: false,
        }
    }
}

impl From<EpisodeDetail> for Episode {
    fn from(d: EpisodeDetail) -> Self {
        Self {
            id: d.id,
            feed_id: d.feed_id,
            guid: d.guid,
            title: d.title,
            audio_url: d.audio_url,
            published_at: d.published_at,
            status: d.status,
            created_at: d.created_at,
            mention_count: d.mention_count.unwrap_or(0),
            transcript_text: d.transcript_text,
            error_message: d.error_message,
            has_detail: true,
        }
    }
}

/// Body returned by the reprocess and retry-enrichment actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeActionResponse {
    pub status: String,
    #[serde(default)]
    pub episode_id: Option<String>,
}

// ============================================================================
// Keywords
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Contains,
    ExactWord,
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::ExactWord => "exact_word",
            Self::Regex => "regex",
        }
    }
}

impl Default for MatchType {
    fn default() -> Self {
        Self::Contains
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(Self::Contains),
            "exact_word" => Ok(Self::ExactWord),
            "regex" => Ok(Self::Regex),
            _ => Err(format!(
                "match_type must be contains, exact_word, or regex (got {})",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub phrase: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct KeywordCreate<'a> {
    pub phrase: &'a str,
    pub match_type: MatchType,
}

// ============================================================================
// Mentions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
    /// Enrichment output outside the known set.
    #[serde(other)]
    Unknown,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Mixed => "mixed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "mixed" => Ok(Self::Mixed),
            _ => Err(format!(
                "sentiment must be positive, negative, neutral, or mixed (got {})",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    #[serde(default)]
    pub episode_id: String,
    #[serde(default)]
    pub keyword_id: String,
    pub matched_text: String,
    #[serde(default)]
    pub transcript_segment: String,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub context_summary: Option<String>,
    #[serde(default, deserialize_with = "string_items")]
    pub topics: Option<Vec<String>>,
    #[serde(default)]
    pub is_buying_signal: Option<bool>,
    #[serde(default)]
    pub is_pain_point: Option<bool>,
    #[serde(default)]
    pub is_recommendation: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub episode_title: Option<String>,
    #[serde(default)]
    pub podcast_title: Option<String>,
    #[serde(default)]
    pub keyword_phrase: Option<String>,
}

/// Keep the string entries of a free-form list; anything else is dropped.
fn string_items<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|items| {
        items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect()
    }))
}

/// Query-string filters for the mention list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentionQuery {
    pub feed_id: Option<String>,
    pub keyword_id: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl MentionQuery {
    /// Pairs in a fixed order so request URLs are reproducible.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(feed_id) = &self.feed_id {
            pairs.push(("feed_id", feed_id.clone()));
        }
        if let Some(keyword_id) = &self.keyword_id {
            pairs.push(("keyword_id", keyword_id.clone()));
        }
        if let Some(sentiment) = self.sentiment {
            pairs.push(("sentiment", sentiment.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

// ============================================================================
// Dashboard & Settings
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub feeds: i64,
    pub episodes: i64,
    pub keywords: i64,
    pub mentions: i64,
    pub episodes_completed: i64,
    pub episodes_processing: i64,
    pub episodes_failed: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionProvider {
    Local,
    External,
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::External => write!(f, "external"),
        }
    }
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "external" => Ok(Self::External),
            _ => Err(format!("provider must be local or external (got {})", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    pub provider: TranscriptionProvider,
    pub external_url: String,
    pub model: String,
    pub has_external_api_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSettingsUpdate {
    pub provider: TranscriptionProvider,
    pub external_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_api_key: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub clear_external_api_key: bool,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a server timestamp. Accepts RFC 3339 and naive ISO-8601 (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// `Mar 4, 2024` style date, or `None` when the timestamp does not parse.
pub fn format_short_date(raw: &str) -> Option<String> {
    parse_timestamp(raw).map(|dt| dt.format("%b %-d, %Y").to_string())
}
