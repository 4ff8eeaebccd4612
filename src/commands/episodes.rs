use crate::api::models::{format_short_date, Episode};
use crate::api::ApiClient;
use crate::controller::{Controller, DetailView, EmptyReason, ListView, Slot};
use crate::error::AppError;
use crate::filter::StatusFilter;
use crate::highlight::{highlight_segments, render_segments, word_count, HighlightStyle};
use std::path::{Path, PathBuf};

pub const NO_FEEDS: &str = "Add a feed to see episodes.";
pub const NO_MATCHES: &str = "No episodes match the filters.";
pub const PICK_EPISODE: &str = "Pick an episode to view the transcript.";
pub const NOT_READY: &str = "Transcript not ready yet.";
pub const NO_AUDIO: &str = "Audio file not available";

const FILE_NAME_CHARS: usize = 80;

// ============================================================================
// List pane
// ============================================================================

pub fn render_list(c: &Controller) -> String {
    let mut lines = vec![feed_header(c)];
    if c.feeds_slot().value().is_none() {
        return lines.join("\n");
    }

    let selection = c.selection();
    let query = selection.query.trim();
    if selection.status_filter != StatusFilter::All || !query.is_empty() {
        lines.push(format!(
            "Filter: status={} search={:?}",
            selection.status_filter, query
        ));
    }

    match c.list_view() {
        ListView::Loading => lines.push("Loading episodes...".to_string()),
        ListView::Failed(message) => lines.push(format!("Failed to load episodes: {}", message)),
        ListView::Empty(EmptyReason::NoFeeds) => lines.push(NO_FEEDS.to_string()),
        ListView::Empty(EmptyReason::NoMatches) => lines.push(NO_MATCHES.to_string()),
        ListView::Rows(rows) => {
            let open = selection.episode_id.as_deref();
            lines.extend(rows.iter().map(|ep| render_row(ep, open == Some(ep.id.as_str()))));
        }
    }
    lines.join("\n")
}

fn feed_header(c: &Controller) -> String {
    match c.feeds_slot() {
        Slot::Idle => "No feeds loaded.".to_string(),
        Slot::Loading { .. } => "Loading feeds...".to_string(),
        Slot::Errored { message, .. } => format!("Failed to load feeds: {}", message),
        Slot::Loaded { value, .. } if value.is_empty() => "No feeds available".to_string(),
        Slot::Loaded { value, .. } => match c.selected_feed() {
            Some(feed) => format!(
                "Feed: {} ({})  [{} feeds]",
                feed.display_name(),
                feed.id,
                value.len()
            ),
            None => format!("No feed selected  [{} feeds]", value.len()),
        },
    }
}

pub fn render_row(ep: &Episode, open: bool) -> String {
    let marker = if open { '>' } else { ' ' };
    let published = ep
        .published_at
        .as_deref()
        .and_then(format_short_date)
        .map(|d| format!("  {}", d))
        .unwrap_or_default();
    format!(
        "{} {}  {}  [{}]{}  {} mentions",
        marker,
        ep.id,
        ep.display_title(),
        ep.status,
        published,
        ep.mention_count
    )
}

// ============================================================================
// Detail pane
// ============================================================================

pub fn render_detail(c: &Controller, style: HighlightStyle) -> String {
    match c.detail_view() {
        DetailView::Empty => PICK_EPISODE.to_string(),
        DetailView::Loading => "Loading episode...".to_string(),
        DetailView::Failed(message) => format!("Failed to load episode: {}", message),
        DetailView::Unavailable { episode, error } => {
            format!("{}\nTranscript unavailable: {}", detail_header(episode), error)
        }
        DetailView::NotReady { episode } => format!("{}\n{}", detail_header(episode), NOT_READY),
        DetailView::Transcript { episode, text } => {
            let audio = match episode.audio_url.as_deref().filter(|u| !u.is_empty()) {
                Some(url) => format!("Audio: {}", url),
                None => NO_AUDIO.to_string(),
            };
            let body = render_segments(&highlight_segments(text, &c.selection().query), style);
            format!("{}\n{}\n\n{}", detail_header(episode), audio, body)
        }
    }
}

fn detail_header(ep: &Episode) -> String {
    let words = word_count(ep.transcript_text.as_deref().unwrap_or(""));
    format!("{}\n{} • {} words", ep.display_title(), ep.status, words)
}

// ============================================================================
// Actions
// ============================================================================

/// `<title|guid|transcript>` cut to 80 characters with path separators
/// replaced, plus `.txt`.
pub fn transcript_file_name(ep: &Episode) -> String {
    let base = [ep.title.as_deref(), Some(ep.guid.as_str())]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("transcript");
    let name: String = base
        .chars()
        .take(FILE_NAME_CHARS)
        .map(|ch| match ch {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect();
    format!("{}.txt", name)
}

/// Write the open transcript into `dir`. Refused when there is no transcript
/// text or the episode carries a processing error.
pub async fn download_transcript(c: &Controller, dir: &Path) -> Result<PathBuf, AppError> {
    let (episode, text) = match c.detail_view() {
        DetailView::Transcript { episode, text } => (episode, text),
        DetailView::Unavailable { error, .. } => {
            return Err(AppError::Other(format!(
                "Transcript unavailable: {}",
                error
            )))
        }
        _ => return Err(AppError::Other("No transcript to download".to_string())),
    };

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(transcript_file_name(episode));
    tokio::fs::write(&path, text.as_bytes()).await?;
    log::info!(
        "Saved transcript for episode {} to {}",
        episode.id,
        path.display()
    );
    Ok(path)
}

pub async fn retry_enrichment(client: &ApiClient, episode_id: &str) -> Result<String, AppError> {
    let response = client.retry_enrichment(episode_id).await?;
    Ok(format!(
        "Enrichment queued for episode {} ({})",
        response.episode_id.as_deref().unwrap_or(episode_id),
        response.status
    ))
}
