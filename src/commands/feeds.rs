use crate::api::models::{format_short_date, Feed};
use crate::api::ApiClient;
use crate::error::AppError;

pub const DELETE_PROMPT: &str = "Delete this feed and all its episodes?";
pub const NO_FEEDS: &str = "No feeds yet. Add a podcast RSS URL with `feeds add <url>`.";

pub async fn list_feeds(client: &ApiClient) -> Result<String, AppError> {
    let feeds = client.list_feeds().await?;
    if feeds.is_empty() {
        return Ok(NO_FEEDS.to_string());
    }
    Ok(feeds.iter().map(render_feed).collect::<Vec<_>>().join("\n"))
}

pub async fn add_feed(client: &ApiClient, rss_url: &str) -> Result<String, AppError> {
    log::info!("Adding feed {}", rss_url);
    let feed = client.create_feed(rss_url).await?;
    Ok(format!("Added feed {} ({})", feed.display_name(), feed.id))
}

pub async fn delete_feed(client: &ApiClient, feed_id: &str) -> Result<String, AppError> {
    log::info!("Deleting feed {}", feed_id);
    client.delete_feed(feed_id).await?;
    Ok(format!("Deleted feed {}", feed_id))
}

pub fn render_feed(feed: &Feed) -> String {
    let polled = feed
        .last_polled_at
        .as_deref()
        .and_then(format_short_date)
        .map(|d| format!("polled {}", d))
        .unwrap_or_else(|| "never polled".to_string());
    format!(
        "{}  {}  {} episodes  {}\n    {}",
        feed.id,
        feed.display_name(),
        feed.episode_count,
        polled,
        feed.rss_url
    )
}
