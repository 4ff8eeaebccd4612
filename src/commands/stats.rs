use crate::api::models::{DashboardStats, Mention, MentionQuery};
use crate::api::ApiClient;
use crate::error::AppError;
use chrono::Utc;
use futures_util::future::try_join;

const RECENT_MENTIONS: u32 = 5;

/// Counts plus the most recent mentions, fetched concurrently.
pub async fn dashboard(client: &ApiClient) -> Result<String, AppError> {
    let query = MentionQuery {
        limit: Some(RECENT_MENTIONS),
        ..MentionQuery::default()
    };
    let (stats, mentions) =
        try_join(client.dashboard_stats(), client.list_mentions(&query)).await?;
    Ok(render_dashboard(&stats, &mentions))
}

pub fn render_dashboard(stats: &DashboardStats, mentions: &[Mention]) -> String {
    let cards = [
        ("Feeds", stats.feeds),
        ("Keywords", stats.keywords),
        ("Mentions", stats.mentions),
        ("Completed", stats.episodes_completed),
        ("Processing", stats.episodes_processing),
        ("Failed", stats.episodes_failed),
    ];
    let mut out = cards
        .iter()
        .map(|(label, value)| format!("{:<11}{}", label, value))
        .collect::<Vec<_>>()
        .join("\n");

    out.push_str("\n\nRecent Mentions\n");
    if mentions.is_empty() {
        out.push_str("No mentions yet. Add feeds and keywords to get started.");
    } else {
        let now = Utc::now();
        let rendered: Vec<String> = mentions
            .iter()
            .map(|m| super::mentions::render_mention(m, now))
            .collect();
        out.push_str(&rendered.join("\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_dashboard_without_mentions() {
        let stats = DashboardStats {
            feeds: 2,
            episodes: 10,
            keywords: 3,
            mentions: 0,
            episodes_completed: 7,
            episodes_processing: 1,
            episodes_failed: 2,
        };
        let text = render_dashboard(&stats, &[]);
        assert!(text.starts_with("Feeds      2\nKeywords   3\n"));
        assert!(text.contains("Failed     2"));
        assert!(text.ends_with("No mentions yet. Add feeds and keywords to get started."));
    }
}
