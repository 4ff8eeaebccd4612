use crate::api::models::{parse_timestamp, Mention, MentionQuery, Sentiment};
use crate::api::ApiClient;
use crate::error::AppError;
use chrono::{DateTime, Utc};

pub const NO_MENTIONS: &str =
    "No mentions found. Mentions appear when keywords match podcast transcripts.";

/// `--feed ID --keyword ID --sentiment S --limit N --offset N`, any order.
pub fn parse_query(args: &[&str]) -> Result<MentionQuery, String> {
    let mut query = MentionQuery::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("{} needs a value", flag))?;
        match *flag {
            "--feed" => query.feed_id = Some(value.to_string()),
            "--keyword" => query.keyword_id = Some(value.to_string()),
            "--sentiment" => query.sentiment = Some(value.parse()?),
            "--limit" => query.limit = Some(parse_count(flag, value)?),
            "--offset" => query.offset = Some(parse_count(flag, value)?),
            other => return Err(format!("Unknown mentions option {}", other)),
        }
    }
    Ok(query)
}

fn parse_count(flag: &str, value: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("{} must be a non-negative number", flag))
}

pub async fn list_mentions(client: &ApiClient, query: &MentionQuery) -> Result<String, AppError> {
    let mentions = client.list_mentions(query).await?;
    log::info!("list_mentions returned {} mentions", mentions.len());
    if mentions.is_empty() {
        return Ok(NO_MENTIONS.to_string());
    }
    let now = Utc::now();
    Ok(mentions
        .iter()
        .map(|m| render_mention(m, now))
        .collect::<Vec<_>>()
        .join("\n\n"))
}

pub async fn get_mention(client: &ApiClient, mention_id: &str) -> Result<String, AppError> {
    let mention = client.get_mention(mention_id).await?;
    let mut out = render_mention(&mention, Utc::now());
    if let Some(score) = mention.sentiment_score {
        out.push_str(&format!("\n  sentiment score: {:.2}", score));
    }
    out.push_str(&format!("\n  matched: {:?}", mention.matched_text));
    Ok(out)
}

pub fn render_mention(m: &Mention, now: DateTime<Utc>) -> String {
    let keyword = m.keyword_phrase.as_deref().unwrap_or(&m.matched_text);
    let podcast = m.podcast_title.as_deref().unwrap_or("unknown podcast");

    let mut badges = Vec::new();
    if m.is_buying_signal == Some(true) {
        badges.push("Buying Signal".to_string());
    }
    if m.is_pain_point == Some(true) {
        badges.push("Pain Point".to_string());
    }
    if m.is_recommendation == Some(true) {
        badges.push("Recommendation".to_string());
    }
    if let Some(sentiment) = m.sentiment.filter(|s| *s != Sentiment::Unknown) {
        badges.push(sentiment.to_string());
    }

    let mut lines = vec![format!("{}  \"{}\" in {}", m.id, keyword, podcast)];
    if !badges.is_empty() {
        lines.push(format!("  [{}]", badges.join("] [")));
    }
    if let Some(title) = &m.episode_title {
        lines.push(format!("  {}", title));
    }
    if let Some(summary) = m.context_summary.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("  {}", summary));
    }
    if !m.transcript_segment.is_empty() {
        lines.push(format!("  > {}", m.transcript_segment.replace('\n', "\n  > ")));
    }

    let mut footer = Vec::new();
    if let Some(age) = m.created_at.as_deref().and_then(|raw| format_age(raw, now)) {
        footer.push(age);
    }
    if let Some(topics) = m.topics.as_ref().filter(|t| !t.is_empty()) {
        footer.push(format!("Topics: {}", topics.join(", ")));
    }
    if !footer.is_empty() {
        lines.push(format!("  {}", footer.join("  ")));
    }
    lines.join("\n")
}

/// Coarse "5 minutes ago" rendering of a server timestamp.
pub fn format_age(raw: &str, now: DateTime<Utc>) -> Option<String> {
    let then = parse_timestamp(raw)?;
    let secs = (now - then).num_seconds().max(0);
    let (n, unit) = match secs {
        0..=59 => return Some("just now".to_string()),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        86_400..=2_591_999 => (secs / 86_400, "day"),
        2_592_000..=31_535_999 => (secs / 2_592_000, "month"),
        _ => (secs / 31_536_000, "year"),
    };
    let plural = if n == 1 { "" } else { "s" };
    Some(format!("{} {}{} ago", n, unit, plural))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention() -> Mention {
        Mention {
            id: "m1".to_string(),
            episode_id: "e1".to_string(),
            keyword_id: "k1".to_string(),
            matched_text: "churn".to_string(),
            transcript_segment: "we saw churn drop".to_string(),
            sentiment: Some(Sentiment::Positive),
            sentiment_score: Some(0.8),
            context_summary: Some("Host credits onboarding".to_string()),
            topics: Some(vec!["retention".to_string(), "saas".to_string()]),
            is_buying_signal: Some(false),
            is_pain_point: Some(true),
            is_recommendation: None,
            created_at: Some("2024-03-04T10:00:00Z".to_string()),
            episode_title: Some("Ep 12".to_string()),
            podcast_title: Some("Pod A".to_string()),
            keyword_phrase: Some("churn".to_string()),
        }
    }

    #[test]
    fn test_render_mention_includes_flags_and_topics() {
        let now = parse_timestamp("2024-03-04T13:00:00Z").unwrap();
        let text = render_mention(&mention(), now);
        assert!(text.starts_with("m1  \"churn\" in Pod A"));
        assert!(text.contains("[Pain Point] [positive]"));
        assert!(!text.contains("Buying Signal"));
        assert!(text.contains("> we saw churn drop"));
        assert!(text.contains("3 hours ago  Topics: retention, saas"));
    }

    #[test]
    fn test_unknown_sentiment_has_no_badge() {
        let now = parse_timestamp("2024-03-04T13:00:00Z").unwrap();
        let mut m = mention();
        m.sentiment = Some(Sentiment::Unknown);
        let text = render_mention(&m, now);
        assert!(text.contains("  [Pain Point]\n"));
        assert!(!text.contains("unknown"));
    }

    #[test]
    fn test_format_age() {
        let now = parse_timestamp("2024-03-04T10:00:00Z").unwrap();
        assert_eq!(format_age("2024-03-04T09:59:30Z", now).as_deref(), Some("just now"));
        assert_eq!(format_age("2024-03-04T09:59:00Z", now).as_deref(), Some("1 minute ago"));
        assert_eq!(format_age("2024-03-01T10:00:00", now).as_deref(), Some("3 days ago"));
        assert_eq!(format_age("not a date", now), None);
    }

    #[test]
    fn test_parse_query_rejects_bad_values() {
        assert!(parse_query(&["--limit"]).is_err());
        assert!(parse_query(&["--limit", "-1"]).is_err());
        assert!(parse_query(&["--colour", "red"]).is_err());
        let q = parse_query(&["--feed", "f1", "--offset", "20"]).unwrap();
        assert_eq!(q.feed_id.as_deref(), Some("f1"));
        assert_eq!(q.offset, Some(20));
    }
}
