use crate::api::models::{Keyword, MatchType};
use crate::api::ApiClient;
use crate::error::AppError;

pub const NO_KEYWORDS: &str = "No keywords yet. Add keywords to watch for in podcasts.";

pub async fn list_keywords(client: &ApiClient) -> Result<String, AppError> {
    let keywords = client.list_keywords().await?;
    if keywords.is_empty() {
        return Ok(NO_KEYWORDS.to_string());
    }
    Ok(keywords
        .iter()
        .map(render_keyword)
        .collect::<Vec<_>>()
        .join("\n"))
}

pub async fn add_keyword(
    client: &ApiClient,
    phrase: &str,
    match_type: MatchType,
) -> Result<String, AppError> {
    log::info!("Adding keyword {:?} ({})", phrase, match_type);
    let keyword = client.create_keyword(phrase, match_type).await?;
    Ok(format!("Added keyword {}", render_keyword(&keyword)))
}

pub async fn delete_keyword(client: &ApiClient, keyword_id: &str) -> Result<String, AppError> {
    client.delete_keyword(keyword_id).await?;
    Ok(format!("Deleted keyword {}", keyword_id))
}

pub fn render_keyword(keyword: &Keyword) -> String {
    format!("{}  \"{}\"  [{}]", keyword.id, keyword.phrase, keyword.match_type)
}
