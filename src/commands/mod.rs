//! Operator console: line commands, one module per page.

pub mod console;
pub mod diagnostics;
pub mod episodes;
pub mod feeds;
pub mod keywords;
pub mod mentions;
pub mod settings;
pub mod stats;

pub use console::Console;
pub use diagnostics::{ErrorEntry, ErrorLog};

use crate::api::models::{MatchType, MentionQuery};
use crate::filter::StatusFilter;
use settings::SettingsChange;

pub const HELP: &str = "\
Episodes
  episodes                 show the episode list
  feed <id>                select a feed
  open <id>                open an episode
  show                     show the open episode
  status <filter>          all, pending, downloading, transcribing, analyzing, completed, failed
  search [text]            filter titles and highlight the transcript (blank clears)
  reprocess                reprocess the open episode
  retry-enrichment [id]    re-run enrichment (default: open episode)
  download                 save the open transcript as a .txt file
  reload [feeds]           reload episodes for the current feed, or the feed list
Feeds
  feeds                    list feeds
  feeds add <rss-url>      add a feed
  feeds rm <id>            delete a feed and its episodes
Keywords
  keywords                 list keywords
  keywords add <phrase> [--match contains|exact_word|regex]
  keywords rm <id>         delete a keyword
Mentions
  mentions [--feed ID] [--keyword ID] [--sentiment S] [--limit N] [--offset N]
  mention <id>             show one mention
Other
  dashboard                counts and recent mentions
  settings                 show transcription settings
  settings set provider=local|external url=URL model=NAME key=KEY clear-key
  errors [clear]           recent errors
  help                     this text
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Quit,
    Episodes,
    SelectFeed(String),
    Open(String),
    Show,
    Status(StatusFilter),
    Search(String),
    Reprocess,
    RetryEnrichment(Option<String>),
    Download,
    Reload,
    ReloadFeeds,
    Feeds,
    AddFeed(String),
    DeleteFeed(String),
    Keywords,
    AddKeyword { phrase: String, match_type: MatchType },
    DeleteKeyword(String),
    Mentions(MentionQuery),
    Mention(String),
    Dashboard,
    Settings,
    UpdateSettings(SettingsChange),
    Errors,
    ClearErrors,
}

impl Command {
    /// Name recorded in the error log.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Quit => "quit",
            Command::Episodes => "episodes",
            Command::SelectFeed(_) => "select_feed",
            Command::Open(_) => "open_episode",
            Command::Show => "show_episode",
            Command::Status(_) => "status_filter",
            Command::Search(_) => "search",
            Command::Reprocess => "reprocess_episode",
            Command::RetryEnrichment(_) => "retry_enrichment",
            Command::Download => "download_transcript",
            Command::Reload => "reload_episodes",
            Command::ReloadFeeds => "reload_feeds",
            Command::Feeds => "list_feeds",
            Command::AddFeed(_) => "create_feed",
            Command::DeleteFeed(_) => "delete_feed",
            Command::Keywords => "list_keywords",
            Command::AddKeyword { .. } => "create_keyword",
            Command::DeleteKeyword(_) => "delete_keyword",
            Command::Mentions(_) => "list_mentions",
            Command::Mention(_) => "get_mention",
            Command::Dashboard => "dashboard",
            Command::Settings => "get_transcription_settings",
            Command::UpdateSettings(_) => "update_transcription_settings",
            Command::Errors => "errors",
            Command::ClearErrors => "clear_errors",
        }
    }
}

/// Parse one input line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match word {
        "" => return Ok(None),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "episodes" | "ls" => Command::Episodes,
        "feed" => Command::SelectFeed(single_arg("feed", &args)?),
        "open" => Command::Open(single_arg("open", &args)?),
        "show" => Command::Show,
        "status" => Command::Status(single_arg("status", &args)?.parse()?),
        "search" => Command::Search(rest.to_string()),
        "reprocess" => Command::Reprocess,
        "retry-enrichment" => match args.as_slice() {
            [] => Command::RetryEnrichment(None),
            [id] => Command::RetryEnrichment(Some(id.to_string())),
            _ => return Err("usage: retry-enrichment [id]".to_string()),
        },
        "download" => Command::Download,
        "reload" => match args.as_slice() {
            [] => Command::Reload,
            ["feeds"] => Command::ReloadFeeds,
            _ => return Err("usage: reload [feeds]".to_string()),
        },
        "feeds" => match args.as_slice() {
            [] => Command::Feeds,
            ["add", url] => Command::AddFeed(url.to_string()),
            ["rm" | "delete", id] => Command::DeleteFeed(id.to_string()),
            _ => return Err("usage: feeds [add <rss-url> | rm <id>]".to_string()),
        },
        "keywords" => parse_keywords(&args)?,
        "mentions" => Command::Mentions(mentions::parse_query(&args)?),
        "mention" => Command::Mention(single_arg("mention", &args)?),
        "dashboard" | "stats" => Command::Dashboard,
        "settings" => match args.split_first() {
            None => Command::Settings,
            Some((&"set", changes)) => Command::UpdateSettings(settings::parse_change(changes)?),
            Some(_) => return Err("usage: settings [set key=value ...]".to_string()),
        },
        "errors" => match args.as_slice() {
            [] => Command::Errors,
            ["clear"] => Command::ClearErrors,
            _ => return Err("usage: errors [clear]".to_string()),
        },
        other => return Err(format!("Unknown command {:?}. Type help for a list.", other)),
    };
    Ok(Some(command))
}

fn single_arg(command: &str, args: &[&str]) -> Result<String, String> {
    match args {
        [value] => Ok(value.to_string()),
        _ => Err(format!("usage: {} <value>", command)),
    }
}

fn parse_keywords(args: &[&str]) -> Result<Command, String> {
    match args.split_first() {
        None => Ok(Command::Keywords),
        Some((&"rm" | &"delete", [id])) => Ok(Command::DeleteKeyword(id.to_string())),
        Some((&"add", rest)) => {
            let mut words = Vec::new();
            let mut match_type = MatchType::default();
            let mut iter = rest.iter();
            while let Some(word) = iter.next() {
                if *word == "--match" {
                    let value = iter.next().ok_or("--match needs a value")?;
                    match_type = value.parse()?;
                } else {
                    words.push(*word);
                }
            }
            if words.is_empty() {
                return Err("usage: keywords add <phrase> [--match TYPE]".to_string());
            }
            Ok(Command::AddKeyword {
                phrase: words.join(" "),
                match_type,
            })
        }
        Some(_) => Err("usage: keywords [add <phrase> [--match TYPE] | rm <id>]".to_string()),
    }
}

/// `y`/`yes` confirm; anything else declines.
pub fn parse_confirmation(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
