//! Status and free-text filtering over the loaded episode list.

use crate::api::models::{Episode, EpisodeStatus};
use std::fmt;
use std::str::FromStr;

/// Status dropdown value: every episode, or only one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EpisodeStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: EpisodeStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Only(status) => write!(f, "{}", status),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(StatusFilter::All),
            other => other.parse::<EpisodeStatus>().map(StatusFilter::Only).map_err(|_| {
                format!(
                    "Unknown status filter {:?} (expected all, pending, downloading, transcribing, analyzing, completed or failed)",
                    other
                )
            }),
        }
    }
}

/// The subsequence of `episodes` that passes both filters, in source order.
///
/// The query is trimmed and compared case-insensitively as a plain substring
/// of the title (GUID when there is no title). An empty query passes all.
pub fn visible_episodes<'a, I>(episodes: I, status: StatusFilter, query: &str) -> Vec<&'a Episode>
where
    I: IntoIterator<Item = &'a Episode>,
{
    let needle = query.trim().to_lowercase();
    episodes
        .into_iter()
        .filter(|ep| status.matches(ep.status))
        .filter(|ep| needle.is_empty() || ep.display_title().to_lowercase().contains(&needle))
        .collect()
}
