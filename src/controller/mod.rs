//! Cascading selection state for the episodes view.
//!
//! feed list → episode list (keyed by feed id) → episode detail (keyed by
//! episode id). The controller is a reducer: it takes a [`Msg`], updates its
//! slots, and returns the [`Effect`]s the caller must carry out. It never
//! performs I/O itself, which keeps ordering and staleness rules testable.

pub mod slot;
pub mod store;


use crate::api::models::{
    Episode, EpisodeActionResponse, EpisodeDetail, EpisodeSummary, Feed,
};
use crate::error::ApiError;
use crate::filter::{visible_episodes, StatusFilter};

pub use slot::{Slot, Ticket};
pub use store::EpisodeStore;

pub const REPROCESS_PROMPT: &str = "Reprocess this episode?";

/// Client-local selection. Not persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub feed_id: Option<String>,
    pub episode_id: Option<String>,
    pub status_filter: StatusFilter,
    pub query: String,
}

/// Inputs to the reducer: user intents and tagged network completions.
#[derive(Debug)]
pub enum Msg {
    /// Initial load of the feed list.
    Mount,
    ReloadFeeds,
    FeedsLoaded {
        ticket: Ticket,
        result: Result<Vec<Feed>, ApiError>,
    },
    SelectFeed(String),
    /// Re-issue the episode list for the current feed.
    ReloadEpisodes,
    EpisodesLoaded {
        feed_id: String,
        ticket: Ticket,
        result: Result<Vec<EpisodeSummary>, ApiError>,
    },
    SelectEpisode(String),
    DetailLoaded {
        episode_id: String,
        ticket: Ticket,
        result: Result<EpisodeDetail, ApiError>,
    },
    SetStatusFilter(StatusFilter),
    SetQuery(String),
    /// Ask to reprocess the loaded episode; answered by `ConfirmReprocess`.
    RequestReprocess,
    ConfirmReprocess(bool),
    ReprocessFinished {
        episode_id: String,
        result: Result<EpisodeActionResponse, ApiError>,
    },
    DismissNotice,
}

/// Work the reducer hands back to its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchFeeds { ticket: Ticket },
    FetchEpisodes { feed_id: String, ticket: Ticket },
    FetchDetail { episode_id: String, ticket: Ticket },
    /// A yes/no answer is needed before the reprocess request may fire.
    Confirm { episode_id: String, prompt: String },
    Reprocess { episode_id: String },
    RequestFrame,
}

impl Effect {
    /// Effects that become a network call.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Effect::FetchFeeds { .. }
                | Effect::FetchEpisodes { .. }
                | Effect::FetchDetail { .. }
                | Effect::Reprocess { .. }
        )
    }
}

/// Outcome line shown above the view after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Why the episode list has nothing to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    NoFeeds,
    NoMatches,
}

#[derive(Debug, PartialEq)]
pub enum ListView<'a> {
    Loading,
    Failed(&'a str),
    Empty(EmptyReason),
    Rows(Vec<&'a Episode>),
}

#[derive(Debug, PartialEq)]
pub enum DetailView<'a> {
    Loading,
    /// No episode selected.
    Empty,
    /// The detail request itself failed.
    Failed(&'a str),
    /// The episode carries a processing error; shown instead of any transcript.
    Unavailable {
        episode: &'a Episode,
        error: &'a str,
    },
    Transcript {
        episode: &'a Episode,
        text: &'a str,
    },
    NotReady {
        episode: &'a Episode,
    },
}

impl<'a> DetailView<'a> {
    pub fn episode(&self) -> Option<&'a Episode> {
        match self {
            DetailView::Unavailable { episode, .. }
            | DetailView::Transcript { episode, .. }
            | DetailView::NotReady { episode } => Some(episode),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Controller {
    selection: Selection,
    requested_feed: Option<String>,
    feeds: Slot<(), Vec<Feed>>,
    episodes: Slot<String, ()>,
    detail: Slot<String, ()>,
    store: EpisodeStore,
    pending_confirmation: Option<String>,
    reprocessing: Option<String>,
    notice: Option<Notice>,
    next_ticket: Ticket,
}

impl Controller {
    /// `requested_feed` is preferred when the feed list first arrives.
    pub fn new(requested_feed: Option<String>) -> Self {
        Self {
            requested_feed: requested_feed.filter(|id| !id.trim().is_empty()),
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn feeds_slot(&self) -> &Slot<(), Vec<Feed>> {
        &self.feeds
    }

    pub fn episodes_slot(&self) -> &Slot<String, ()> {
        &self.episodes
    }

    pub fn detail_slot(&self) -> &Slot<String, ()> {
        &self.detail
    }

    pub fn store(&self) -> &EpisodeStore {
        &self.store
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn awaiting_confirmation(&self) -> Option<&str> {
        self.pending_confirmation.as_deref()
    }

    pub fn feeds(&self) -> &[Feed] {
        self.feeds.value().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn selected_feed(&self) -> Option<&Feed> {
        let id = self.selection.feed_id.as_deref()?;
        self.feeds().iter().find(|f| f.id == id)
    }

    /// Filtered episode list in server order.
    pub fn visible_episodes(&self) -> Vec<&Episode> {
        visible_episodes(
            self.store.list(),
            self.selection.status_filter,
            &self.selection.query,
        )
    }

    pub fn list_view(&self) -> ListView<'_> {
        match &self.episodes {
            Slot::Loading { .. } => return ListView::Loading,
            Slot::Errored { message, .. } => return ListView::Failed(message),
            _ => {}
        }
        let rows = self.visible_episodes();
        if !rows.is_empty() {
            ListView::Rows(rows)
        } else if self.feeds().is_empty() {
            ListView::Empty(EmptyReason::NoFeeds)
        } else {
            ListView::Empty(EmptyReason::NoMatches)
        }
    }

    /// The loaded detail record, if the detail slot holds the current episode.
    pub fn detail_episode(&self) -> Option<&Episode> {
        match &self.detail {
            Slot::Loaded { key, .. } if self.selection.episode_id.as_ref() == Some(key) => {
                self.store.get(key)
            }
            _ => None,
        }
    }

    pub fn detail_view(&self) -> DetailView<'_> {
        match &self.detail {
            Slot::Idle => return DetailView::Empty,
            Slot::Loading { .. } => return DetailView::Loading,
            Slot::Errored { message, .. } => return DetailView::Failed(message),
            Slot::Loaded { .. } => {}
        }
        let Some(episode) = self.detail_episode() else {
            return DetailView::Empty;
        };
        if let Some(error) = episode.error_message.as_deref().filter(|e| !e.is_empty()) {
            return DetailView::Unavailable { episode, error };
        }
        match episode.transcript_text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => DetailView::Transcript { episode, text },
            None => DetailView::NotReady { episode },
        }
    }

    /// Transcript text that may be downloaded: present, non-empty, and not
    /// overridden by a processing error.
    pub fn downloadable_transcript(&self) -> Option<(&Episode, &str)> {
        match self.detail_view() {
            DetailView::Transcript { episode, text } => Some((episode, text)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Reducer
    // ------------------------------------------------------------------

    pub fn apply(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Mount | Msg::ReloadFeeds => self.begin_feeds_load(),
            Msg::FeedsLoaded { ticket, result } => self.on_feeds_loaded(ticket, result),
            Msg::SelectFeed(feed_id) => self.select_feed(feed_id),
            Msg::ReloadEpisodes => match self.selection.feed_id.clone() {
                Some(feed_id) => self.begin_episodes_load(feed_id),
                None => Vec::new(),
            },
            Msg::EpisodesLoaded {
                feed_id,
                ticket,
                result,
            } => self.on_episodes_loaded(feed_id, ticket, result),
            Msg::SelectEpisode(episode_id) => self.select_episode(episode_id),
            Msg::DetailLoaded {
                episode_id,
                ticket,
                result,
            } => self.on_detail_loaded(episode_id, ticket, result),
            Msg::SetStatusFilter(filter) => {
                self.selection.status_filter = filter;
                vec![Effect::RequestFrame]
            }
            Msg::SetQuery(query) => {
                self.selection.query = query;
                vec![Effect::RequestFrame]
            }
            Msg::RequestReprocess => self.request_reprocess(),
            Msg::ConfirmReprocess(confirmed) => self.confirm_reprocess(confirmed),
            Msg::ReprocessFinished { episode_id, result } => {
                self.on_reprocess_finished(episode_id, result)
            }
            Msg::DismissNotice => {
                self.notice = None;
                vec![Effect::RequestFrame]
            }
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn begin_feeds_load(&mut self) -> Vec<Effect> {
        let ticket = self.issue_ticket();
        self.feeds = Slot::Loading { key: (), ticket };
        vec![Effect::FetchFeeds { ticket }, Effect::RequestFrame]
    }

    fn on_feeds_loaded(&mut self, ticket: Ticket, result: Result<Vec<Feed>, ApiError>) -> Vec<Effect> {
        if !self.feeds.accepts(&(), ticket) {
            log::debug!("Discarding stale feed list (ticket {})", ticket);
            return Vec::new();
        }

        let feeds = match result {
            Ok(feeds) => feeds,
            Err(e) => {
                log::warn!("Failed to load feeds: {}", e);
                self.feeds = Slot::Errored {
                    key: (),
                    message: e.to_string(),
                };
                return vec![Effect::RequestFrame];
            }
        };

        log::info!("Loaded {} feeds", feeds.len());
        let choice = choose_feed(
            &feeds,
            self.selection.feed_id.as_deref(),
            self.requested_feed.as_deref(),
        );
        self.feeds = Slot::Loaded {
            key: (),
            value: feeds,
        };

        let mut effects = match choice {
            Some(feed_id) => self.select_feed(feed_id),
            None => {
                self.clear_feed_selection();
                Vec::new()
            }
        };
        if !effects.contains(&Effect::RequestFrame) {
            effects.push(Effect::RequestFrame);
        }
        effects
    }

    fn clear_feed_selection(&mut self) {
        self.selection.feed_id = None;
        self.selection.episode_id = None;
        self.episodes = Slot::Idle;
        self.detail = Slot::Idle;
        self.pending_confirmation = None;
        self.store.clear();
    }

    fn select_feed(&mut self, feed_id: String) -> Vec<Effect> {
        if self.selection.feed_id.as_deref() == Some(feed_id.as_str())
            && self.episodes.is_current_for(&feed_id)
        {
            return Vec::new();
        }
        self.begin_episodes_load(feed_id)
    }

    /// Invalidate everything downstream of the feed, then load its episodes.
    fn begin_episodes_load(&mut self, feed_id: String) -> Vec<Effect> {
        self.selection.episode_id = None;
        self.detail = Slot::Idle;
        self.pending_confirmation = None;
        self.store.clear();

        let ticket = self.issue_ticket();
        log::debug!("Loading episodes for feed {} (ticket {})", feed_id, ticket);
        self.selection.feed_id = Some(feed_id.clone());
        self.episodes = Slot::Loading {
            key: feed_id.clone(),
            ticket,
        };
        vec![Effect::FetchEpisodes { feed_id, ticket }, Effect::RequestFrame]
    }

    fn on_episodes_loaded(
        &mut self,
        feed_id: String,
        ticket: Ticket,
        result: Result<Vec<EpisodeSummary>, ApiError>,
    ) -> Vec<Effect> {
        if !self.episodes.accepts(&feed_id, ticket) {
            log::debug!(
                "Discarding stale episode list for feed {} (ticket {})",
                feed_id,
                ticket
            );
            return Vec::new();
        }

        match result {
            Ok(summaries) => {
                log::info!("Loaded {} episodes for feed {}", summaries.len(), feed_id);
                self.store.replace_list(summaries);
                self.episodes = Slot::Loaded {
                    key: feed_id,
                    value: (),
                };
            }
            Err(e) => {
                log::warn!("Failed to load episodes for feed {}: {}", feed_id, e);
                self.episodes = Slot::Errored {
                    key: feed_id,
                    message: e.to_string(),
                };
            }
        }
        vec![Effect::RequestFrame]
    }

    fn select_episode(&mut self, episode_id: String) -> Vec<Effect> {
        if self.selection.episode_id.as_deref() == Some(episode_id.as_str())
            && self.detail.is_current_for(&episode_id)
        {
            return Vec::new();
        }

        self.pending_confirmation = None;
        let ticket = self.issue_ticket();
        log::debug!("Loading episode {} (ticket {})", episode_id, ticket);
        self.selection.episode_id = Some(episode_id.clone());
        self.detail = Slot::Loading {
            key: episode_id.clone(),
            ticket,
        };
        vec![
            Effect::FetchDetail { episode_id, ticket },
            Effect::RequestFrame,
        ]
    }

    fn on_detail_loaded(
        &mut self,
        episode_id: String,
        ticket: Ticket,
        result: Result<EpisodeDetail, ApiError>,
    ) -> Vec<Effect> {
        if !self.detail.accepts(&episode_id, ticket) {
            log::debug!(
                "Discarding stale detail for episode {} (ticket {})",
                episode_id,
                ticket
            );
            return Vec::new();
        }

        match result {
            Ok(detail) if detail.id != episode_id => {
                log::warn!(
                    "Detail response for {} answered request for {}",
                    detail.id,
                    episode_id
                );
                self.detail = Slot::Errored {
                    message: format!(
                        "Server returned episode {} for requested episode {}",
                        detail.id, episode_id
                    ),
                    key: episode_id,
                };
            }
            Ok(detail) => {
                self.store.upsert_detail(detail);
                self.detail = Slot::Loaded {
                    key: episode_id,
                    value: (),
                };
            }
            Err(e) => {
                log::warn!("Failed to load episode {}: {}", episode_id, e);
                self.detail = Slot::Errored {
                    key: episode_id,
                    message: e.to_string(),
                };
            }
        }
        vec![Effect::RequestFrame]
    }

    fn request_reprocess(&mut self) -> Vec<Effect> {
        let Some(episode_id) = self.detail_episode().map(|ep| ep.id.clone()) else {
            self.notice = Some(Notice::Error(
                "Select an episode before reprocessing".to_string(),
            ));
            return vec![Effect::RequestFrame];
        };
        if self.reprocessing.is_some() {
            self.notice = Some(Notice::Error(
                "A reprocess request is already in flight".to_string(),
            ));
            return vec![Effect::RequestFrame];
        }

        self.pending_confirmation = Some(episode_id.clone());
        vec![Effect::Confirm {
            episode_id,
            prompt: REPROCESS_PROMPT.to_string(),
        }]
    }

    fn confirm_reprocess(&mut self, confirmed: bool) -> Vec<Effect> {
        let Some(episode_id) = self.pending_confirmation.take() else {
            return Vec::new();
        };
        if !confirmed {
            self.notice = Some(Notice::Info("Reprocess cancelled".to_string()));
            return vec![Effect::RequestFrame];
        }

        log::info!("Reprocess requested for episode {}", episode_id);
        self.reprocessing = Some(episode_id.clone());
        vec![Effect::Reprocess { episode_id }, Effect::RequestFrame]
    }

    fn on_reprocess_finished(
        &mut self,
        episode_id: String,
        result: Result<EpisodeActionResponse, ApiError>,
    ) -> Vec<Effect> {
        if self.reprocessing.as_deref() == Some(episode_id.as_str()) {
            self.reprocessing = None;
        }

        match result {
            Ok(response) => {
                let patched = self.store.mark_reprocessing(&episode_id);
                log::info!(
                    "Episode {} accepted for reprocessing ({}), patched locally: {}",
                    episode_id,
                    response.status,
                    patched
                );
                self.notice = Some(Notice::Info(
                    "Episode queued for reprocessing".to_string(),
                ));
            }
            Err(e) => {
                log::warn!("Failed to reprocess episode {}: {}", episode_id, e);
                self.notice = Some(Notice::Error(e.to_string()));
            }
        }
        vec![Effect::RequestFrame]
    }
}

/// Current feed if still listed, else the requested one, else the first.
fn choose_feed(feeds: &[Feed], current: Option<&str>, requested: Option<&str>) -> Option<String> {
    let listed = |id: &str| feeds.iter().any(|f| f.id == id);
    current
        .filter(|id| listed(id))
        .or_else(|| requested.filter(|id| listed(id)))
        .map(str::to_string)
        .or_else(|| feeds.first().map(|f| f.id.clone()))
}
