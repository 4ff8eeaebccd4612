//! Interactive loop: operator input and network completions are handled as
//! they arrive, so a slow request never blocks typing.

use super::diagnostics::{render_errors, ErrorLog};
use super::{episodes, feeds, keywords, mentions, parse_command, parse_confirmation, settings, stats};
use super::{Command, HELP};
use crate::api::ApiClient;
use crate::config::ConsoleConfig;
use crate::controller::{Controller, Effect, Msg, Notice};
use crate::error::AppError;
use crate::session::Session;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Last text printed for each pane, and the slot errors already logged. A
/// frame only prints what changed.
#[derive(Debug, Default)]
struct FrameCache {
    list: Option<String>,
    detail: Option<String>,
    feeds_error: Option<String>,
    episodes_error: Option<String>,
    detail_error: Option<String>,
}

pub struct Console<W: Write> {
    session: Session<ApiClient>,
    errors: Arc<ErrorLog>,
    config: ConsoleConfig,
    out: W,
    frame: FrameCache,
    pending_feed_delete: Option<String>,
}

impl<W: Write> Console<W> {
    pub fn new(client: Arc<ApiClient>, config: ConsoleConfig, errors: Arc<ErrorLog>, out: W) -> Self {
        let controller = Controller::new(config.requested_feed.clone());
        Self {
            session: Session::new(client, controller),
            errors,
            config,
            out,
            frame: FrameCache::default(),
            pending_feed_delete: None,
        }
    }

    pub fn controller(&self) -> &Controller {
        self.session.controller()
    }

    pub async fn run<R>(&mut self, input: R, cancel: CancellationToken) -> Result<(), AppError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        writeln!(
            self.out,
            "Connected to {}. Type help for commands.",
            self.session.source().base_url()
        )?;
        let effects = self.session.dispatch(Msg::Mount);
        self.apply_effects(effects)?;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Console cancelled");
                    break;
                }
                Some(effects) = self.session.next_completion() => {
                    self.apply_effects(effects)?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        // input closed; let outstanding requests land first
                        let effects = self.session.settle().await;
                        self.apply_effects(effects)?;
                        break;
                    };
                    if self.handle_line(&line).await? == Flow::Quit {
                        break;
                    }
                }
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Flow, AppError> {
        if self.controller().awaiting_confirmation().is_some() {
            let effects = self
                .session
                .dispatch(Msg::ConfirmReprocess(parse_confirmation(line)));
            self.apply_effects(effects)?;
            return Ok(Flow::Continue);
        }
        if let Some(feed_id) = self.pending_feed_delete.take() {
            if parse_confirmation(line) {
                let result = feeds::delete_feed(self.session.source(), &feed_id).await;
                let context = Some(feed_id.as_str());
                if self.report("delete_feed", context, result)? {
                    self.reload_feeds()?;
                }
            } else {
                writeln!(self.out, "Delete cancelled")?;
            }
            return Ok(Flow::Continue);
        }

        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Flow::Continue),
            Err(usage) => {
                writeln!(self.out, "{}", usage)?;
                return Ok(Flow::Continue);
            }
        };
        self.execute(command).await
    }

    async fn execute(&mut self, command: Command) -> Result<Flow, AppError> {
        let name = command.name();
        match command {
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),

            // ── Episodes view ──
            Command::Episodes => {
                let text = episodes::render_list(self.controller());
                self.print_list(text)?;
            }
            Command::Show => {
                let text = episodes::render_detail(self.controller(), self.config.highlight_style());
                self.print_detail(text)?;
            }
            Command::SelectFeed(feed_id) => self.dispatch(Msg::SelectFeed(feed_id))?,
            Command::Open(episode_id) => self.dispatch(Msg::SelectEpisode(episode_id))?,
            Command::Status(filter) => self.dispatch(Msg::SetStatusFilter(filter))?,
            Command::Search(query) => self.dispatch(Msg::SetQuery(query))?,
            Command::Reprocess => self.dispatch(Msg::RequestReprocess)?,
            Command::Reload => self.dispatch(Msg::ReloadEpisodes)?,
            Command::ReloadFeeds => self.reload_feeds()?,
            Command::Download => {
                let result =
                    episodes::download_transcript(self.session.controller(), &self.config.download_dir)
                        .await
                        .map(|path| format!("Saved {}", path.display()));
                let context = self.controller().selection().episode_id.clone();
                self.report(name, context.as_deref(), result)?;
            }
            Command::RetryEnrichment(id) => {
                let id = id.or_else(|| self.controller().selection().episode_id.clone());
                match id {
                    Some(id) => {
                        let result = episodes::retry_enrichment(self.session.source(), &id).await;
                        self.report(name, Some(id.as_str()), result)?;
                    }
                    None => writeln!(self.out, "Open an episode or pass an episode id")?,
                }
            }

            // ── Feeds ──
            Command::Feeds => {
                let result = feeds::list_feeds(self.session.source()).await;
                self.report(name, None, result)?;
            }
            Command::AddFeed(url) => {
                let result = feeds::add_feed(self.session.source(), &url).await;
                if self.report(name, Some(url.as_str()), result)? {
                    self.reload_feeds()?;
                }
            }
            Command::DeleteFeed(feed_id) => {
                writeln!(self.out, "{} [y/N]", feeds::DELETE_PROMPT)?;
                self.pending_feed_delete = Some(feed_id);
            }

            // ── Keywords ──
            Command::Keywords => {
                let result = keywords::list_keywords(self.session.source()).await;
                self.report(name, None, result)?;
            }
            Command::AddKeyword { phrase, match_type } => {
                let result = keywords::add_keyword(self.session.source(), &phrase, match_type).await;
                self.report(name, Some(phrase.as_str()), result)?;
            }
            Command::DeleteKeyword(keyword_id) => {
                let result = keywords::delete_keyword(self.session.source(), &keyword_id).await;
                self.report(name, Some(keyword_id.as_str()), result)?;
            }

            // ── Mentions, dashboard, settings ──
            Command::Mentions(query) => {
                let result = mentions::list_mentions(self.session.source(), &query).await;
                self.report(name, None, result)?;
            }
            Command::Mention(mention_id) => {
                let result = mentions::get_mention(self.session.source(), &mention_id).await;
                self.report(name, Some(mention_id.as_str()), result)?;
            }
            Command::Dashboard => {
                let result = stats::dashboard(self.session.source()).await;
                self.report(name, None, result)?;
            }
            Command::Settings => {
                let result = settings::show_settings(self.session.source()).await;
                self.report(name, None, result)?;
            }
            Command::UpdateSettings(change) => {
                let result = settings::update_settings(self.session.source(), &change).await;
                self.report(name, None, result)?;
            }

            // ── Diagnostics ──
            Command::Errors => writeln!(self.out, "{}", render_errors(&self.errors.get_errors()))?,
            Command::ClearErrors => {
                self.errors.clear();
                writeln!(self.out, "Error log cleared")?;
            }
        }
        Ok(Flow::Continue)
    }

    fn dispatch(&mut self, msg: Msg) -> Result<(), AppError> {
        let effects = self.session.dispatch(msg);
        self.apply_effects(effects)
    }

    fn reload_feeds(&mut self) -> Result<(), AppError> {
        self.dispatch(Msg::ReloadFeeds)
    }

    /// Print a one-shot command's output, or record and print its error.
    /// Returns whether it succeeded.
    fn report(
        &mut self,
        command: &str,
        context: Option<&str>,
        result: Result<String, AppError>,
    ) -> Result<bool, AppError> {
        match result {
            Ok(text) => {
                writeln!(self.out, "{}", text)?;
                Ok(true)
            }
            Err(e) => {
                let message = e.to_string();
                self.errors.log_error(command, &message, context);
                writeln!(self.out, "Error: {}", message)?;
                Ok(false)
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> Result<(), AppError> {
        let mut redraw = false;
        for effect in effects {
            match effect {
                Effect::Confirm { prompt, .. } => writeln!(self.out, "{} [y/N]", prompt)?,
                Effect::RequestFrame => redraw = true,
                other => log::debug!("Unexpected effect left for the console: {:?}", other),
            }
        }
        if redraw {
            self.render_frame()?;
        }
        Ok(())
    }

    fn render_frame(&mut self) -> Result<(), AppError> {
        if let Some(notice) = self.controller().notice().cloned() {
            match notice {
                Notice::Info(text) => writeln!(self.out, "{}", text)?,
                Notice::Error(text) => {
                    let episode = self.controller().selection().episode_id.clone();
                    self.errors
                        .log_error("reprocess_episode", &text, episode.as_deref());
                    writeln!(self.out, "Error: {}", text)?;
                }
            }
            // only a redraw comes back
            self.session.dispatch(Msg::DismissNotice);
        }
        self.log_slot_errors();

        let list = episodes::render_list(self.controller());
        if self.frame.list.as_ref() != Some(&list) {
            self.print_list(list)?;
        }

        let detail = episodes::render_detail(self.controller(), self.config.highlight_style());
        if self.frame.detail.as_ref() != Some(&detail) {
            self.print_detail(detail)?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Record each slot failure once, when it first appears.
    fn log_slot_errors(&mut self) {
        let c = self.session.controller();
        let frame = &mut self.frame;
        let errors = &self.errors;

        let note = |seen: &mut Option<String>, command: &str, message: Option<&str>, context: Option<&str>| {
            if seen.as_deref() != message {
                if let Some(message) = message {
                    errors.log_error(command, message, context);
                }
                *seen = message.map(str::to_string);
            }
        };

        note(&mut frame.feeds_error, "list_feeds", c.feeds_slot().error(), None);
        note(
            &mut frame.episodes_error,
            "list_episodes",
            c.episodes_slot().error(),
            c.episodes_slot().key().map(String::as_str),
        );
        note(
            &mut frame.detail_error,
            "get_episode",
            c.detail_slot().error(),
            c.detail_slot().key().map(String::as_str),
        );
    }

    fn print_list(&mut self, text: String) -> Result<(), AppError> {
        writeln!(self.out, "\n── Episodes ──\n{}", text)?;
        self.frame.list = Some(text);
        Ok(())
    }

    fn print_detail(&mut self, text: String) -> Result<(), AppError> {
        writeln!(self.out, "\n── Transcript ──\n{}", text)?;
        self.frame.detail = Some(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GatewayOptions;
    use std::time::Duration;

    fn console() -> Console<Vec<u8>> {
        // nothing listens on the discard port; these tests never reach the network
        let client = ApiClient::new(GatewayOptions {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        Console::new(
            Arc::new(client),
            ConsoleConfig::default(),
            Arc::new(ErrorLog::default()),
            Vec::new(),
        )
    }

    fn output(console: &mut Console<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(&mut console.out)).unwrap()
    }

    #[tokio::test]
    async fn test_usage_errors_are_printed_not_logged() {
        let mut c = console();
        assert_eq!(c.handle_line("frobnicate").await.unwrap(), Flow::Continue);
        assert!(output(&mut c).contains("Unknown command \"frobnicate\""));
        assert!(c.errors.is_empty());
    }

    #[tokio::test]
    async fn test_feed_delete_needs_confirmation() {
        let mut c = console();
        c.handle_line("feeds rm f1").await.unwrap();
        assert_eq!(
            output(&mut c),
            "Delete this feed and all its episodes? [y/N]\n"
        );
        c.handle_line("n").await.unwrap();
        assert_eq!(output(&mut c), "Delete cancelled\n");
    }

    #[tokio::test]
    async fn test_download_without_transcript_is_logged() {
        let mut c = console();
        c.handle_line("download").await.unwrap();
        assert_eq!(output(&mut c), "Error: No transcript to download\n");

        c.handle_line("errors").await.unwrap();
        assert!(output(&mut c).ends_with("download_transcript: No transcript to download\n"));

        c.handle_line("errors clear").await.unwrap();
        assert!(c.errors.is_empty());
    }

    #[tokio::test]
    async fn test_reprocess_without_episode_reports_error() {
        let mut c = console();
        c.handle_line("reprocess").await.unwrap();
        let text = output(&mut c);
        assert!(text.starts_with("Error: Select an episode before reprocessing\n"));
        assert_eq!(c.errors.len(), 1);
        assert!(c.controller().notice().is_none());
    }

    #[tokio::test]
    async fn test_feed_failure_is_logged_once_across_redraws() {
        let mut c = console();
        c.handle_line("reload feeds").await.unwrap();
        let effects = c.session.settle().await;
        c.apply_effects(effects).unwrap();

        let errors = c.errors.get_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].command, "list_feeds");
        assert!(output(&mut c).contains("Failed to load feeds: Request failed: "));

        c.render_frame().unwrap();
        assert_eq!(c.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_quit() {
        let mut c = console();
        assert_eq!(c.handle_line("quit").await.unwrap(), Flow::Quit);
    }
}
