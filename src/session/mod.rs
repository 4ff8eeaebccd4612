//! Async driver around the [`Controller`] reducer.
//!
//! Request effects are spawned onto the runtime; each task reports back on
//! an unbounded channel with the ticket it was issued under, and the
//! controller decides whether the answer is still wanted. Effects that need
//! the operator (confirmation, redraw) are returned to the caller.

use crate::api::EpisodeSource;
use crate::controller::{Controller, Effect, Msg};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Session<S: EpisodeSource> {
    source: Arc<S>,
    controller: Controller,
    completion_tx: mpsc::UnboundedSender<Msg>,
    completion_rx: mpsc::UnboundedReceiver<Msg>,
    in_flight: usize,
}

impl<S: EpisodeSource> Session<S> {
    pub fn new(source: Arc<S>, controller: Controller) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            source,
            controller,
            completion_tx,
            completion_rx,
            in_flight: 0,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Requests spawned whose completion has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Apply `msg`, start any requests it produced, and return the effects
    /// left for the caller.
    pub fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let effects = self.controller.apply(msg);
        self.run_effects(effects)
    }

    /// Wait for the next request to finish and apply it. Returns `None` when
    /// nothing is in flight.
    ///
    /// Cancel-safe: dropping the future before a completion arrives loses
    /// nothing.
    pub async fn next_completion(&mut self) -> Option<Vec<Effect>> {
        if self.in_flight == 0 {
            return None;
        }
        let msg = self.completion_rx.recv().await?;
        self.in_flight -= 1;
        Some(self.dispatch(msg))
    }

    /// Drain every in-flight request, including ones started by completions.
    pub async fn settle(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Some(more) = self.next_completion().await {
            for effect in more {
                if !effects.contains(&effect) {
                    effects.push(effect);
                }
            }
        }
        effects
    }

    fn run_effects(&mut self, effects: Vec<Effect>) -> Vec<Effect> {
        let mut deferred = Vec::new();
        for effect in effects {
            match effect {
                Effect::FetchFeeds { ticket } => {
                    self.spawn(move |source| async move {
                        let result = source.list_feeds().await;
                        Msg::FeedsLoaded { ticket, result }
                    });
                }
                Effect::FetchEpisodes { feed_id, ticket } => {
                    self.spawn(move |source| async move {
                        let result = source.list_episodes(&feed_id).await;
                        Msg::EpisodesLoaded {
                            feed_id,
                            ticket,
                            result,
                        }
                    });
                }
                Effect::FetchDetail { episode_id, ticket } => {
                    self.spawn(move |source| async move {
                        let result = source.get_episode(&episode_id).await;
                        Msg::DetailLoaded {
                            episode_id,
                            ticket,
                            result,
                        }
                    });
                }
                Effect::Reprocess { episode_id } => {
                    self.spawn(move |source| async move {
                        let result = source.reprocess_episode(&episode_id).await;
                        Msg::ReprocessFinished { episode_id, result }
                    });
                }
                other => deferred.push(other),
            }
        }
        deferred
    }

    fn spawn<F, Fut>(&mut self, request: F)
    where
        F: FnOnce(Arc<S>) -> Fut,
        Fut: std::future::Future<Output = Msg> + Send + 'static,
    {
        let fut = request(Arc::clone(&self.source));
        let tx = self.completion_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let msg = fut.await;
            if tx.send(msg).is_err() {
                log::debug!("Session closed before request completed");
            }
        });
    }
}
