use crate::api::models::{Episode, EpisodeDetail, EpisodeStatus, EpisodeSummary};
use std::collections::{HashMap, HashSet};

/// Episodes of the selected feed, one canonical record per id.
///
/// The list view walks `order`; the detail view looks up a single id. Both
/// read the same record, so a patch is visible to both at once.
#[derive(Debug, Default)]
pub struct EpisodeStore {
    records: HashMap<String, Episode>,
    order: Vec<String>,
}

impl EpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Episode> {
        self.records.get(id)
    }

    /// Records in server list order.
    pub fn list(&self) -> impl Iterator<Item = &Episode> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn list_len(&self) -> usize {
        self.order.len()
    }

    /// Install a fresh list response. Duplicate ids keep their first position.
    /// Records that already carry detail are kept even if the list omits them,
    /// since the detail view may still be showing one.
    pub fn replace_list(&mut self, summaries: Vec<EpisodeSummary>) {
        let mut seen = HashSet::with_capacity(summaries.len());
        self.order.clear();

        for summary in summaries {
            if !seen.insert(summary.id.clone()) {
                log::debug!("Duplicate episode {} in list response", summary.id);
                continue;
            }
            self.order.push(summary.id.clone());
            match self.records.get_mut(&summary.id) {
                Some(existing) => existing.merge_summary(summary),
                None => {
                    self.records.insert(summary.id.clone(), Episode::from(summary));
                }
            }
        }

        self.records
            .retain(|id, record| seen.contains(id) || record.has_detail);
    }

    pub fn upsert_detail(&mut self, detail: EpisodeDetail) {
        match self.records.get_mut(&detail.id) {
            Some(existing) => existing.merge_detail(detail),
            None => {
                self.records.insert(detail.id.clone(), Episode::from(detail));
            }
        }
    }

    /// Local effect of an accepted reprocess request. Returns false when the
    /// episode is no longer loaded.
    pub fn mark_reprocessing(&mut self, id: &str) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.status = EpisodeStatus::Pending;
                record.error_message = None;
                true
            }
            None => false,
        }
    }
}
