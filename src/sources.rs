use crate::errors::{AppError, AppResult};
use crate::models::{MetricKind, SourceId, SourceSnapshot, SourceStatus};
use std::collections::{BTreeMap, BTreeSet};

pub trait EnabledSet {
    fn is_enabled(&self, source: &SourceId) -> bool;
}

#[derive(Debug, Clone)]
struct SourceState {
    status: SourceStatus,
    enabled: bool,
    finished: BTreeSet<MetricKind>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Completion {
    pub source_completed: bool,
    pub all_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: BTreeMap<SourceId, SourceState>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, source: SourceId) -> bool {
        if self.sources.contains_key(&source) {
            return false;
        }
        self.sources.insert(
            source,
            SourceState {
                status: SourceStatus::Pending,
                enabled: true,
                finished: BTreeSet::new(),
            },
        );
        true
    }

    pub fn contains(&self, source: &SourceId) -> bool {
        self.sources.contains_key(source)
    }

    pub fn set_enabled(&mut self, source: &SourceId, enabled: bool) -> AppResult<bool> {
        let state = self
            .sources
            .get_mut(source)
            .ok_or_else(|| AppError::NotFound(format!("source {} was never declared", source)))?;
        let changed = state.enabled != enabled;
        state.enabled = enabled;
        Ok(changed)
    }

    pub fn status(&self, source: &SourceId) -> Option<SourceStatus> {
        self.sources.get(source).map(|state| state.status)
    }

    pub fn mark_data(&mut self, source: &SourceId) {
        if let Some(state) = self.sources.get_mut(source) {
            if state.status == SourceStatus::Pending {
                state.status = SourceStatus::InProgress;
            }
        }
    }

    pub fn finish_metric(&mut self, source: &SourceId, metric: MetricKind) -> AppResult<Completion> {
        let state = self
            .sources
            .get_mut(source)
            .ok_or_else(|| AppError::Contract(format!("completion for undeclared source {}", source)))?;

        let mut completion = Completion::default();
        state.finished.insert(metric);
        if state.status != SourceStatus::Complete {
            if MetricKind::ALL.iter().all(|kind| state.finished.contains(kind)) {
                state.status = SourceStatus::Complete;
                completion.source_completed = true;
            } else {
                state.status = SourceStatus::InProgress;
            }
        }
        completion.all_complete = completion.source_completed && self.all_complete();
        Ok(completion)
    }

    pub fn all_complete(&self) -> bool {
        !self.sources.is_empty()
            && self
                .sources
                .values()
                .all(|state| state.status == SourceStatus::Complete)
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceId> {
        self.sources
            .iter()
            .filter(|(_, state)| state.enabled)
            .map(|(source, _)| source)
    }

    pub fn snapshots(&self) -> Vec<SourceSnapshot> {
        self.sources
            .iter()
            .map(|(source, state)| SourceSnapshot {
                source: source.clone(),
                status: state.status,
                enabled: state.enabled,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl EnabledSet for SourceSet {
    fn is_enabled(&self, source: &SourceId) -> bool {
        self.sources.get(source).is_some_and(|state| state.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::{EnabledSet, SourceSet};
    use crate::models::{MetricKind, SourceId, SourceStatus};

    #[test]
    fn declared_sources_start_pending_and_enabled() {
        let mut set = SourceSet::new();
        let source = SourceId::new("nightly", "60");
        assert!(set.declare(source.clone()));
        assert!(!set.declare(source.clone()));
        assert_eq!(set.status(&source), Some(SourceStatus::Pending));
        assert!(set.is_enabled(&source));
        assert!(!set.is_enabled(&SourceId::new("beta", "59")));
    }

    #[test]
    fn completes_after_both_metrics() {
        let mut set = SourceSet::new();
        let source = SourceId::new("nightly", "60");
        set.declare(source.clone());

        let first = set.finish_metric(&source, MetricKind::ValidationSuccess).expect("first");
        assert!(!first.source_completed);
        assert_eq!(set.status(&source), Some(SourceStatus::InProgress));

        let second = set.finish_metric(&source, MetricKind::PinningFailure).expect("second");
        assert!(second.source_completed);
        assert!(second.all_complete);

        let again = set.finish_metric(&source, MetricKind::PinningFailure).expect("again");
        assert!(!again.source_completed);
        assert!(!again.all_complete);
    }

    #[test]
    fn new_declaration_reopens_all_complete() {
        let mut set = SourceSet::new();
        let first = SourceId::new("nightly", "60");
        set.declare(first.clone());
        set.finish_metric(&first, MetricKind::ValidationSuccess).expect("success");
        set.finish_metric(&first, MetricKind::PinningFailure).expect("failure");
        assert!(set.all_complete());

        set.declare(SourceId::new("aurora", "59"));
        assert!(!set.all_complete());
    }

    #[test]
    fn toggling_unknown_source_is_not_found() {
        let mut set = SourceSet::new();
        let err = set
            .set_enabled(&SourceId::new("release", "58"), false)
            .expect_err("unknown");
        assert!(err.to_string().starts_with("NOT_FOUND"));
    }

    #[test]
    fn completion_for_undeclared_source_is_rejected() {
        let mut set = SourceSet::new();
        assert!(set
            .finish_metric(&SourceId::new("release", "58"), MetricKind::PinningFailure)
            .is_err());
    }
}
