use crate::models::{EntityIndex, EvolutionChunk, MetricKind, SourceId, SubRange};
use crate::registry::{normalize_label, Registry};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

// by_source always equals the per-source column sums of by_date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricCounts {
    by_source: BTreeMap<SourceId, u64>,
    by_date: BTreeMap<NaiveDate, BTreeMap<SourceId, u64>>,
}

impl MetricCounts {
    fn add(&mut self, source: &SourceId, date: NaiveDate, count: u64) {
        let total = self.by_source.entry(source.clone()).or_insert(0);
        *total = total.saturating_add(count);
        let bucket = self
            .by_date
            .entry(date)
            .or_default()
            .entry(source.clone())
            .or_insert(0);
        *bucket = bucket.saturating_add(count);
    }

    pub fn by_source(&self) -> &BTreeMap<SourceId, u64> {
        &self.by_source
    }

    pub fn by_date(&self) -> &BTreeMap<NaiveDate, BTreeMap<SourceId, u64>> {
        &self.by_date
    }

    pub fn source_total(&self, source: &SourceId) -> u64 {
        self.by_source.get(source).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    index: EntityIndex,
    label: String,
    fingerprint: Vec<u8>,
    successes: MetricCounts,
    failures: MetricCounts,
}

impl Entity {
    pub fn index(&self) -> EntityIndex {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }

    pub fn counts(&self, metric: MetricKind) -> &MetricCounts {
        match metric {
            MetricKind::ValidationSuccess => &self.successes,
            MetricKind::PinningFailure => &self.failures,
        }
    }

    fn counts_mut(&mut self, metric: MetricKind) -> &mut MetricCounts {
        match metric {
            MetricKind::ValidationSuccess => &mut self.successes,
            MetricKind::PinningFailure => &mut self.failures,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub applied: usize,
    pub dropped: usize,
    pub duplicate: bool,
}

#[derive(Debug, Default)]
pub struct AggregationStore {
    registry: Registry,
    entities: BTreeMap<EntityIndex, Entity>,
    delivered: HashSet<(SourceId, MetricKind, SubRange)>,
}

impl AggregationStore {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            entities: BTreeMap::new(),
            delivered: HashSet::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn ingest(
        &mut self,
        index: EntityIndex,
        source: &SourceId,
        metric: MetricKind,
        date: NaiveDate,
        count: u64,
    ) -> bool {
        let Some(root) = self.registry.get(index) else {
            tracing::debug!(index, source = %source, metric = metric.as_str(), "dropping sample beyond registry bound");
            return false;
        };

        let entity = self.entities.entry(index).or_insert_with(|| Entity {
            index,
            label: normalize_label(&root.label),
            fingerprint: root.fingerprint.clone(),
            successes: MetricCounts::default(),
            failures: MetricCounts::default(),
        });
        entity.counts_mut(metric).add(source, date, count);
        true
    }

    pub fn ingest_chunk(&mut self, source: &SourceId, metric: MetricKind, chunk: &EvolutionChunk) -> ChunkOutcome {
        let key = (source.clone(), metric, chunk.sub_range);
        if !self.delivered.insert(key) {
            tracing::warn!(
                source = %source,
                metric = metric.as_str(),
                from = %chunk.sub_range.from,
                to = %chunk.sub_range.to,
                "sub-range delivered twice; skipping"
            );
            return ChunkOutcome {
                duplicate: true,
                ..ChunkOutcome::default()
            };
        }

        let mut outcome = ChunkOutcome::default();
        for point in &chunk.points {
            for (index, count) in point.bins.iter().enumerate() {
                if self.ingest(index, source, metric, point.date, *count) {
                    outcome.applied += 1;
                } else {
                    outcome.dropped += 1;
                }
            }
        }
        outcome
    }

    pub fn entity(&self, index: EntityIndex) -> Option<&Entity> {
        self.entities.get(&index)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
