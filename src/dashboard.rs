use crate::errors::{AppError, AppResult};
use crate::filter::{enabled_time_series, enabled_total};
use crate::models::{
    DashboardSettings, EntityDetail, EntityIndex, EvolutionChunk, MetricKind, RowStatus, SourceId, SourceSnapshot,
};
use crate::ordering::{sort_entities, SortKey, SortState};
use crate::registry::{format_fingerprint, truncate_label, Registry};
use crate::sources::{Completion, SourceSet};
use crate::store::{AggregationStore, ChunkOutcome, Entity};
use crate::view::{HandlerFactory, NoopHandlers, RenderReport, RowCells, RowContent, RowHandle, ViewReconciler};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "reason", content = "source")]
pub enum RenderReason {
    SourceComplete(SourceId),
    AllSourcesComplete,
    SourceToggled(SourceId),
    SortChanged,
}

pub trait RenderSink {
    fn on_render(&mut self, rows: &[RowHandle], report: &RenderReport, reason: &RenderReason);
}

pub struct Dashboard {
    settings: DashboardSettings,
    store: AggregationStore,
    sources: SourceSet,
    sort: SortState,
    view: ViewReconciler,
    handlers: Box<dyn HandlerFactory>,
}

impl Dashboard {
    pub fn new(registry: Registry, settings: DashboardSettings) -> AppResult<Self> {
        let key: SortKey = settings.default_sort_key.parse()?;
        Ok(Self {
            settings,
            store: AggregationStore::new(registry),
            sources: SourceSet::new(),
            sort: SortState::new(key),
            view: ViewReconciler::new(),
            handlers: Box::new(NoopHandlers),
        })
    }

    pub fn with_handlers(mut self, handlers: Box<dyn HandlerFactory>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn declare_source(&mut self, source: SourceId) -> bool {
        let label = source.to_string();
        let added = self.sources.declare(source);
        if added {
            tracing::info!(source = %label, "declared telemetry source");
        }
        added
    }

    pub fn ingest(
        &mut self,
        index: EntityIndex,
        source: &SourceId,
        metric: MetricKind,
        date: NaiveDate,
        count: u64,
    ) -> bool {
        self.sources.mark_data(source);
        self.store.ingest(index, source, metric, date, count)
    }

    pub fn ingest_chunk(&mut self, source: &SourceId, measure: &str, chunk: &EvolutionChunk) -> AppResult<ChunkOutcome> {
        let metric = MetricKind::from_measure(measure, &self.settings)?;
        if !self.sources.contains(source) {
            return Err(AppError::Contract(format!("data for undeclared source {}", source)));
        }
        self.sources.mark_data(source);
        let outcome = self.store.ingest_chunk(source, metric, chunk);
        if outcome.dropped > 0 {
            tracing::debug!(source = %source, measure, dropped = outcome.dropped, "bins beyond registry bound ignored");
        }
        Ok(outcome)
    }

    pub fn finish_metric(&mut self, source: &SourceId, metric: MetricKind) -> AppResult<Completion> {
        let completion = self.sources.finish_metric(source, metric)?;
        if completion.source_completed {
            tracing::info!(source = %source, "telemetry source complete");
        }
        if completion.all_complete {
            tracing::info!(sources = self.sources.len(), "all declared sources complete");
        }
        Ok(completion)
    }

    pub fn all_complete(&self) -> bool {
        self.sources.all_complete()
    }

    pub fn source_snapshots(&self) -> Vec<SourceSnapshot> {
        self.sources.snapshots()
    }

    pub fn toggle_source(
        &mut self,
        source: &SourceId,
        enabled: bool,
        sink: &mut dyn RenderSink,
    ) -> AppResult<RenderReport> {
        if self.sources.set_enabled(source, enabled)? {
            tracing::debug!(source = %source, enabled, "source toggled");
        }
        Ok(self.render_to(sink, RenderReason::SourceToggled(source.clone())))
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn select_sort(&mut self, key: SortKey, sink: &mut dyn RenderSink) -> RenderReport {
        self.sort.select(key);
        tracing::debug!(key = key.as_str(), direction = ?self.sort.direction, "sort selected");
        self.render_to(sink, RenderReason::SortChanged)
    }

    pub fn select_sort_named(&mut self, name: &str, sink: &mut dyn RenderSink) -> AppResult<RenderReport> {
        let key = name.parse()?;
        Ok(self.select_sort(key, sink))
    }

    pub fn enabled_totals(&self, entity: &Entity) -> (u64, u64) {
        (
            enabled_total(entity, MetricKind::ValidationSuccess, &self.sources),
            enabled_total(entity, MetricKind::PinningFailure, &self.sources),
        )
    }

    pub fn ordered_entities(&self) -> Vec<&Entity> {
        let mut entities = self.store.entities().collect::<Vec<_>>();
        sort_entities(&mut entities, self.sort, &self.sources);
        entities
    }

    pub fn render(&mut self) -> RenderReport {
        let contents = self
            .ordered_entities()
            .into_iter()
            .map(|entity| {
                let (successes, failures) = self.enabled_totals(entity);
                RowContent {
                    entity: entity.index(),
                    cells: RowCells {
                        label: truncate_label(entity.label(), self.settings.max_label_len),
                        successes,
                        failures,
                    },
                }
            })
            .collect::<Vec<_>>();
        self.view.reconcile(&contents, self.handlers.as_ref())
    }

    pub fn render_to(&mut self, sink: &mut dyn RenderSink, reason: RenderReason) -> RenderReport {
        let report = self.render();
        sink.on_render(self.view.rows(), &report, &reason);
        report
    }

    pub fn rows(&self) -> &[RowHandle] {
        self.view.rows()
    }

    pub fn detail(&self, index: EntityIndex) -> Option<EntityDetail> {
        let entity = self.store.entity(index)?;
        let (successes, failures) = self.enabled_totals(entity);
        Some(EntityDetail {
            index,
            label: entity.label().to_string(),
            display_label: truncate_label(entity.label(), self.settings.max_label_len),
            fingerprint: format_fingerprint(entity.fingerprint()),
            successes,
            failures,
            status: RowStatus::classify(successes, failures),
            success_series: enabled_time_series(entity, MetricKind::ValidationSuccess, &self.sources),
            failure_series: enabled_time_series(entity, MetricKind::PinningFailure, &self.sources),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Dashboard, RenderReason, RenderSink};
    use crate::models::{DashboardSettings, EvolutionChunk, EvolutionPoint, MetricKind, RowStatus, SourceId};
    use crate::ordering::{SortDirection, SortKey};
    use crate::store::tests::{day, registry};
    use crate::view::{RenderReport, RowHandle};

    fn example() -> (Dashboard, SourceId) {
        let mut dashboard =
            Dashboard::new(registry(&["Root_One", "Root_Two"]), DashboardSettings::default()).expect("dashboard");
        let source = SourceId::new("ch", "60");
        dashboard.declare_source(source.clone());
        dashboard.ingest(0, &source, MetricKind::ValidationSuccess, day(1), 10);
        dashboard.ingest(1, &source, MetricKind::ValidationSuccess, day(1), 5);
        dashboard.ingest(0, &source, MetricKind::PinningFailure, day(1), 2);
        (dashboard, source)
    }

    #[derive(Default)]
    struct CollectingSink {
        reasons: Vec<RenderReason>,
        row_counts: Vec<usize>,
    }

    impl RenderSink for CollectingSink {
        fn on_render(&mut self, rows: &[RowHandle], _report: &RenderReport, reason: &RenderReason) {
            self.reasons.push(reason.clone());
            self.row_counts.push(rows.len());
        }
    }

    #[test]
    fn example_scenario_totals_and_order() {
        let (mut dashboard, _) = example();
        let zero = dashboard.detail(0).expect("entity 0");
        assert_eq!((zero.successes, zero.failures), (10, 2));
        assert_eq!(zero.label, "Root One");
        let one = dashboard.detail(1).expect("entity 1");
        assert_eq!((one.successes, one.failures), (5, 0));

        let mut sink = CollectingSink::default();
        dashboard.select_sort(SortKey::Successes, &mut sink);
        dashboard.select_sort(SortKey::Successes, &mut sink);
        assert_eq!(dashboard.sort_state().direction, SortDirection::Descending);
        let order = dashboard.rows().iter().filter_map(RowHandle::bound_entity).collect::<Vec<_>>();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn disabling_a_source_rerenders_all_rows() {
        let (mut dashboard, source) = example();
        dashboard.render();
        let mut sink = CollectingSink::default();
        let report = dashboard.toggle_source(&source, false, &mut sink).expect("toggle");
        assert_eq!(report.updated, 2);
        assert!(dashboard
            .rows()
            .iter()
            .all(|row| row.status() == Some(RowStatus::NoData)));

        let detail = dashboard.detail(0).expect("entity 0");
        assert!(detail.success_series.is_empty());
        assert_eq!(detail.successes, 0);
    }

    #[test]
    fn rerender_without_changes_is_stable() {
        let (mut dashboard, _) = example();
        dashboard.render();
        let report = dashboard.render();
        assert_eq!(report.content_changes(), 0);
        assert_eq!(report.rows, 2);
    }

    #[test]
    fn labels_are_truncated_only_for_display() {
        let settings = DashboardSettings {
            max_label_len: 4,
            ..DashboardSettings::default()
        };
        let mut dashboard = Dashboard::new(registry(&["Long_Root_Name"]), settings).expect("dashboard");
        let source = SourceId::new("ch", "60");
        dashboard.declare_source(source.clone());
        dashboard.ingest(0, &source, MetricKind::ValidationSuccess, day(1), 1);
        dashboard.render();

        assert_eq!(dashboard.rows()[0].cells().expect("cells").label, "Long...");
        let detail = dashboard.detail(0).expect("detail");
        assert_eq!(detail.label, "Long Root Name");
        assert_eq!(detail.display_label, "Long...");
        assert_eq!(detail.fingerprint, "00:ab");
    }

    #[test]
    fn chunk_for_unknown_measure_fails_fast() {
        let (mut dashboard, source) = example();
        let chunk = EvolutionChunk::spanning(vec![EvolutionPoint { date: day(2), bins: vec![1] }]).expect("chunk");
        let err = dashboard
            .ingest_chunk(&source, "SSL_HANDSHAKE_RESULT", &chunk)
            .expect_err("unknown measure");
        assert!(err.is_fatal());

        let err = dashboard
            .ingest_chunk(&SourceId::new("beta", "59"), "CERT_PINNING_FAILURES_BY_CA", &chunk)
            .expect_err("undeclared source");
        assert!(err.to_string().starts_with("CONTRACT_VIOLATION"));
    }

    #[test]
    fn bad_default_sort_key_is_rejected() {
        let settings = DashboardSettings {
            default_sort_key: "weight".to_string(),
            ..DashboardSettings::default()
        };
        assert!(Dashboard::new(registry(&["A"]), settings).is_err());
    }

    #[test]
    fn render_to_reports_reason() {
        let (mut dashboard, source) = example();
        let mut sink = CollectingSink::default();
        dashboard.render_to(&mut sink, RenderReason::SourceComplete(source.clone()));
        dashboard.render_to(&mut sink, RenderReason::SortChanged);
        assert_eq!(sink.reasons, vec![RenderReason::SourceComplete(source), RenderReason::SortChanged]);
        assert_eq!(sink.row_counts, vec![2, 2]);
    }

    #[test]
    fn toggles_and_sort_changes_reach_the_sink() {
        let (mut dashboard, source) = example();
        let mut sink = CollectingSink::default();
        dashboard.toggle_source(&source, false, &mut sink).expect("toggle");
        dashboard.select_sort(SortKey::Failures, &mut sink);
        dashboard.select_sort_named("name", &mut sink).expect("named sort");
        assert!(dashboard.select_sort_named("weight", &mut sink).is_err());

        assert_eq!(
            sink.reasons,
            vec![
                RenderReason::SourceToggled(source.clone()),
                RenderReason::SortChanged,
                RenderReason::SortChanged,
            ]
        );
        assert_eq!(sink.row_counts, vec![2, 2, 2]);

        let err = dashboard
            .toggle_source(&SourceId::new("beta", "59"), true, &mut sink)
            .expect_err("undeclared");
        assert!(err.to_string().starts_with("NOT_FOUND"));
        assert_eq!(sink.reasons.len(), 3);
    }
}
