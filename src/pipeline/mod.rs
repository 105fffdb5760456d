pub mod replay;

use crate::dashboard::{Dashboard, RenderReason, RenderSink};
use crate::errors::{AppError, AppResult};
use crate::models::{DashboardSettings, EvolutionChunk, MetricKind, SourceId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

pub trait TelemetrySource: Send + Sync {
    fn versions(&self) -> SourceFuture<'_, Vec<String>>;
    fn measures<'a>(&'a self, source: &'a SourceId) -> SourceFuture<'a, Vec<String>>;
    fn evolution<'a>(&'a self, source: &'a SourceId, measure: &'a str) -> SourceFuture<'a, Vec<EvolutionChunk>>;
}

#[derive(Debug)]
enum DeliveryEvent {
    Declared(SourceId),
    Skipped(SourceId),
    Chunk {
        source: SourceId,
        measure: String,
        chunk: EvolutionChunk,
    },
    MetricFinished {
        source: SourceId,
        measure: String,
    },
    Failed {
        source: SourceId,
        error: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub declared: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub samples_applied: usize,
    pub samples_dropped: usize,
    pub duplicate_chunks: usize,
}

pub async fn run_pipeline<S>(
    source: Arc<S>,
    dashboard: &mut Dashboard,
    sink: &mut dyn RenderSink,
) -> AppResult<PipelineSummary>
where
    S: TelemetrySource + 'static,
{
    let settings = dashboard.settings().clone();
    let ids = source
        .versions()
        .await?
        .iter()
        .map(|token| token.parse::<SourceId>())
        .collect::<AppResult<Vec<_>>>()?;
    tracing::info!(count = ids.len(), "discovered telemetry sources");

    let (sender, receiver) = mpsc::channel::<DeliveryEvent>(settings.channel_capacity);
    let mut handles = Vec::with_capacity(ids.len());
    for id in ids {
        handles.push(tokio::spawn(fetch_source(
            source.clone(),
            id,
            settings.clone(),
            sender.clone(),
        )));
    }
    drop(sender);

    let summary = drain(receiver, handles, dashboard, sink).await?;
    tracing::info!(
        declared = summary.declared,
        completed = summary.completed,
        failed = summary.failed,
        applied = summary.samples_applied,
        "telemetry pipeline drained"
    );
    Ok(summary)
}

async fn drain(
    mut receiver: mpsc::Receiver<DeliveryEvent>,
    handles: Vec<JoinHandle<()>>,
    dashboard: &mut Dashboard,
    sink: &mut dyn RenderSink,
) -> AppResult<PipelineSummary> {
    let mut summary = PipelineSummary::default();
    while let Some(event) = receiver.recv().await {
        if let Err(error) = apply_event(event, dashboard, sink, &mut summary) {
            tracing::error!(error = %error, pending = handles.len(), "aborting telemetry pipeline");
            for handle in &handles {
                handle.abort();
            }
            return Err(error);
        }
    }

    for handle in handles {
        handle
            .await
            .map_err(|error| AppError::Internal(format!("source task failed: {}", error)))?;
    }
    Ok(summary)
}

fn apply_event(
    event: DeliveryEvent,
    dashboard: &mut Dashboard,
    sink: &mut dyn RenderSink,
    summary: &mut PipelineSummary,
) -> AppResult<()> {
    match event {
        DeliveryEvent::Declared(source) => {
            if dashboard.declare_source(source) {
                summary.declared += 1;
            }
        }
        DeliveryEvent::Skipped(source) => {
            tracing::debug!(source = %source, "source lacks a required measure");
            summary.skipped += 1;
        }
        DeliveryEvent::Chunk { source, measure, chunk } => {
            let outcome = dashboard.ingest_chunk(&source, &measure, &chunk)?;
            summary.samples_applied += outcome.applied;
            summary.samples_dropped += outcome.dropped;
            if outcome.duplicate {
                summary.duplicate_chunks += 1;
            }
        }
        DeliveryEvent::MetricFinished { source, measure } => {
            let metric = MetricKind::from_measure(&measure, dashboard.settings())?;
            let completion = dashboard.finish_metric(&source, metric)?;
            if completion.source_completed {
                summary.completed += 1;
                dashboard.render_to(sink, RenderReason::SourceComplete(source));
            }
            if completion.all_complete {
                dashboard.render_to(sink, RenderReason::AllSourcesComplete);
            }
        }
        DeliveryEvent::Failed { source, error } => {
            tracing::error!(source = %source, error = %error, "telemetry source failed");
            summary.failed += 1;
        }
    }
    Ok(())
}

async fn fetch_source<S>(source: Arc<S>, id: SourceId, settings: DashboardSettings, sender: mpsc::Sender<DeliveryEvent>)
where
    S: TelemetrySource + 'static,
{
    if let Err(error) = deliver_source(source.as_ref(), &id, &settings, &sender).await {
        let _ = sender
            .send(DeliveryEvent::Failed {
                source: id,
                error: error.to_string(),
            })
            .await;
    }
}

async fn deliver_source<S: TelemetrySource>(
    source: &S,
    id: &SourceId,
    settings: &DashboardSettings,
    sender: &mpsc::Sender<DeliveryEvent>,
) -> AppResult<()> {
    let measures = source.measures(id).await?;
    let reports_all = MetricKind::ALL
        .iter()
        .all(|metric| measures.iter().any(|name| name == metric.measure_name(settings)));
    if !reports_all {
        return send(sender, DeliveryEvent::Skipped(id.clone())).await;
    }

    send(sender, DeliveryEvent::Declared(id.clone())).await?;
    let (successes, failures) = tokio::join!(
        deliver_measure(source, id, &settings.success_measure, sender),
        deliver_measure(source, id, &settings.failure_measure, sender),
    );
    successes?;
    failures
}

async fn deliver_measure<S: TelemetrySource>(
    source: &S,
    id: &SourceId,
    measure: &str,
    sender: &mpsc::Sender<DeliveryEvent>,
) -> AppResult<()> {
    let chunks = source.evolution(id, measure).await?;
    for chunk in chunks {
        send(
            sender,
            DeliveryEvent::Chunk {
                source: id.clone(),
                measure: measure.to_string(),
                chunk,
            },
        )
        .await?;
    }
    send(
        sender,
        DeliveryEvent::MetricFinished {
            source: id.clone(),
            measure: measure.to_string(),
        },
    )
    .await
}

async fn send(sender: &mpsc::Sender<DeliveryEvent>, event: DeliveryEvent) -> AppResult<()> {
    sender
        .send(event)
        .await
        .map_err(|_| AppError::Internal("delivery channel closed".to_string()))
}
