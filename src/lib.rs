pub mod dashboard;
pub mod errors;
pub mod filter;
pub mod models;
pub mod ordering;
pub mod pipeline;
pub mod registry;
pub mod settings;
pub mod sources;
pub mod store;
pub mod view;

use crate::dashboard::{Dashboard, RenderReason, RenderSink};
use crate::errors::{AppError, AppResult};
use crate::models::DashboardSettings;
use crate::pipeline::replay::ReplaySource;
use crate::pipeline::{run_pipeline, PipelineSummary};
use crate::registry::Registry;
use crate::view::{RenderReport, RowHandle};
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[derive(Debug, Default)]
pub struct TracingSink {
    pub passes: usize,
}

impl RenderSink for TracingSink {
    fn on_render(&mut self, rows: &[RowHandle], report: &RenderReport, reason: &RenderReason) {
        self.passes += 1;
        tracing::info!(
            reason = ?reason,
            rows = rows.len(),
            created = report.created,
            updated = report.updated,
            "table rendered"
        );
    }
}

pub async fn run_replay(
    settings: DashboardSettings,
    registry_path: &Path,
    replay_path: &Path,
) -> AppResult<(Dashboard, PipelineSummary)> {
    let registry = Registry::load(registry_path)?;
    let replay = ReplaySource::load(replay_path)?;
    let mut dashboard = Dashboard::new(registry, settings)?;
    let mut sink = TracingSink::default();
    let summary = run_pipeline(Arc::new(replay), &mut dashboard, &mut sink).await?;
    Ok((dashboard, summary))
}

pub fn init_tracing(settings: &DashboardSettings) -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter));

    match &settings.log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            std::fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(non_blocking)
                .try_init()
                .map_err(|error| AppError::Internal(error.to_string()))
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| AppError::Internal(error.to_string())),
    }
}
