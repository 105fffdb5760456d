use anyhow::{bail, Context};
use ca_pinning_dashboard_lib::models::DashboardSettings;
use ca_pinning_dashboard_lib::settings::load_settings;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let (settings, registry_path, replay_path) = match args.as_slice() {
        [registry, replay] => (DashboardSettings::default(), PathBuf::from(registry), PathBuf::from(replay)),
        [settings, registry, replay] => (
            load_settings(&PathBuf::from(settings)).context("loading settings")?,
            PathBuf::from(registry),
            PathBuf::from(replay),
        ),
        _ => bail!("usage: ca-pinning-dashboard [settings.yaml] <KnownRootHashes.json> <replay.json>"),
    };

    ca_pinning_dashboard_lib::init_tracing(&settings).context("initializing tracing")?;
    let (dashboard, summary) = ca_pinning_dashboard_lib::run_replay(settings, &registry_path, &replay_path)
        .await
        .context("replaying telemetry")?;

    for row in dashboard.rows() {
        if let (Some(cells), Some(status)) = (row.cells(), row.status()) {
            tracing::info!(
                row = %row.id(),
                label = %cells.label,
                successes = cells.successes,
                failures = cells.failures,
                status = status.css_class(),
                "ca row"
            );
        }
    }
    tracing::info!(summary = ?summary, "replay finished");
    Ok(())
}
