use anyhow::Result;
use clap::Parser;
use ghent_etl::{pipeline, Config};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::parse();
    info!(
        staging = %config.staging_dir.display(),
        database = %config.database.display(),
        portal = %config.portal_url,
        "startup"
    );

    // ─── 3) extract → transform → load ───────────────────────────────
    let summary = pipeline::run(&config)?;
    for (table, rows) in &summary.tables {
        info!(table, rows, "summary");
    }

    info!("all done");
    Ok(())
}
