use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, instrument};

use crate::{
    config::Config,
    duck,
    fetch::Fetcher,
    process::{self, crime, date_dim, district, population},
};

/// Rows written per destination table, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tables: Vec<(&'static str, usize)>,
}

impl RunSummary {
    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, rows)| *rows)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }

    fn record(&mut self, table: &'static str, rows: usize, started: Instant) {
        info!(table, rows, elapsed = ?started.elapsed(), "loaded");
        self.tables.push((table, rows));
    }
}

/// Rebuild the whole database: schema, calendar, city population, districts,
/// district population, then crime records and their categories.
///
/// Any failure aborts the run. Tables written before the failure stay in the
/// database until the next run recreates it.
#[instrument(level = "info", skip_all, fields(database = %config.database.display()))]
pub fn run(config: &Config) -> Result<RunSummary> {
    let fetcher = Fetcher::new(&config.staging_dir, config.portal_url.clone())?;

    let conn = duck::recreate_db(&config.database)?;
    duck::apply_schema(&conn, &config.schema_sql()?)?;
    info!("schema created");

    let mut summary = RunSummary::default();

    let t = Instant::now();
    let rows = date_dim::load(&conn).context("loading date dimension")?;
    summary.record(process::DATE_TABLE, rows, t);

    let t = Instant::now();
    let rows = population::load_city_population(&fetcher, &conn)
        .context("loading city population")?;
    summary.record(process::CITY_POPULATION_TABLE, rows, t);

    let t = Instant::now();
    let rows = district::load(&fetcher, &conn).context("loading districts")?;
    summary.record(process::DISTRICT_TABLE, rows, t);

    let t = Instant::now();
    let rows = population::load_district_population(&fetcher, &conn)
        .context("loading district population")?;
    summary.record(process::DISTRICT_POPULATION_TABLE, rows, t);

    let t = Instant::now();
    let crime = crime::load(&fetcher, &conn).context("loading crime data")?;
    summary.record(process::CRIME_TABLE, crime.records, t);
    summary.record(process::CATEGORY_TABLE, crime.categories, t);

    info!(
        tables = summary.tables.len(),
        rows = summary.total_rows(),
        "run complete"
    );
    Ok(summary)
}
