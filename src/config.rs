use anyhow::{Context, Result};
use clap::Parser;
use std::{borrow::Cow, fs, path::PathBuf};
use url::Url;

use crate::fetch::urls::DEFAULT_PORTAL_URL;

/// Schema shipped with the crate, used unless `--schema` points elsewhere.
pub const EMBEDDED_SCHEMA: &str = include_str!("../sql/create-db.sql");

/// Extract the Ghent open-data exports into a local DuckDB file.
#[derive(Parser, Debug, Clone)]
#[command(name = "ghent-etl", version)]
pub struct Config {
    /// Directory holding the raw downloaded exports
    #[arg(long, default_value = "staging")]
    pub staging_dir: PathBuf,

    /// Output database, deleted and rebuilt on every run
    #[arg(long, default_value = "ghent-data.duckdb")]
    pub database: PathBuf,

    /// SQL script creating the destination tables
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Base URL of the open-data portal
    #[arg(long, default_value = DEFAULT_PORTAL_URL)]
    pub portal_url: Url,
}

impl Config {
    /// The DDL to run against a fresh database.
    pub fn schema_sql(&self) -> Result<Cow<'static, str>> {
        match &self.schema {
            Some(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .with_context(|| format!("reading schema script {}", path.display())),
            None => Ok(Cow::Borrowed(EMBEDDED_SCHEMA)),
        }
    }
}
