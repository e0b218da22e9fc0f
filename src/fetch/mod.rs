pub mod download;
pub mod urls;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument};
use url::Url;

use crate::table::{parse_delimited, Table};

/// Field delimiter of every portal export.
pub const DELIMITER: u8 = b';';

/// Staging cache in front of the open-data portal.
pub struct Fetcher {
    client: Client,
    staging_dir: PathBuf,
    portal: Url,
}

impl Fetcher {
    /// Creates `staging_dir` if it does not exist yet.
    pub fn new(staging_dir: impl Into<PathBuf>, portal: Url) -> Result<Self> {
        let staging_dir = staging_dir.into();
        fs::create_dir_all(&staging_dir)
            .with_context(|| format!("creating staging directory {}", staging_dir.display()))?;
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            staging_dir,
            portal,
        })
    }

    /// Staged or freshly downloaded CSV export of a portal dataset.
    pub fn dataset(&self, dataset: &str) -> Result<Table> {
        let url = urls::export_url(&self.portal, dataset)?;
        read_or_fetch(
            &self.client,
            &self.staging_dir,
            &urls::cache_name(dataset),
            &url,
        )
    }
}

/// Return the export cached at `staging_dir/cache_name`, downloading it from
/// `url` first if it has not been staged yet. A staged file is never
/// re-validated.
#[instrument(level = "info", skip(client, staging_dir, url))]
pub fn read_or_fetch(
    client: &Client,
    staging_dir: &Path,
    cache_name: &str,
    url: &Url,
) -> Result<Table> {
    let target = staging_dir.join(cache_name);

    if target.exists() {
        info!(path = %target.display(), "already available");
    } else {
        info!(path = %target.display(), %url, "not available, downloading");
        let bytes = download::download_to(client, url, &target)?;
        info!(path = %target.display(), bytes, "staged");
    }

    let data = fs::read(&target).with_context(|| format!("reading {}", target.display()))?;
    let table = parse_delimited(&data, DELIMITER)
        .with_context(|| format!("parsing {}", target.display()))?;
    info!(rows = table.height(), columns = table.width(), "parsed");
    Ok(table)
}
