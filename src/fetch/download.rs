use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::{fs, path::Path};
use tracing::debug;
use url::Url;

/// Download `url` and store the response body verbatim at `dest`.
/// Returns the number of bytes written.
///
/// The body lands in `<dest>.part` first and is renamed into place, so an
/// interrupted transfer never leaves a truncated cache file behind.
pub fn download_to(client: &Client, url: &Url, dest: &Path) -> Result<usize> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let resp = client
        .get(url.as_str())
        .send()
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("Non-success status {}", url))?;
    let bytes = resp
        .bytes()
        .with_context(|| format!("reading body from {}", url))?;

    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = Path::new(&part);
    fs::write(part, &bytes).with_context(|| format!("writing {}", part.display()))?;
    fs::rename(part, dest)
        .with_context(|| format!("renaming {} → {}", part.display(), dest.display()))?;

    debug!(url = %url, bytes = bytes.len(), dest = %dest.display(), "downloaded");
    Ok(bytes.len())
}
