use anyhow::{Context, Result};
use std::ops::RangeInclusive;
use url::Url;

pub const DEFAULT_PORTAL_URL: &str = "https://data.stad.gent/";

pub const DISTRICT_DATASET: &str = "stadswijken-gent";
pub const DISTRICT_POPULATION_DATASET: &str = "bevolkingsaantal-per-wijk-per-jaar-gent";
pub const CITY_POPULATION_DATASET: &str = "bevolkingsaantal-per-jaar-gent";

/// Years with a published crime export, processed in ascending order.
pub const CRIME_YEARS: RangeInclusive<i32> = 2018..=2023;

/// The crime statistics are published as one dataset per year.
pub fn crime_dataset(year: i32) -> String {
    format!("criminaliteitscijfers-per-wijk-per-maand-gent-{}", year)
}

/// Staging file name for a dataset.
pub fn cache_name(dataset: &str) -> String {
    format!("{}.csv", dataset)
}

/// CSV export endpoint of `dataset` on the portal, semicolon delimited with
/// human-readable column labels.
pub fn export_url(portal: &Url, dataset: &str) -> Result<Url> {
    let mut url = portal
        .join(&format!(
            "api/explore/v2.1/catalog/datasets/{}/exports/csv",
            dataset
        ))
        .with_context(|| format!("building export URL for {}", dataset))?;
    url.query_pairs_mut()
        .append_pair("lang", "en")
        .append_pair("timezone", "Europe/Brussels")
        .append_pair("use_labels", "true")
        .append_pair("delimiter", ";");
    Ok(url)
}
