use anyhow::{anyhow, Context, Result};
use chrono::Datelike;
use duckdb::Connection;
use std::{collections::HashMap, hash::Hash};
use tracing::{debug, info, instrument};

use super::{
    categories::{CategoryRegistry, UNMAPPED_CATEGORY_ID},
    date_parser::{date_id, parse_iso_date, quarter},
};
use crate::{
    duck,
    fetch::{
        urls::{crime_dataset, CRIME_YEARS},
        Fetcher,
    },
    table::{project, rename, Cell, Table},
};

pub const CRIME_TABLE: &str = "misdrijf";
pub const CATEGORY_TABLE: &str = "misdrijf_categorie";

const COLUMN_MAP: &[(&str, &str)] = &[
    ("jaar_maand", "jaar_maand_text"),
    ("Categorie", "misdrijf_categorie_naam"),
    ("Wijkcode", "stadswijk_id"),
    ("Totaal", "misdrijf_aantal"),
];

const COLUMNS: &[&str] = &[
    "jaar_maand",
    "misdrijf_categorie_id",
    "stadswijk_id",
    "misdrijf_aantal",
    "misdrijf_kwartaal_totaal",
    "misdrijf_jaar_totaal",
];

/// Known misspelling in the published category names.
const CATEGORY_FIXES: &[(&str, &str)] = &[("Verkeerongevallen", "Verkeersongevallen")];

/// Rows written by [`load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrimeLoad {
    pub records: usize,
    pub categories: usize,
}

/// Normalise one year's export without dropping any columns.
///
/// Adds `jaar_maand`, `jaar`, `kwartaal_nummer`, `misdrijf_categorie_id` and
/// both rollup totals. Category names not yet in `registry` are registered
/// in the order they first appear.
pub fn enrich(table: Table, registry: &mut CategoryRegistry) -> Result<Table> {
    let mut table = rename(table, COLUMN_MAP);

    // year-month text → date keys
    let mut month_ids = Vec::with_capacity(table.height());
    let mut years = Vec::with_capacity(table.height());
    let mut quarters = Vec::with_capacity(table.height());
    for (row_no, cell) in table.column("jaar_maand_text")?.enumerate() {
        let date = match cell {
            Cell::Text(s) => parse_iso_date(s),
            _ => None,
        }
        .ok_or_else(|| anyhow!("invalid jaar_maand {} at row {}", cell, row_no))?;
        month_ids.push(date_id(date));
        years.push(i64::from(date.year()));
        quarters.push(i64::from(quarter(date)));
    }
    table.set_column("jaar_maand", month_ids.into_iter().map(Cell::Int).collect())?;
    table.set_column("jaar", years.iter().copied().map(Cell::Int).collect())?;
    table.set_column(
        "kwartaal_nummer",
        quarters.iter().copied().map(Cell::Int).collect(),
    )?;

    let names: Vec<Cell> = table
        .column("misdrijf_categorie_naam")?
        .map(fix_category)
        .collect();

    // extend the registry before mapping so every named category resolves
    for name in names.iter().filter_map(category_name) {
        registry.register(&name);
    }
    let category_ids: Vec<i64> = names
        .iter()
        .map(|c| {
            category_name(c)
                .and_then(|n| registry.id(&n))
                .unwrap_or(UNMAPPED_CATEGORY_ID)
        })
        .collect();
    table.set_column("misdrijf_categorie_naam", names)?;
    table.set_column(
        "misdrijf_categorie_id",
        category_ids.iter().copied().map(Cell::Int).collect(),
    )?;

    table.coerce_int("misdrijf_aantal")?;
    let counts: Vec<i64> = table
        .column("misdrijf_aantal")?
        .map(|c| c.as_int().unwrap_or_default())
        .collect();
    let districts: Vec<Cell> = table.column("stadswijk_id")?.cloned().collect();

    let quarter_totals = group_sums(
        (0..counts.len()).map(|i| (years[i], quarters[i], &districts[i], category_ids[i])),
        &counts,
    );
    let year_totals = group_sums(
        (0..counts.len()).map(|i| (years[i], &districts[i], category_ids[i])),
        &counts,
    );
    table.set_column(
        "misdrijf_kwartaal_totaal",
        quarter_totals.into_iter().map(Cell::Int).collect(),
    )?;
    table.set_column(
        "misdrijf_jaar_totaal",
        year_totals.into_iter().map(Cell::Int).collect(),
    )?;

    Ok(table)
}

/// [`enrich`] followed by projection onto the `misdrijf` columns.
pub fn transform(table: Table, registry: &mut CategoryRegistry) -> Result<Table> {
    Ok(project(enrich(table, registry)?, COLUMNS))
}

/// Load every crime year in ascending order, then the category dimension.
#[instrument(level = "info", skip_all)]
pub fn load(fetcher: &Fetcher, conn: &Connection) -> Result<CrimeLoad> {
    let mut registry = CategoryRegistry::new();
    let mut records = 0;

    for year in CRIME_YEARS {
        records += load_year(fetcher, conn, year, &mut registry)
            .with_context(|| format!("crime data for {}", year))?;
    }

    let categories = duck::append_table(conn, CATEGORY_TABLE, &registry.to_table())?;
    info!(categories, "category dimension written");
    Ok(CrimeLoad {
        records,
        categories,
    })
}

#[instrument(level = "info", skip(fetcher, conn, registry))]
fn load_year(
    fetcher: &Fetcher,
    conn: &Connection,
    year: i32,
    registry: &mut CategoryRegistry,
) -> Result<usize> {
    let known = registry.len();
    let table = transform(fetcher.dataset(&crime_dataset(year))?, registry)?;
    debug!(new_categories = registry.len() - known, "categories registered");
    duck::append_table(conn, CRIME_TABLE, &table)
}

fn fix_category(cell: &Cell) -> Cell {
    match cell {
        Cell::Text(s) => Cell::Text(
            CATEGORY_FIXES
                .iter()
                .fold(s.clone(), |acc, (from, to)| acc.replace(from, to)),
        ),
        other => other.clone(),
    }
}

fn category_name(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        other => Some(other.to_string()),
    }
}

/// For every row, the sum of `values` over all rows sharing its key.
fn group_sums<K: Hash + Eq>(keys: impl Iterator<Item = K> + Clone, values: &[i64]) -> Vec<i64> {
    let mut totals: HashMap<K, i64> = HashMap::new();
    for (key, v) in keys.clone().zip(values) {
        *totals.entry(key).or_default() += v;
    }
    keys.map(|k| totals[&k]).collect()
}
