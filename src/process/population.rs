use anyhow::{Context, Result};
use duckdb::Connection;
use tracing::instrument;

use crate::{
    duck,
    fetch::{
        urls::{CITY_POPULATION_DATASET, DISTRICT_POPULATION_DATASET},
        Fetcher,
    },
    table::{project, rename, Table},
};

pub const DISTRICT_POPULATION_TABLE: &str = "stadswijk_bevolkingsaantal";
pub const CITY_POPULATION_TABLE: &str = "bevolkingsaantal";

const POPULATION: &str = "bevolkingsaantal";

const DISTRICT_POPULATION_MAP: &[(&str, &str)] = &[
    ("Period", "jaar"),
    ("ValueString", POPULATION),
    ("wijkcode", "stadswijk_id"),
];
const DISTRICT_POPULATION_COLUMNS: &[&str] = &["jaar", POPULATION, "stadswijk_id"];

const CITY_POPULATION_MAP: &[(&str, &str)] = &[("Period", "jaar"), ("ValueString", POPULATION)];
const CITY_POPULATION_COLUMNS: &[&str] = &["jaar", POPULATION];

fn transform(table: Table, mapping: &[(&str, &str)], keep: &[&str]) -> Result<Table> {
    let mut table = rename(table, mapping);
    table
        .coerce_int(POPULATION)
        .context("population counts must be integers")?;
    Ok(project(table, keep))
}

pub fn transform_district_population(table: Table) -> Result<Table> {
    transform(table, DISTRICT_POPULATION_MAP, DISTRICT_POPULATION_COLUMNS)
}

pub fn transform_city_population(table: Table) -> Result<Table> {
    transform(table, CITY_POPULATION_MAP, CITY_POPULATION_COLUMNS)
}

#[instrument(level = "info", skip_all)]
pub fn load_district_population(fetcher: &Fetcher, conn: &Connection) -> Result<usize> {
    let table = transform_district_population(fetcher.dataset(DISTRICT_POPULATION_DATASET)?)?;
    duck::append_table(conn, DISTRICT_POPULATION_TABLE, &table)
}

#[instrument(level = "info", skip_all)]
pub fn load_city_population(fetcher: &Fetcher, conn: &Connection) -> Result<usize> {
    let table = transform_city_population(fetcher.dataset(CITY_POPULATION_DATASET)?)?;
    duck::append_table(conn, CITY_POPULATION_TABLE, &table)
}
