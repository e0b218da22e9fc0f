use anyhow::Result;
use duckdb::Connection;
use tracing::instrument;

use crate::{
    duck,
    fetch::{urls::DISTRICT_DATASET, Fetcher},
    table::{project, rename, Table},
};

pub const DISTRICT_TABLE: &str = "stadswijk";

const COLUMN_MAP: &[(&str, &str)] = &[
    ("nieuwnr", "stadswijk_id"),
    ("naam", "stadsdeel"),
    ("wijk", "stadswijk_naam"),
];

const COLUMNS: &[&str] = &["stadswijk_id", "stadsdeel", "stadswijk_naam"];

pub fn transform(table: Table) -> Table {
    project(rename(table, COLUMN_MAP), COLUMNS)
}

#[instrument(level = "info", skip_all)]
pub fn load(fetcher: &Fetcher, conn: &Connection) -> Result<usize> {
    let table = transform(fetcher.dataset(DISTRICT_DATASET)?);
    duck::append_table(conn, DISTRICT_TABLE, &table)
}
