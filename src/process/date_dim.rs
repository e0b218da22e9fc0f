use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use duckdb::Connection;
use tracing::instrument;

use super::date_parser::{date_id, quarter};
use crate::{
    duck,
    table::{Cell, Table},
};

pub const DATE_TABLE: &str = "datum";

const DATE_COLUMNS: [&str; 6] = [
    "datum_id",
    "jaar",
    "maand",
    "dag",
    "kwartaal_nummer",
    "week_nummer",
];

/// First and last day covered by the calendar dimension.
pub fn date_range() -> Result<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(2018, 1, 1).context("first calendar day")?;
    let last = NaiveDate::from_ymd_opt(2024, 12, 31).context("last calendar day")?;
    Ok((first, last))
}

/// One row per calendar day in `first..=last`.
pub fn build_date_dimension(first: NaiveDate, last: NaiveDate) -> Result<Table> {
    if last < first {
        bail!("date range {} .. {} is empty", first, last);
    }
    let mut table = Table::new(DATE_COLUMNS.iter().map(|c| c.to_string()).collect());
    for day in first.iter_days().take_while(|d| *d <= last) {
        table.push_row(vec![
            Cell::Int(date_id(day)),
            Cell::Int(i64::from(day.year())),
            Cell::Int(i64::from(day.month())),
            Cell::Int(i64::from(day.day())),
            Cell::Int(i64::from(quarter(day))),
            Cell::Int(i64::from(day.iso_week().week())),
        ])?;
    }
    Ok(table)
}

#[instrument(level = "info", skip(conn))]
pub fn load(conn: &Connection) -> Result<usize> {
    let (first, last) = date_range()?;
    let table = build_date_dimension(first, last)?;
    duck::append_table(conn, DATE_TABLE, &table)
}
