use anyhow::{bail, Context, Result};
use duckdb::{Connection, ToSql};
use std::{fs, path::Path, time::Instant};
use tracing::{debug, info, instrument};

use crate::table::{Cell, Table};

/// Delete the database at `path` (with its write-ahead log) and open a fresh
/// one in its place.
pub fn recreate_db(path: &Path) -> Result<Connection> {
    let mut wal = path.as_os_str().to_owned();
    wal.push(".wal");
    for stale in [path, Path::new(&wal)] {
        if stale.exists() {
            fs::remove_file(stale).with_context(|| format!("removing {}", stale.display()))?;
            info!(path = %stale.display(), "removed previous database file");
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    Connection::open(path).with_context(|| format!("opening DuckDB at {}", path.display()))
}

/// Run the DDL script that defines every destination table.
pub fn apply_schema(conn: &Connection, sql: &str) -> Result<()> {
    conn.execute_batch(sql).context("applying schema script")?;
    Ok(())
}

/// Column names of `table` in declaration order; empty if it does not exist.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_name = ? ORDER BY ordinal_position",
    )?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<duckdb::Result<Vec<_>>>()
        .with_context(|| format!("reading columns of {}", table))?;
    Ok(columns)
}

/// Append every row of `data` to the existing table `name`, matching columns
/// by name. Destination columns missing from `data` are written as NULL;
/// a column of `data` the destination does not have is an error.
///
/// Returns the number of rows appended.
#[instrument(level = "info", skip(conn, data), fields(rows = data.height()))]
pub fn append_table(conn: &Connection, name: &str, data: &Table) -> Result<usize> {
    let dest = table_columns(conn, name)?;
    if dest.is_empty() {
        bail!("destination table `{}` does not exist", name);
    }
    if let Some(extra) = data.headers.iter().find(|h| !dest.contains(h)) {
        bail!(
            "column `{}` is not part of destination table `{}` {:?}",
            extra,
            name,
            dest
        );
    }
    let positions: Vec<Option<usize>> = dest.iter().map(|c| data.column_index(c)).collect();
    debug!(?dest, ?positions, "column layout");

    let start = Instant::now();
    let null = Cell::Null;
    let mut appender = conn
        .appender(name)
        .with_context(|| format!("creating appender for {}", name))?;
    for (row_no, row) in data.rows.iter().enumerate() {
        let params: Vec<&dyn ToSql> = positions
            .iter()
            .map(|p| match p {
                Some(i) => &row[*i] as &dyn ToSql,
                None => &null as &dyn ToSql,
            })
            .collect();
        appender
            .append_row(params.as_slice())
            .with_context(|| format!("appending row {} to {}", row_no, name))?;
    }
    appender
        .flush()
        .with_context(|| format!("flushing rows into {}", name))?;

    debug!(elapsed = ?start.elapsed(), "appended");
    Ok(data.height())
}
