use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;

use super::{Cell, Table};

/// Inferred storage type of one CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Text,
}

/// Parse delimited text with a header row into a [`Table`].
///
/// Every column is typed over all of its rows: integers if every non-empty
/// field parses as `i64`, floats if every one parses as `f64`, text
/// otherwise. Empty fields load as [`Cell::Null`].
pub fn parse_delimited(data: &[u8], delimiter: u8) -> Result<Table> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(Cursor::new(data));

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut raw: Vec<Vec<String>> = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        raw.push(record.iter().map(|s| s.to_string()).collect());
    }

    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|col| infer_kind(raw.iter().map(|r| r[col].as_str())))
        .collect();
    for (name, kind) in headers.iter().zip(&kinds) {
        debug!(column = %name, ?kind, "inferred column type");
    }

    let rows = raw
        .into_iter()
        .map(|r| {
            r.into_iter()
                .zip(&kinds)
                .map(|(field, kind)| to_cell(field, *kind))
                .collect()
        })
        .collect();

    Ok(Table { headers, rows })
}

fn infer_kind<'a>(values: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Int;
    for v in values.map(str::trim).filter(|v| !v.is_empty()) {
        if kind == ColumnKind::Int && v.parse::<i64>().is_err() {
            kind = ColumnKind::Float;
        }
        if kind == ColumnKind::Float && v.parse::<f64>().is_err() {
            return ColumnKind::Text;
        }
    }
    kind
}

fn to_cell(field: String, kind: ColumnKind) -> Cell {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Cell::Null;
    }
    // `infer_kind` has already checked that every field of the column parses.
    match kind {
        ColumnKind::Int => trimmed.parse().map(Cell::Int).unwrap_or(Cell::Text(field)),
        ColumnKind::Float => trimmed
            .parse()
            .map(Cell::Float)
            .unwrap_or(Cell::Text(field)),
        ColumnKind::Text => Cell::Text(field),
    }
}
