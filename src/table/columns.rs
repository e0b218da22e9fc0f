use tracing::debug;

use super::{Cell, Table};

/// Rename every header found in `mapping` (source → destination). Headers
/// without an entry pass through unchanged.
pub fn rename(mut table: Table, mapping: &[(&str, &str)]) -> Table {
    for header in table.headers.iter_mut() {
        if let Some((_, to)) = mapping.iter().find(|(from, _)| *from == header.as_str()) {
            *header = to.to_string();
        }
    }
    table
}

/// Drop every column whose header is not in `keep`. Surviving columns keep
/// their current order.
pub fn project(mut table: Table, keep: &[&str]) -> Table {
    let retained: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| keep.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();

    if retained.len() == table.width() {
        return table;
    }
    debug!(
        dropped = ?table
            .headers
            .iter()
            .filter(|h| !keep.contains(&h.as_str()))
            .collect::<Vec<_>>(),
        "projecting columns"
    );

    table.headers = retained.iter().map(|&i| table.headers[i].clone()).collect();
    for row in table.rows.iter_mut() {
        let mut cells = std::mem::take(row);
        *row = retained
            .iter()
            .map(|&i| std::mem::replace(&mut cells[i], Cell::Null))
            .collect();
    }
    table
}
