use std::collections::HashMap;

use crate::table::{Cell, Table};

/// Id given to rows whose category never made it into the registry.
pub const UNMAPPED_CATEGORY_ID: i64 = 999;

/// Crime category name → id, assigned 1, 2, 3, … in first-seen order.
///
/// One registry is threaded through every year of a run so that a
/// category keeps the same id across years.
#[derive(Debug, Default, Clone)]
pub struct CategoryRegistry {
    ids: HashMap<String, i64>,
    names: Vec<String>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `name`, registering it with the next free id if unseen.
    pub fn register(&mut self, name: &str) -> i64 {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        self.names.push(name.to_string());
        let id = self.names.len() as i64;
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn id(&self, name: &str) -> Option<i64> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(name, id)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i as i64 + 1))
    }

    /// The `misdrijf_categorie` dimension.
    pub fn to_table(&self) -> Table {
        Table {
            headers: vec![
                "misdrijf_categorie_naam".to_string(),
                "misdrijf_categorie_id".to_string(),
            ],
            rows: self
                .iter()
                .map(|(name, id)| vec![Cell::from(name), Cell::Int(id)])
                .collect(),
        }
    }
}
