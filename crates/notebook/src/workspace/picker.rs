//! Selection list over the permanent sheet's rows

use crate::store::{Entry, TempId};

/// Id of the synthetic "Add New Tab" row; never a valid TempID
pub const NEW_ENTRY_SENTINEL: TempId = TempId(-10);

pub const NEW_ENTRY_LABEL: &str = "Add New Tab";

/// The open picker: loaded rows plus the sentinel, and a filter query
#[derive(Debug, Clone)]
pub struct Picker {
    rows: Vec<Entry>,
    query: String,
}

impl Picker {
    pub fn open(mut rows: Vec<Entry>) -> Self {
        rows.push(Entry::new(NEW_ENTRY_SENTINEL, NEW_ENTRY_LABEL, ""));
        Self {
            rows,
            query: String::new(),
        }
    }

    /// All rows, sentinel last
    pub fn rows(&self) -> &[Entry] {
        &self.rows
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Rows whose context contains the query, ignoring case
    pub fn visible(&self) -> Vec<&Entry> {
        let needle = self.query.trim().to_lowercase();
        self.rows
            .iter()
            .filter(|e| needle.is_empty() || e.context.to_lowercase().contains(&needle))
            .collect()
    }

    /// The row at `index` of the filtered list
    pub fn select(&self, index: usize) -> Option<&Entry> {
        self.visible().into_iter().nth(index)
    }
}
