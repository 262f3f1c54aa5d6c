//! A1-notation ranges
//!
//! Only the shapes the entry store needs: a bounded single row (`A1:C1`),
//! an open-ended block starting at some row (`A2:C`), and whole columns
//! (`A:C`). Columns are zero-based here and rendered as letters; rows are
//! one-based as in the spreadsheet UI.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct A1Range {
    first_col: u32,
    last_col: u32,
    first_row: Option<u32>,
    last_row: Option<u32>,
}

impl A1Range {
    /// Cells `first_col..=last_col` on a single row
    pub fn row(first_col: u32, last_col: u32, row: u32) -> Self {
        Self {
            first_col,
            last_col,
            first_row: Some(row),
            last_row: Some(row),
        }
    }

    /// Columns `first_col..=last_col` from `first_row` to the end of the sheet
    pub fn rows_from(first_col: u32, last_col: u32, first_row: u32) -> Self {
        Self {
            first_col,
            last_col,
            first_row: Some(first_row),
            last_row: None,
        }
    }

    /// Whole columns, used as the table hint for appends
    pub fn columns(first_col: u32, last_col: u32) -> Self {
        Self {
            first_col,
            last_col,
            first_row: None,
            last_row: None,
        }
    }

    pub fn first_col(&self) -> u32 {
        self.first_col
    }

    pub fn last_col(&self) -> u32 {
        self.last_col
    }

    /// First row (one-based); whole-column ranges start at row 1
    pub fn first_row(&self) -> u32 {
        self.first_row.unwrap_or(1)
    }

    /// Last row (one-based), `None` when open-ended
    pub fn last_row(&self) -> Option<u32> {
        self.last_row
    }

    /// Prefix the range with a tab name, quoting it when required
    pub fn qualified(&self, tab: &str) -> String {
        format!("{}!{}", quote_tab(tab), self)
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", column_letters(self.first_col))?;
        if let Some(row) = self.first_row {
            write!(f, "{}", row)?;
        }
        write!(f, ":{}", column_letters(self.last_col))?;
        if let Some(row) = self.last_row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

/// Zero-based column index to letters (0 -> A, 25 -> Z, 26 -> AA)
pub fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Tab names that are not plain identifiers must be single-quoted
fn quote_tab(tab: &str) -> String {
    let plain = !tab.is_empty()
        && !tab.starts_with(|c: char| c.is_ascii_digit())
        && tab.chars().all(|c| c.is_alphanumeric() || c == '_');
    if plain {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}
