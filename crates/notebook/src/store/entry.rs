//! Entry model and its row encoding
//!
//! A remote row is `[TempID, Context, Content]`. [`Entry::from_row`] and
//! [`Entry::to_row`] are the only places that index cells by position.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Header row of the 3-column entry table
pub const ENTRY_HEADER: [&str; 3] = ["TempID", "Context", "Content"];

/// Header row of the 4-column journal table
pub const JOURNAL_HEADER: [&str; 4] = ["ID", "Date", "Context", "Content"];

/// Column of the id in both layouts
pub const COL_ID: u32 = 0;
/// Columns of the entry table
pub const COL_CONTEXT: u32 = 1;
pub const COL_CONTENT: u32 = 2;
/// Last column of the journal table
pub const COL_JOURNAL_LAST: u32 = 3;

/// Row identity within one sheet+tab, assigned as `max + 1` on create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempId(pub i64);

impl TempId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Only positive ids name persisted rows
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }

    /// Parse the id cell, `None` when it holds no leading integer
    pub fn parse(cell: &str) -> Option<Self> {
        parse_leading_int(cell).map(Self)
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TempId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i32> for TempId {
    fn from(id: i32) -> Self {
        Self(id.into())
    }
}

/// One persisted notebook entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub temp_id: TempId,
    pub context: String,
    pub content: String,
}

impl Entry {
    pub fn new(temp_id: impl Into<TempId>, context: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            temp_id: temp_id.into(),
            context: context.into(),
            content: content.into(),
        }
    }

    /// Decode a data row; unparsable ids become 0, missing cells empty
    pub fn from_row(row: &[String]) -> Self {
        let cell = |i: u32| row.get(i as usize).cloned().unwrap_or_default();
        Self {
            temp_id: row
                .get(COL_ID as usize)
                .and_then(|c| TempId::parse(c))
                .unwrap_or(TempId(0)),
            context: cell(COL_CONTEXT),
            content: cell(COL_CONTENT),
        }
    }

    /// Encode as an append-ready row
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.temp_id.0),
            Value::from(self.context.as_str()),
            Value::from(self.content.as_str()),
        ]
    }

    /// Both text fields are blank
    pub fn is_blank(&self) -> bool {
        self.context.trim().is_empty() && self.content.trim().is_empty()
    }
}

/// Integer prefix of a cell: optional whitespace, optional sign, digits
///
/// `" 12abc"` is 12 and `"1.9"` is 1; `"abc"` and `""` have none.
pub fn parse_leading_int(cell: &str) -> Option<i64> {
    let s = cell.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
