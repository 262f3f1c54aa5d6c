//! Google Sheets API integration
//!
//! This module provides:
//! - OAuth2 token acquisition and caching
//! - A replayable HTTP transport
//! - The four request shapes the entry store is built on (read range,
//!   write range, append row, structural row delete) plus tab metadata

mod auth;
mod client;
mod range;
mod transport;

pub use auth::{Callback, OAuthFlow, TokenGrant, TokenManager, TokenProvider, parse_callback, refresh_delay};
pub use client::{RowSpan, SheetsApi, SheetsClient, cell_to_string};
pub use range::{A1Range, column_letters};
pub use transport::{ApiRequest, Method, Transport, UreqTransport};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects one remote table: a spreadsheet and a tab within it
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub sheet_id: String,
    pub tab: String,
}

impl Locator {
    pub fn new(sheet_id: impl Into<String>, tab: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            tab: tab.into(),
        }
    }

    /// Both parts are filled in
    pub fn is_complete(&self) -> bool {
        !self.sheet_id.trim().is_empty() && !self.tab.trim().is_empty()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sheet_id, self.tab)
    }
}

/// Sheets API request and response types
pub mod api {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    /// Response from `values.get`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ValueRange {
        pub range: Option<String>,
        pub major_dimension: Option<String>,
        /// Absent when the range is empty
        pub values: Option<Vec<Vec<Value>>>,
    }

    /// Body for `values.update` and `values.append`
    #[derive(Debug, Serialize)]
    pub struct ValuesBody {
        pub values: Vec<Vec<Value>>,
    }

    /// Response from `spreadsheets.get?fields=sheets(properties(sheetId,title))`
    #[derive(Debug, Deserialize)]
    pub struct SpreadsheetMeta {
        pub sheets: Option<Vec<SheetMeta>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SheetMeta {
        pub properties: Option<SheetProperties>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SheetProperties {
        pub sheet_id: Option<i64>,
        pub title: Option<String>,
    }

    /// Body for `spreadsheets.batchUpdate`
    #[derive(Debug, Serialize)]
    pub struct BatchUpdate {
        pub requests: Vec<BatchRequest>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BatchRequest {
        pub delete_dimension: DeleteDimension,
    }

    #[derive(Debug, Serialize)]
    pub struct DeleteDimension {
        pub range: DimensionRange,
    }

    /// Grid indices are zero-based; `end_index` is exclusive
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DimensionRange {
        pub sheet_id: i64,
        pub dimension: &'static str,
        pub start_index: u32,
        pub end_index: u32,
    }
}
