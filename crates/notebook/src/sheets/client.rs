//! Sheets API HTTP client
//!
//! [`SheetsApi`] is the seam the entry store is written against; [`SheetsClient`]
//! implements it over HTTP with bearer tokens from a [`TokenManager`].

use log::debug;
use serde_json::Value;
use std::sync::Arc;

use super::api::{
    BatchRequest, BatchUpdate, DeleteDimension, DimensionRange, SpreadsheetMeta, ValueRange,
    ValuesBody,
};
use super::{A1Range, ApiRequest, Locator, TokenManager, Transport};
use crate::error::ApiError;

/// Rows to delete, as zero-based grid indices with an exclusive end
///
/// Grid row 0 is the header; the first data row is grid row 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub start: u32,
    pub end: u32,
}

impl RowSpan {
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The remote table operations the entry store needs
pub trait SheetsApi: Send + Sync {
    /// Read a range; cells come back as strings, trailing empty cells omitted
    fn read_range(&self, locator: &Locator, range: A1Range) -> Result<Vec<Vec<String>>, ApiError>;

    /// Overwrite a range with raw values
    fn write_range(
        &self,
        locator: &Locator,
        range: A1Range,
        rows: Vec<Vec<Value>>,
    ) -> Result<(), ApiError>;

    /// Append one row after the last row of the table in `range`
    fn append_row(&self, locator: &Locator, range: A1Range, row: Vec<Value>) -> Result<(), ApiError>;

    /// Numeric id of the locator's tab, `None` if no tab has that title
    fn sheet_gid(&self, locator: &Locator) -> Result<Option<i64>, ApiError>;

    /// Delete whole rows, applying `spans` in the given order in one batch
    fn delete_rows(&self, locator: &Locator, gid: i64, spans: &[RowSpan]) -> Result<(), ApiError>;
}

/// Render a cell value the way the Sheets UI shows it
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Sheets API client
pub struct SheetsClient {
    tokens: Arc<TokenManager>,
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl SheetsClient {
    /// Sheets API base URL
    const BASE_URL: &'static str = "https://sheets.googleapis.com/v4/spreadsheets";

    pub fn new(tokens: Arc<TokenManager>, transport: Arc<dyn Transport>) -> Self {
        Self {
            tokens,
            transport,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    fn values_url(&self, locator: &Locator, range: A1Range) -> String {
        format!(
            "{}/{}/values/{}",
            self.base_url,
            urlencoding::encode(&locator.sheet_id),
            urlencoding::encode(&range.qualified(&locator.tab))
        )
    }

    fn fetch(&self, request: ApiRequest) -> Result<Value, ApiError> {
        debug!("{:?} {}", request.method, request.url);
        self.tokens
            .authenticated_fetch(self.transport.as_ref(), &request)
    }

    fn values_body(rows: Vec<Vec<Value>>) -> Result<Value, ApiError> {
        serde_json::to_value(ValuesBody { values: rows }).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl SheetsApi for SheetsClient {
    fn read_range(&self, locator: &Locator, range: A1Range) -> Result<Vec<Vec<String>>, ApiError> {
        let response = self.fetch(ApiRequest::get(self.values_url(locator, range)))?;
        let values: ValueRange =
            serde_json::from_value(response).map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(values
            .values
            .unwrap_or_default()
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    fn write_range(
        &self,
        locator: &Locator,
        range: A1Range,
        rows: Vec<Vec<Value>>,
    ) -> Result<(), ApiError> {
        let url = format!("{}?valueInputOption=RAW", self.values_url(locator, range));
        self.fetch(ApiRequest::put(url, Self::values_body(rows)?))?;
        Ok(())
    }

    fn append_row(&self, locator: &Locator, range: A1Range, row: Vec<Value>) -> Result<(), ApiError> {
        let url = format!(
            "{}:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS",
            self.values_url(locator, range)
        );
        self.fetch(ApiRequest::post(url, Self::values_body(vec![row])?))?;
        Ok(())
    }

    fn sheet_gid(&self, locator: &Locator) -> Result<Option<i64>, ApiError> {
        let url = format!(
            "{}/{}?fields={}",
            self.base_url,
            urlencoding::encode(&locator.sheet_id),
            urlencoding::encode("sheets(properties(sheetId,title))")
        );
        let response = self.fetch(ApiRequest::get(url))?;
        let meta: SpreadsheetMeta =
            serde_json::from_value(response).map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(meta
            .sheets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sheet| sheet.properties)
            .find(|props| props.title.as_deref() == Some(locator.tab.as_str()))
            .and_then(|props| props.sheet_id))
    }

    fn delete_rows(&self, locator: &Locator, gid: i64, spans: &[RowSpan]) -> Result<(), ApiError> {
        let body = BatchUpdate {
            requests: spans
                .iter()
                .map(|span| BatchRequest {
                    delete_dimension: DeleteDimension {
                        range: DimensionRange {
                            sheet_id: gid,
                            dimension: "ROWS",
                            start_index: span.start,
                            end_index: span.end,
                        },
                    },
                })
                .collect(),
        };
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let url = format!(
            "{}/{}:batchUpdate",
            self.base_url,
            urlencoding::encode(&locator.sheet_id)
        );
        self.fetch(ApiRequest::post(url, body))?;
        Ok(())
    }
}
