//! Entry store backed by a Google Sheets tab
//!
//! Every operation is a short sequence of independent requests (header
//! check, id scan, write). Nothing here is atomic: two clients creating at
//! the same moment can compute the same next id.

use chrono::{DateTime, Local};
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

use super::entry::{
    COL_CONTENT, COL_CONTEXT, COL_ID, COL_JOURNAL_LAST, ENTRY_HEADER, Entry, JOURNAL_HEADER, TempId,
};
use super::rows::{
    blank_rows, find_row, ids_in, merge_into_spans, next_temp_id, sheet_row, single_row_span,
};
use super::EntryStore;
use crate::error::StoreError;
use crate::sheets::{A1Range, Locator, SheetsApi};

/// Format of the journal's Date column: `HHMM.DD.MM.YY`
pub const JOURNAL_STAMP_FORMAT: &str = "%H%M.%d.%m.%y";

pub fn journal_stamp(at: DateTime<Local>) -> String {
    at.format(JOURNAL_STAMP_FORMAT).to_string()
}

/// [`EntryStore`] over the Sheets API
pub struct SheetEntryStore {
    api: Arc<dyn SheetsApi>,
}

impl SheetEntryStore {
    pub fn new(api: Arc<dyn SheetsApi>) -> Self {
        Self { api }
    }

    /// Write `header` to row 1 unless it is already there
    ///
    /// An unreadable header row is treated as absent.
    fn ensure_header(&self, locator: &Locator, header: &[&str]) -> Result<(), StoreError> {
        let last_col = header.len() as u32 - 1;
        let range = A1Range::row(COL_ID, last_col, 1);

        let current = match self.api.read_range(locator, range) {
            Ok(rows) => rows.into_iter().next().unwrap_or_default(),
            Err(e) => {
                debug!("Could not read header of {}: {}", locator, e);
                Vec::new()
            }
        };
        if current.iter().map(String::as_str).eq(header.iter().copied()) {
            return Ok(());
        }

        info!("Writing header row to {}", locator);
        let row = header.iter().map(|h| Value::from(*h)).collect();
        self.api
            .write_range(locator, range, vec![row])
            .map_err(StoreError::write)
    }

    /// The id column below the header
    fn read_ids(&self, locator: &Locator) -> Result<Vec<Vec<String>>, StoreError> {
        self.api
            .read_range(locator, A1Range::rows_from(COL_ID, COL_ID, 2))
            .map_err(StoreError::read)
    }

    /// Every data row, all three columns
    fn read_rows(&self, locator: &Locator) -> Result<Vec<Vec<String>>, StoreError> {
        self.api
            .read_range(locator, A1Range::rows_from(COL_ID, COL_CONTENT, 2))
            .map_err(StoreError::read)
    }

    fn locate(&self, locator: &Locator, id: TempId) -> Result<usize, StoreError> {
        let ids = self.read_ids(locator)?;
        find_row(&ids, id).ok_or_else(|| StoreError::NotFound(format!("TempID {}", id)))
    }

    fn gid(&self, locator: &Locator) -> Result<i64, StoreError> {
        self.api
            .sheet_gid(locator)
            .map_err(StoreError::read)?
            .ok_or_else(|| StoreError::NotFound(format!("tab '{}'", locator.tab)))
    }
}

impl EntryStore for SheetEntryStore {
    fn create(&self, locator: &Locator, context: &str, content: &str) -> Result<TempId, StoreError> {
        self.ensure_header(locator, &ENTRY_HEADER)?;

        let ids = self.read_ids(locator)?;
        let next = next_temp_id(ids_in(&ids))?;

        let entry = Entry::new(next, context, content);
        self.api
            .append_row(locator, A1Range::columns(COL_ID, COL_CONTENT), entry.to_row())
            .map_err(StoreError::write)?;

        info!("Created entry {} in {}", next, locator);
        Ok(next)
    }

    fn read_all(&self, locator: &Locator) -> Result<Vec<Entry>, StoreError> {
        let rows = self.read_rows(locator)?;
        debug!("Read {} rows from {}", rows.len(), locator);
        Ok(rows.iter().map(|row| Entry::from_row(row)).collect())
    }

    fn update_by_id(
        &self,
        locator: &Locator,
        id: TempId,
        context: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        self.ensure_header(locator, &ENTRY_HEADER)?;

        let position = self.locate(locator, id)?;
        let range = A1Range::row(COL_CONTEXT, COL_CONTENT, sheet_row(position));
        self.api
            .write_range(
                locator,
                range,
                vec![vec![Value::from(context), Value::from(content)]],
            )
            .map_err(StoreError::write)?;

        info!("Updated entry {} in {}", id, locator);
        Ok(())
    }

    fn delete_by_id(&self, locator: &Locator, id: TempId) -> Result<(), StoreError> {
        let position = self.locate(locator, id)?;
        let gid = self.gid(locator)?;

        self.api
            .delete_rows(locator, gid, &[single_row_span(position)])
            .map_err(StoreError::write)?;

        info!("Deleted entry {} from {}", id, locator);
        Ok(())
    }

    fn delete_empty_rows(&self, locator: &Locator) -> Result<usize, StoreError> {
        let rows = self.read_rows(locator)?;
        let blanks = blank_rows(&rows);
        if blanks.is_empty() {
            return Ok(0);
        }

        let gid = self.gid(locator)?;
        let spans = merge_into_spans(&blanks);
        self.api
            .delete_rows(locator, gid, &spans)
            .map_err(StoreError::write)?;

        info!(
            "Deleted {} empty rows ({} ranges) from {}",
            blanks.len(),
            spans.len(),
            locator
        );
        Ok(blanks.len())
    }

    fn append_journal(
        &self,
        locator: &Locator,
        context: &str,
        content: &str,
    ) -> Result<TempId, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::Validation("content is required".to_string()));
        }

        self.ensure_header(locator, &JOURNAL_HEADER)?;

        let ids = self.read_ids(locator)?;
        let next = next_temp_id(ids_in(&ids))?;
        let row = vec![
            Value::from(next.get()),
            Value::from(journal_stamp(Local::now())),
            Value::from(context),
            Value::from(content),
        ];
        self.api
            .append_row(locator, A1Range::columns(COL_ID, COL_JOURNAL_LAST), row)
            .map_err(StoreError::write)?;

        info!("Appended journal entry {} to {}", next, locator);
        Ok(next)
    }
}
