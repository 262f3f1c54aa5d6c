//! Entry store abstraction and implementations
//!
//! An entry store performs CRUD on the rows of one sheet+tab, addressed by a
//! [`Locator`](crate::sheets::Locator). The trait-based design lets the tab
//! model run against the Sheets-backed store or the in-memory one.

mod entry;
mod memory;
mod rows;
mod sheet;

pub use entry::{
    COL_CONTENT, COL_CONTEXT, COL_ID, ENTRY_HEADER, Entry, JOURNAL_HEADER, TempId,
    parse_leading_int,
};
pub use memory::{InMemoryEntryStore, JournalRow};
pub use rows::{blank_rows, find_row, merge_into_spans, next_temp_id};
pub use sheet::{JOURNAL_STAMP_FORMAT, SheetEntryStore, journal_stamp};

use crate::error::StoreError;
use crate::sheets::Locator;

/// CRUD operations against one remote table
pub trait EntryStore: Send + Sync {
    /// Ensure the header, assign `max(existing ids) + 1` and append the row
    fn create(&self, locator: &Locator, context: &str, content: &str) -> Result<TempId, StoreError>;

    /// All data rows in sheet order
    fn read_all(&self, locator: &Locator) -> Result<Vec<Entry>, StoreError>;

    /// Overwrite context and content of the first row with this id
    fn update_by_id(
        &self,
        locator: &Locator,
        id: TempId,
        context: &str,
        content: &str,
    ) -> Result<(), StoreError>;

    /// Remove the row with this id entirely, leaving no blank row
    fn delete_by_id(&self, locator: &Locator, id: TempId) -> Result<(), StoreError>;

    /// Remove every row whose context and content are blank, returning how many
    fn delete_empty_rows(&self, locator: &Locator) -> Result<usize, StoreError>;

    /// Append a dated row to a 4-column journal table
    fn append_journal(
        &self,
        locator: &Locator,
        context: &str,
        content: &str,
    ) -> Result<TempId, StoreError>;
}
