//! In-memory entry store
//!
//! Mirrors the Sheets-backed store's semantics without a network. Used by
//! tests and for dry runs of the notebook model.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use super::EntryStore;
use super::entry::{Entry, TempId};
use super::rows::next_temp_id;
use crate::error::{ApiError, StoreError};
use crate::sheets::Locator;

/// A journal row: id, date stamp, context, content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRow {
    pub id: TempId,
    pub stamp: String,
    pub context: String,
    pub content: String,
}

/// Counts of mutating calls, for asserting what a workflow sent
#[derive(Debug, Default)]
struct CallCounts {
    create: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    cleanup: AtomicUsize,
}

#[derive(Default)]
pub struct InMemoryEntryStore {
    tables: RwLock<HashMap<Locator, Vec<Entry>>>,
    journals: RwLock<HashMap<Locator, Vec<JournalRow>>>,
    offline: AtomicBool,
    calls: CallCounts,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a table's rows
    pub fn seed(&self, locator: &Locator, entries: Vec<Entry>) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.clone(), entries);
    }

    /// Current rows of a table, in sheet order
    pub fn entries(&self, locator: &Locator) -> Vec<Entry> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locator)
            .cloned()
            .unwrap_or_default()
    }

    pub fn journal(&self, locator: &Locator) -> Vec<JournalRow> {
        self.journals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(locator)
            .cloned()
            .unwrap_or_default()
    }

    /// While offline every operation fails like a dropped connection
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.calls.create.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.calls.update.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.delete.load(Ordering::SeqCst)
    }

    pub fn cleanup_calls(&self) -> usize {
        self.calls.cleanup.load(Ordering::SeqCst)
    }

    fn check_online(&self, write: bool) -> Result<(), StoreError> {
        if !self.offline.load(Ordering::SeqCst) {
            return Ok(());
        }
        let err = ApiError::Network("offline".to_string());
        Err(if write {
            StoreError::write(err)
        } else {
            StoreError::read(err)
        })
    }

    fn with_table<T>(&self, locator: &Locator, f: impl FnOnce(&mut Vec<Entry>) -> T) -> T {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        f(tables.entry(locator.clone()).or_default())
    }
}

impl EntryStore for InMemoryEntryStore {
    fn create(&self, locator: &Locator, context: &str, content: &str) -> Result<TempId, StoreError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.check_online(true)?;

        self.with_table(locator, |rows| {
            let next = next_temp_id(rows.iter().map(|e| e.temp_id))?;
            rows.push(Entry::new(next, context, content));
            Ok(next)
        })
    }

    fn read_all(&self, locator: &Locator) -> Result<Vec<Entry>, StoreError> {
        self.check_online(false)?;
        Ok(self.entries(locator))
    }

    fn update_by_id(
        &self,
        locator: &Locator,
        id: TempId,
        context: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        self.check_online(true)?;

        self.with_table(locator, |rows| {
            let row = rows
                .iter_mut()
                .find(|e| e.temp_id == id)
                .ok_or_else(|| StoreError::NotFound(format!("TempID {}", id)))?;
            row.context = context.to_string();
            row.content = content.to_string();
            Ok(())
        })
    }

    fn delete_by_id(&self, locator: &Locator, id: TempId) -> Result<(), StoreError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.check_online(true)?;

        self.with_table(locator, |rows| {
            let position = rows
                .iter()
                .position(|e| e.temp_id == id)
                .ok_or_else(|| StoreError::NotFound(format!("TempID {}", id)))?;
            rows.remove(position);
            Ok(())
        })
    }

    fn delete_empty_rows(&self, locator: &Locator) -> Result<usize, StoreError> {
        self.calls.cleanup.fetch_add(1, Ordering::SeqCst);
        self.check_online(true)?;

        Ok(self.with_table(locator, |rows| {
            let before = rows.len();
            rows.retain(|e| !e.is_blank());
            before - rows.len()
        }))
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
        self.check_online(true)?;

        let mut journals = self.journals.write().unwrap_or_else(PoisonError::into_inner);
        let rows = journals.entry(locator.clone()).or_default();
        let id = next_temp_id(rows.iter().map(|r| r.id))?;
        rows.push(JournalRow {
            id,
            stamp: super::sheet::journal_stamp(chrono::Local::now()),
            context: context.to_string(),
            content: content.to_string(),
        });
        Ok(id)
    }
}
