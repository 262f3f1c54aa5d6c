//! The notebook: tabs reconciled against two remote tables
//!
//! Every remote call here is forgiving. A failure is logged, reported
//! through the [`Notifier`] and turned into a sentinel outcome; nothing
//! propagates to the caller.

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use super::notify::{LogNotifier, Notice, Notifier};
use super::picker::Picker;
use super::tabs::{Placement, Section, Tab, TabId, TabSet};
use super::task::{BackgroundTask, spawn_cleanup};
use crate::editor::DEFAULT_HISTORY_LIMIT;
use crate::error::StoreError;
use crate::sheets::Locator;
use crate::store::{Entry, EntryStore, TempId};

/// What a save does when updating an existing row fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFallback {
    /// Create a new row whatever the failure was
    #[default]
    CreateOnAnyFailure,
    /// Create a new row only when the old one is gone
    CreateOnNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Updated(TempId),
    /// A new row was created, either first save or update fallback
    Created(TempId),
    /// Never persisted and no content; nothing was sent
    Skipped,
    Failed,
    UnknownTab,
}

impl SaveOutcome {
    pub fn temp_id(&self) -> Option<TempId> {
        match self {
            SaveOutcome::Updated(id) | SaveOutcome::Created(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum CloseOutcome {
    /// Tab removed; the save result and the blank-row cleanup it started
    Closed {
        saved: SaveOutcome,
        cleanup: BackgroundTask,
    },
    /// The only open tab is never closed
    LastTab,
    UnknownTab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// The entry was already open; that tab is now active
    Focused(TabId),
    Opened(TabId),
    /// Sentinel, invalid row, bad index or no picker
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(TempId),
    /// Nothing to submit
    Empty,
    Failed,
    UnknownTab,
}

pub struct Notebook {
    store: Arc<dyn EntryStore>,
    notifier: Arc<dyn Notifier>,
    store_locator: Locator,
    perm_locator: Locator,
    fallback: UpdateFallback,
    tabs: TabSet,
    picker: Option<Picker>,
}

impl Notebook {
    pub fn new(store: Arc<dyn EntryStore>, store_locator: Locator, perm_locator: Locator) -> Self {
        Self {
            store,
            notifier: Arc::new(LogNotifier),
            store_locator,
            perm_locator,
            fallback: UpdateFallback::default(),
            tabs: TabSet::new(DEFAULT_HISTORY_LIMIT),
            picker: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_update_fallback(mut self, fallback: UpdateFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Resets the tabs, so call before any editing
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.tabs = TabSet::new(limit);
        self
    }

    pub fn tabs(&self) -> &TabSet {
        &self.tabs
    }

    pub fn active(&self) -> &Tab {
        self.tabs.active()
    }

    pub fn locator(&self, section: Section) -> &Locator {
        match section {
            Section::Perm => &self.perm_locator,
            Section::Store => &self.store_locator,
        }
    }

    pub fn picker(&self) -> Option<&Picker> {
        self.picker.as_ref()
    }

    fn report(&self, action: &str, err: &StoreError) {
        error!("{}: {}", action, err);
        self.notifier.notify(Notice::error(format!("{}: {}", action, err)));
    }

    fn export(&self, locator: &Locator) -> Option<Vec<Entry>> {
        match self.store.read_all(locator) {
            Ok(entries) => Some(entries),
            Err(e) => {
                self.report(&format!("Failed to load {}", locator), &e);
                None
            }
        }
    }

    // Tab bar

    /// New blank store tab, made active
    pub fn add_tab(&mut self) -> TabId {
        self.tabs.add_blank()
    }

    pub fn activate(&mut self, id: TabId) -> bool {
        self.tabs.activate(id)
    }

    /// Drag `dragged` before or after `target` within its section
    pub fn move_tab(&mut self, dragged: TabId, target: TabId, placement: Placement) -> bool {
        let moved = self.tabs.reorder(dragged, target, placement);
        if !moved {
            debug!("Refused to move tab {} next to {}", dragged, target);
        }
        moved
    }

    // Editing

    pub fn edit(&mut self, id: TabId, text: &str) -> bool {
        self.tabs.get_mut(id).is_some_and(|tab| tab.edit(text))
    }

    pub fn edit_active(&mut self, text: &str) -> bool {
        self.edit(self.tabs.active_id(), text)
    }

    pub fn undo(&mut self, id: TabId) -> bool {
        self.tabs.get_mut(id).is_some_and(Tab::undo)
    }

    pub fn redo(&mut self, id: TabId) -> bool {
        self.tabs.get_mut(id).is_some_and(Tab::redo)
    }

    // Persistence

    /// Persist a tab: update its row, falling back to creating one
    pub fn save(&mut self, id: TabId) -> SaveOutcome {
        let Some(tab) = self.tabs.get(id) else {
            return SaveOutcome::UnknownTab;
        };
        if tab.temp_id.is_none() && !tab.has_content() {
            debug!("Tab {} has no content and was never saved, skipping save", id);
            return SaveOutcome::Skipped;
        }

        let locator = self.locator(tab.section).clone();
        let (existing, context, content) = (tab.temp_id, tab.context.clone(), tab.content.clone());

        let mut replaced = None;
        if let Some(existing) = existing {
            match self.store.update_by_id(&locator, existing, &context, &content) {
                Ok(()) => {
                    self.mark_saved(id, existing, &locator);
                    return SaveOutcome::Updated(existing);
                }
                Err(e) => {
                    let fall_back = match self.fallback {
                        UpdateFallback::CreateOnAnyFailure => true,
                        UpdateFallback::CreateOnNotFound => e.is_not_found(),
                    };
                    if !fall_back {
                        self.report("Failed to save entry", &e);
                        return SaveOutcome::Failed;
                    }
                    warn!(
                        "Update of entry {} in {} failed ({}), creating a new row",
                        existing, locator, e
                    );
                    replaced = Some(existing);
                }
            }
        }

        match self.store.create(&locator, &context, &content) {
            Ok(new_id) => {
                self.mark_saved(id, new_id, &locator);
                if let Some(old) = replaced {
                    self.notifier.notify(Notice::warning(format!(
                        "Entry {} could not be updated; saved as entry {}",
                        old, new_id
                    )));
                }
                SaveOutcome::Created(new_id)
            }
            Err(e) => {
                self.report("Failed to save entry", &e);
                SaveOutcome::Failed
            }
        }
    }

    pub fn save_active(&mut self) -> SaveOutcome {
        self.save(self.tabs.active_id())
    }

    fn mark_saved(&mut self, id: TabId, temp_id: TempId, locator: &Locator) {
        if let Some(tab) = self.tabs.get_mut(id) {
            tab.mark_saved(temp_id, locator);
        }
    }

    /// Save then remove a tab, starting a blank-row cleanup of its table
    pub fn close(&mut self, id: TabId) -> CloseOutcome {
        let Some(tab) = self.tabs.get(id) else {
            return CloseOutcome::UnknownTab;
        };
        if self.tabs.len() == 1 {
            return CloseOutcome::LastTab;
        }
        let section = tab.section;

        let saved = self.save(id);
        self.tabs.remove(id);

        let cleanup = spawn_cleanup(self.store.clone(), self.locator(section).clone());
        CloseOutcome::Closed { saved, cleanup }
    }

    /// Open a tab for every store row not already open; returns how many
    pub fn load_store(&mut self) -> usize {
        let locator = self.store_locator.clone();
        let Some(entries) = self.export(&locator) else {
            return 0;
        };

        let mut open: HashSet<TempId> = self
            .tabs
            .section(Section::Store)
            .iter()
            .filter_map(|t| t.temp_id)
            .filter(TempId::is_valid)
            .collect();

        let mut added = 0;
        for entry in entries {
            if !entry.temp_id.is_valid() || !open.insert(entry.temp_id) {
                continue;
            }
            self.tabs.open(Section::Store, entry, locator.clone(), false);
            added += 1;
        }
        debug!("Opened {} store tabs from {}", added, locator);
        added
    }

    /// Read the permanent table into the picker; returns the row count
    pub fn load_permanent(&mut self) -> usize {
        let locator = self.perm_locator.clone();
        let entries = self.export(&locator).unwrap_or_default();
        let count = entries.len();
        self.picker = Some(Picker::open(entries));
        count
    }

    pub fn set_picker_query(&mut self, query: &str) -> bool {
        match self.picker.as_mut() {
            Some(picker) => {
                picker.set_query(query);
                true
            }
            None => false,
        }
    }

    pub fn cancel_picker(&mut self) {
        self.picker = None;
    }

    /// Act on the picker row at `index` of the filtered list; always closes the picker
    pub fn pick(&mut self, index: usize) -> PickOutcome {
        let Some(picker) = self.picker.take() else {
            return PickOutcome::Ignored;
        };
        let Some(entry) = picker.select(index).cloned() else {
            return PickOutcome::Ignored;
        };
        if !entry.temp_id.is_valid() {
            return PickOutcome::Ignored;
        }

        if let Some(existing) = self.tabs.find_by_temp_id(Section::Perm, entry.temp_id) {
            self.tabs.activate(existing);
            return PickOutcome::Focused(existing);
        }

        let id = self
            .tabs
            .open(Section::Perm, entry, self.perm_locator.clone(), true);
        self.tabs.activate(id);
        PickOutcome::Opened(id)
    }

    /// Append a tab's text to a journal table and clear the tab
    pub fn submit(&mut self, id: TabId, target: &Locator) -> SubmitOutcome {
        let Some(tab) = self.tabs.get(id) else {
            return SubmitOutcome::UnknownTab;
        };
        let Some(split) = tab.editor().submission() else {
            return SubmitOutcome::Empty;
        };

        match self
            .store
            .append_journal(target, &split.context, &split.content)
        {
            Ok(journal_id) => {
                if let Some(tab) = self.tabs.get_mut(id) {
                    tab.clear();
                }
                self.notifier
                    .notify(Notice::info(format!("Submitted to {}", target)));
                SubmitOutcome::Submitted(journal_id)
            }
            Err(e) => {
                self.report("Submit failed", &e);
                SubmitOutcome::Failed
            }
        }
    }

    pub fn submit_active(&mut self, target: &Locator) -> SubmitOutcome {
        self.submit(self.tabs.active_id(), target)
    }

    /// Delete the tab's remote row; the tab stays open as unsaved
    pub fn delete_entry(&mut self, id: TabId) -> bool {
        let Some(tab) = self.tabs.get(id) else {
            return false;
        };
        let Some(temp_id) = tab.temp_id else {
            return false;
        };
        let locator = self.locator(tab.section).clone();

        match self.store.delete_by_id(&locator, temp_id) {
            Ok(()) => {
                if let Some(tab) = self.tabs.get_mut(id) {
                    tab.temp_id = None;
                    tab.saved_ack = false;
                }
                self.notifier
                    .notify(Notice::info(format!("Deleted entry {} from {}", temp_id, locator)));
                true
            }
            Err(e) => {
                self.report("Delete failed", &e);
                false
            }
        }
    }

    /// Remove blank rows from a section's table now; returns how many
    pub fn clean(&mut self, section: Section) -> usize {
        let locator = self.locator(section).clone();
        match self.store.delete_empty_rows(&locator) {
            Ok(n) => n,
            Err(e) => {
                self.report("Cleanup failed", &e);
                0
            }
        }
    }
}
