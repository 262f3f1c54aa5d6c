//! Open tabs, split into the permanent and store sections
//!
//! The two sections are independent ordered lists. Display order is
//! perm ++ store, tabs never move between sections, and exactly one tab is
//! active at any time.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::editor::{DEFAULT_HISTORY_LIMIT, Split, TextEditor};
use crate::sheets::Locator;
use crate::store::{Entry, TempId};

/// Local-only tab identity, distinct from the remote TempID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which collection a tab belongs to, and so where it saves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// Curated entries from the permanent sheet
    Perm,
    /// Scratch entries
    Store,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Perm => "perm",
            Section::Store => "store",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perm" | "permanent" => Ok(Section::Perm),
            "store" => Ok(Section::Store),
            other => Err(format!("unknown section '{}'", other)),
        }
    }
}

/// Persistence state of a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
    /// Never persisted (no TempID)
    UnsavedNew,
    /// No local edits since the last successful save
    SavedClean,
    /// Persisted once, edited since
    Dirty,
}

/// Where a reorder drops the dragged tab relative to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub section: Section,
    pub temp_id: Option<TempId>,
    pub context: String,
    pub content: String,
    /// Table the tab was loaded from or last saved to
    pub locator: Option<Locator>,
    pub saved_ack: bool,
    editor: TextEditor,
}

impl Tab {
    fn new(id: TabId, section: Section, entry: Option<Entry>, locator: Option<Locator>, history_limit: usize) -> Self {
        let (temp_id, context, content) = match entry {
            Some(e) => (Some(e.temp_id), e.context, e.content),
            None => (None, String::new(), String::new()),
        };
        let editor = TextEditor::new(&context, &content).with_history_limit(history_limit);
        Self {
            id,
            section,
            temp_id,
            context,
            content,
            locator,
            saved_ack: false,
            editor,
        }
    }

    /// First non-blank line of the context, or "New Tab"
    pub fn label(&self) -> String {
        self.context
            .trim()
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("New Tab")
            .to_string()
    }

    pub fn state(&self) -> TabState {
        match (self.temp_id, self.saved_ack) {
            (None, _) => TabState::UnsavedNew,
            (Some(_), true) => TabState::SavedClean,
            (Some(_), false) => TabState::Dirty,
        }
    }

    /// Whether there is any non-blank content; a context alone does not count
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    pub fn editor(&self) -> &TextEditor {
        &self.editor
    }

    /// Replace the buffer; returns false when nothing changed
    pub fn edit(&mut self, text: &str) -> bool {
        if self.editor.text() == text {
            return false;
        }
        let split = self.editor.set_text(text);
        self.apply(split);
        true
    }

    pub fn undo(&mut self) -> bool {
        match self.editor.undo() {
            Some(split) => {
                self.apply(split);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.editor.redo() {
            Some(split) => {
                self.apply(split);
                true
            }
            None => false,
        }
    }

    /// Empty the buffer after its text was submitted elsewhere
    pub fn clear(&mut self) {
        let split = self.editor.clear();
        self.apply(split);
    }

    /// Record a successful save
    pub fn mark_saved(&mut self, temp_id: TempId, locator: &Locator) {
        self.temp_id = Some(temp_id);
        self.locator = Some(locator.clone());
        self.saved_ack = true;
    }

    fn apply(&mut self, split: Split) {
        self.context = split.context;
        self.content = split.content;
        self.saved_ack = false;
    }
}

/// The open tabs of a notebook
#[derive(Debug)]
pub struct TabSet {
    perm: Vec<Tab>,
    store: Vec<Tab>,
    index: HashMap<TabId, (Section, usize)>,
    active: TabId,
    next_id: u64,
    history_limit: usize,
}

impl Default for TabSet {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl TabSet {
    /// A set holding one blank, active store tab
    pub fn new(history_limit: usize) -> Self {
        let first = TabId(1);
        let mut set = Self {
            perm: Vec::new(),
            store: vec![Tab::new(first, Section::Store, None, None, history_limit)],
            index: HashMap::new(),
            active: first,
            next_id: 2,
            history_limit,
        };
        set.reindex();
        set
    }

    fn allocate_id(&mut self) -> TabId {
        let id = TabId(self.next_id);
        self.next_id += 1;
        id
    }

    fn list(&self, section: Section) -> &Vec<Tab> {
        match section {
            Section::Perm => &self.perm,
            Section::Store => &self.store,
        }
    }

    fn list_mut(&mut self, section: Section) -> &mut Vec<Tab> {
        match section {
            Section::Perm => &mut self.perm,
            Section::Store => &mut self.store,
        }
    }

    fn reindex(&mut self) {
        let mut index = HashMap::with_capacity(self.len());
        for section in [Section::Perm, Section::Store] {
            for (pos, tab) in self.list(section).iter().enumerate() {
                index.insert(tab.id, (section, pos));
            }
        }
        self.index = index;
        #[cfg(debug_assertions)]
        self.assert_invariants();
    }

    /// Append a blank store tab and make it active
    pub fn add_blank(&mut self) -> TabId {
        let id = self.allocate_id();
        self.store
            .push(Tab::new(id, Section::Store, None, None, self.history_limit));
        self.reindex();
        self.active = id;
        id
    }

    /// Open a tab seeded from a remote entry, without activating it
    pub fn open(&mut self, section: Section, entry: Entry, locator: Locator, at_front: bool) -> TabId {
        let id = self.allocate_id();
        let tab = Tab::new(id, section, Some(entry), Some(locator), self.history_limit);
        let list = self.list_mut(section);
        if at_front {
            list.insert(0, tab);
        } else {
            list.push(tab);
        }
        self.reindex();
        id
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        let &(section, pos) = self.index.get(&id)?;
        self.list(section).get(pos)
    }

    pub fn get_mut(&mut self, id: TabId) -> Option<&mut Tab> {
        let &(section, pos) = self.index.get(&id)?;
        self.list_mut(section).get_mut(pos)
    }

    pub fn position(&self, id: TabId) -> Option<(Section, usize)> {
        self.index.get(&id).copied()
    }

    pub fn active_id(&self) -> TabId {
        self.active
    }

    pub fn active(&self) -> &Tab {
        // The invariants guarantee the active id is indexed
        self.get(self.active)
            .or_else(|| self.iter().next())
            .expect("tab set is never empty")
    }

    /// Make a tab active; false if it is not open
    pub fn activate(&mut self, id: TabId) -> bool {
        if !self.index.contains_key(&id) {
            return false;
        }
        self.active = id;
        true
    }

    pub fn section(&self, section: Section) -> &[Tab] {
        self.list(section)
    }

    /// All tabs in display order (perm first, then store)
    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.perm.iter().chain(self.store.iter())
    }

    /// Tab at a display position
    pub fn nth(&self, n: usize) -> Option<&Tab> {
        self.iter().nth(n)
    }

    pub fn len(&self) -> usize {
        self.perm.len() + self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tab in `section` carrying this TempID
    pub fn find_by_temp_id(&self, section: Section, temp_id: TempId) -> Option<TabId> {
        self.list(section)
            .iter()
            .find(|t| t.temp_id == Some(temp_id))
            .map(|t| t.id)
    }

    /// Remove a tab, moving the active marker to a neighbour if needed
    ///
    /// The last remaining tab cannot be removed.
    pub fn remove(&mut self, id: TabId) -> Option<Tab> {
        let (section, pos) = self.position(id)?;
        if self.len() <= 1 {
            return None;
        }

        let order: Vec<TabId> = self.iter().map(|t| t.id).collect();
        let idx = order.iter().position(|&t| t == id)?;
        let neighbour = if idx > 0 { order[idx - 1] } else { order[1] };

        let tab = self.list_mut(section).remove(pos);
        if self.active == id {
            self.active = neighbour;
        }
        self.reindex();
        Some(tab)
    }

    /// Move `dragged` next to `target`; both must be in the same section
    pub fn reorder(&mut self, dragged: TabId, target: TabId, placement: Placement) -> bool {
        let (Some((from_section, from)), Some((to_section, target_pos))) =
            (self.position(dragged), self.position(target))
        else {
            return false;
        };
        if from_section != to_section {
            return false;
        }

        let mut to = match placement {
            Placement::Before => target_pos,
            Placement::After => target_pos + 1,
        };
        if from < to {
            to -= 1;
        }
        if from == to {
            return true;
        }

        let list = self.list_mut(from_section);
        let tab = list.remove(from);
        list.insert(to, tab);
        self.reindex();
        true
    }

    /// Panic unless the set is internally consistent
    ///
    /// Checks: at least one tab, no duplicate ids, every tab indexed at its
    /// real position with the right section, the active id present.
    pub fn assert_invariants(&self) {
        assert!(self.len() >= 1, "tab set must never be empty");
        assert_eq!(self.index.len(), self.len(), "duplicate or stale tab ids");
        for section in [Section::Perm, Section::Store] {
            for (pos, tab) in self.list(section).iter().enumerate() {
                assert_eq!(tab.section, section, "tab {} in wrong section", tab.id);
                assert_eq!(
                    self.index.get(&tab.id),
                    Some(&(section, pos)),
                    "tab {} mis-indexed",
                    tab.id
                );
            }
        }
        assert!(
            self.index.contains_key(&self.active),
            "active tab {} is not open",
            self.active
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> Locator {
        Locator::new("s", "t")
    }

    fn ids(set: &TabSet, section: Section) -> Vec<TabId> {
        set.section(section).iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_starts_with_one_blank_store_tab() {
        let set = TabSet::default();
        set.assert_invariants();
        assert_eq!(set.len(), 1);
        assert_eq!(set.active().section, Section::Store);
        assert_eq!(set.active().state(), TabState::UnsavedNew);
        assert_eq!(set.active().label(), "New Tab");
    }

    #[test]
    fn test_add_blank_activates() {
        let mut set = TabSet::default();
        let id = set.add_blank();
        assert_eq!(set.active_id(), id);
        assert_eq!(set.position(id), Some((Section::Store, 1)));
        set.assert_invariants();
    }

    #[test]
    fn test_open_front_and_back() {
        let mut set = TabSet::default();
        let a = set.open(Section::Perm, Entry::new(1, "a", ""), loc(), true);
        let b = set.open(Section::Perm, Entry::new(2, "b", ""), loc(), true);
        let c = set.open(Section::Perm, Entry::new(3, "c", ""), loc(), false);
        assert_eq!(ids(&set, Section::Perm), vec![b, a, c]);
        // Perm tabs come first in display order
        assert_eq!(set.nth(0).unwrap().id, b);
        set.assert_invariants();
    }

    #[test]
    fn test_remove_last_tab_refused() {
        let mut set = TabSet::default();
        let only = set.active_id();
        assert!(set.remove(only).is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_moves_active_to_previous() {
        let mut set = TabSet::default();
        let first = set.active_id();
        let second = set.add_blank();
        let third = set.add_blank();

        set.activate(third);
        set.remove(third).unwrap();
        assert_eq!(set.active_id(), second);

        set.activate(first);
        set.remove(first).unwrap();
        // Closing the first tab activates the next one
        assert_eq!(set.active_id(), second);
        set.assert_invariants();
    }

    #[test]
    fn test_remove_inactive_keeps_active() {
        let mut set = TabSet::default();
        let first = set.active_id();
        let second = set.add_blank();
        set.activate(first);
        set.remove(second).unwrap();
        assert_eq!(set.active_id(), first);
    }

    #[test]
    fn test_reorder_within_section() {
        let mut set = TabSet::default();
        let a = set.active_id();
        let b = set.add_blank();
        let c = set.add_blank();

        assert!(set.reorder(a, c, Placement::After));
        assert_eq!(ids(&set, Section::Store), vec![b, c, a]);

        assert!(set.reorder(a, b, Placement::Before));
        assert_eq!(ids(&set, Section::Store), vec![a, b, c]);

        // Dropping onto itself is a no-op
        assert!(set.reorder(b, b, Placement::Before));
        assert_eq!(ids(&set, Section::Store), vec![a, b, c]);
        set.assert_invariants();
    }

    #[test]
    fn test_index_follows_both_sections() {
        let mut set = TabSet::default();
        let s0 = set.active_id();
        let p1 = set.open(Section::Perm, Entry::new(1, "p1", ""), loc(), false);
        let p0 = set.open(Section::Perm, Entry::new(2, "p0", ""), loc(), true);
        let s1 = set.add_blank();

        assert_eq!(set.position(p0), Some((Section::Perm, 0)));
        assert_eq!(set.position(p1), Some((Section::Perm, 1)));
        assert_eq!(set.position(s0), Some((Section::Store, 0)));
        assert_eq!(set.position(s1), Some((Section::Store, 1)));

        set.remove(p0);
        assert_eq!(set.position(p0), None);
        assert_eq!(set.position(p1), Some((Section::Perm, 0)));
        assert_eq!(set.position(s1), Some((Section::Store, 1)));
        set.assert_invariants();
    }

    #[test]
    fn test_reorder_across_sections_refused() {
        let mut set = TabSet::default();
        let store_tab = set.active_id();
        let perm_tab = set.open(Section::Perm, Entry::new(1, "p", ""), loc(), true);

        assert!(!set.reorder(store_tab, perm_tab, Placement::Before));
        assert_eq!(set.position(store_tab), Some((Section::Store, 0)));
        assert_eq!(set.position(perm_tab), Some((Section::Perm, 0)));
    }

    #[test]
    fn test_label_uses_first_context_line() {
        let mut set = TabSet::default();
        let id = set.open(Section::Store, Entry::new(1, "\n  \n Title line \nmore", "x"), loc(), false);
        assert_eq!(set.get(id).unwrap().label(), "Title line");
    }

    #[test]
    fn test_edit_clears_saved_ack() {
        let mut set = TabSet::default();
        let id = set.open(Section::Store, Entry::new(4, "c", "d"), loc(), false);
        let tab = set.get_mut(id).unwrap();
        tab.mark_saved(TempId(4), &loc());
        assert_eq!(tab.state(), TabState::SavedClean);

        assert!(!tab.edit("c\n---\nd"));
        assert_eq!(tab.state(), TabState::SavedClean);

        assert!(tab.edit("c\n---\nd2"));
        assert_eq!(tab.content, "d2");
        assert_eq!(tab.state(), TabState::Dirty);
    }

    #[test]
    fn test_undo_redo_update_fields() {
        let mut set = TabSet::default();
        let tab = set.get_mut(set.active_id()).unwrap();
        tab.edit("ctx\n---\none");
        tab.edit("ctx\n---\ntwo");
        assert!(tab.undo());
        assert_eq!(tab.content, "one");
        assert!(tab.redo());
        assert_eq!(tab.content, "two");
        assert!(!tab.redo());
    }

    #[test]
    fn test_section_parse() {
        assert_eq!("perm".parse::<Section>(), Ok(Section::Perm));
        assert_eq!("Permanent".parse::<Section>(), Ok(Section::Perm));
        assert_eq!("store".parse::<Section>(), Ok(Section::Store));
        assert!("other".parse::<Section>().is_err());
    }
}
