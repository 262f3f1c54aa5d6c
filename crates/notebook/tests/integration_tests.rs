//! Integration tests for the notebook crate
//!
//! These run the Sheets-backed entry store and the notebook model against
//! a fake spreadsheet that behaves like the Sheets values API.

use notebook::sheets::{A1Range, RowSpan, SheetsApi, cell_to_string};
use notebook::store::{ENTRY_HEADER, JOURNAL_HEADER};
use notebook::{
    ApiError, CloseOutcome, Entry, EntryStore, Locator, Notebook, NoticeQueue, PickOutcome,
    SaveOutcome, Section, SheetEntryStore, StoreError, SubmitOutcome, TempId,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One tab of the fake spreadsheet; row 0 is the header row
struct Grid {
    gid: i64,
    rows: Vec<Vec<String>>,
}

/// In-memory spreadsheet with the Sheets API's range semantics
#[derive(Default)]
struct FakeSheets {
    tabs: Mutex<HashMap<Locator, Grid>>,
    writes: AtomicUsize,
}

impl FakeSheets {
    fn with_tab(self, locator: &Locator, gid: i64, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        self.tabs
            .lock()
            .unwrap()
            .insert(locator.clone(), Grid { gid, rows });
        self
    }

    fn rows(&self, locator: &Locator) -> Vec<Vec<String>> {
        self.tabs.lock().unwrap()[locator].rows.clone()
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

fn trimmed(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

impl SheetsApi for FakeSheets {
    fn read_range(&self, locator: &Locator, range: A1Range) -> Result<Vec<Vec<String>>, ApiError> {
        let tabs = self.tabs.lock().unwrap();
        let grid = tabs.get(locator).ok_or(ApiError::Status(400))?;

        let first = range.first_row() as usize - 1;
        let last = range
            .last_row()
            .map_or(grid.rows.len(), |r| (r as usize).min(grid.rows.len()));
        let cols = range.first_col() as usize..=range.last_col() as usize;

        let mut out: Vec<Vec<String>> = grid
            .rows
            .get(first..last)
            .unwrap_or_default()
            .iter()
            .map(|row| {
                trimmed(
                    cols.clone()
                        .map(|c| row.get(c).cloned().unwrap_or_default())
                        .collect(),
                )
            })
            .collect();
        // Trailing empty rows are not returned
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    fn write_range(
        &self,
        locator: &Locator,
        range: A1Range,
        rows: Vec<Vec<Value>>,
    ) -> Result<(), ApiError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.get_mut(locator).ok_or(ApiError::Status(400))?;

        for (offset, values) in rows.into_iter().enumerate() {
            let r = range.first_row() as usize - 1 + offset;
            if grid.rows.len() <= r {
                grid.rows.resize(r + 1, Vec::new());
            }
            let row = &mut grid.rows[r];
            for (i, value) in values.iter().enumerate() {
                let c = range.first_col() as usize + i;
                if row.len() <= c {
                    row.resize(c + 1, String::new());
                }
                row[c] = cell_to_string(value);
            }
        }
        Ok(())
    }

    fn append_row(&self, locator: &Locator, _range: A1Range, row: Vec<Value>) -> Result<(), ApiError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.get_mut(locator).ok_or(ApiError::Status(400))?;

        let after = grid
            .rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1);
        grid.rows.truncate(after);
        grid.rows.push(row.iter().map(cell_to_string).collect());
        Ok(())
    }

    fn sheet_gid(&self, locator: &Locator) -> Result<Option<i64>, ApiError> {
        Ok(self.tabs.lock().unwrap().get(locator).map(|g| g.gid))
    }

    fn delete_rows(&self, locator: &Locator, gid: i64, spans: &[RowSpan]) -> Result<(), ApiError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.get_mut(locator).ok_or(ApiError::Status(400))?;
        assert_eq!(grid.gid, gid, "delete sent to the wrong tab");

        for span in spans {
            let end = (span.end as usize).min(grid.rows.len());
            let start = (span.start as usize).min(end);
            grid.rows.drain(start..end);
        }
        Ok(())
    }
}

fn scratch() -> Locator {
    Locator::new("sheet-1", "Scratch")
}

fn perm() -> Locator {
    Locator::new("sheet-1", "Saved Notes")
}

fn header() -> Vec<String> {
    ENTRY_HEADER.iter().map(|s| s.to_string()).collect()
}

fn ids(rows: &[Vec<String>]) -> Vec<String> {
    rows.iter().skip(1).map(|r| r[0].clone()).collect()
}

#[test]
fn test_create_writes_header_once_and_assigns_ids() {
    let sheets = Arc::new(FakeSheets::default().with_tab(&scratch(), 11, &[]));
    let store = SheetEntryStore::new(sheets.clone());

    assert_eq!(store.create(&scratch(), "ctx", "one").unwrap(), TempId(1));
    let writes_after_first = sheets.writes();
    assert_eq!(writes_after_first, 2);

    assert_eq!(store.create(&scratch(), "ctx", "two").unwrap(), TempId(2));
    // Header already present, so only the append
    assert_eq!(sheets.writes(), writes_after_first + 1);

    let rows = sheets.rows(&scratch());
    assert_eq!(rows[0], header());
    assert_eq!(ids(&rows), vec!["1", "2"]);
    assert_eq!(rows[2][2], "two");
}

#[test]
fn test_new_ids_exceed_every_existing_id() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[
            &["TempID", "Context", "Content"],
            &["7", "a", "b"],
            &["3", "c", "d"],
            &["junk", "e", "f"],
        ],
    ));
    let store = SheetEntryStore::new(sheets.clone());

    assert_eq!(store.create(&scratch(), "x", "y").unwrap(), TempId(8));
    store.delete_by_id(&scratch(), TempId(8)).unwrap();
    store.delete_by_id(&scratch(), TempId(3)).unwrap();
    assert_eq!(store.create(&scratch(), "x", "y").unwrap(), TempId(8));
}

#[test]
fn test_update_touches_only_target_row() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[
            &["TempID", "Context", "Content"],
            &["1", "a", "b"],
            &["2", "c", "d"],
        ],
    ));
    let store = SheetEntryStore::new(sheets.clone());

    store.update_by_id(&scratch(), TempId(2), "C", "D").unwrap();
    let rows = sheets.rows(&scratch());
    assert_eq!(rows[1], vec!["1", "a", "b"]);
    assert_eq!(rows[2], vec!["2", "C", "D"]);

    let err = store.update_by_id(&scratch(), TempId(9), "x", "y").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete_leaves_no_blank_row() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[
            &["TempID", "Context", "Content"],
            &["1", "a", "b"],
            &["2", "c", "d"],
            &["3", "e", "f"],
        ],
    ));
    let store = SheetEntryStore::new(sheets.clone());

    store.delete_by_id(&scratch(), TempId(2)).unwrap();
    let rows = sheets.rows(&scratch());
    assert_eq!(rows[0], header());
    assert_eq!(ids(&rows), vec!["1", "3"]);

    let listed: Vec<TempId> = store
        .read_all(&scratch())
        .unwrap()
        .into_iter()
        .map(|e| e.temp_id)
        .collect();
    assert_eq!(listed, vec![TempId(1), TempId(3)]);
}

#[test]
fn test_delete_on_missing_tab_is_not_found() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[&["TempID", "Context", "Content"], &["1", "a", "b"]],
    ));
    // Same sheet, but the ids are read from a tab the metadata does not list
    struct NoMetadata(Arc<FakeSheets>);
    impl SheetsApi for NoMetadata {
        fn read_range(&self, l: &Locator, r: A1Range) -> Result<Vec<Vec<String>>, ApiError> {
            self.0.read_range(l, r)
        }
        fn write_range(&self, l: &Locator, r: A1Range, v: Vec<Vec<Value>>) -> Result<(), ApiError> {
            self.0.write_range(l, r, v)
        }
        fn append_row(&self, l: &Locator, r: A1Range, v: Vec<Value>) -> Result<(), ApiError> {
            self.0.append_row(l, r, v)
        }
        fn sheet_gid(&self, _: &Locator) -> Result<Option<i64>, ApiError> {
            Ok(None)
        }
        fn delete_rows(&self, l: &Locator, g: i64, s: &[RowSpan]) -> Result<(), ApiError> {
            self.0.delete_rows(l, g, s)
        }
    }

    let store = SheetEntryStore::new(Arc::new(NoMetadata(sheets.clone())));
    let err = store.delete_by_id(&scratch(), TempId(1)).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref what) if what.contains("Scratch")));
    assert_eq!(sheets.rows(&scratch()).len(), 2);
}

#[test]
fn test_cleanup_removes_exactly_blank_rows() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[
            &["TempID", "Context", "Content"],
            &["1", "keep", "me"],
            &["2", "", " "],
            &["3", "  ", ""],
            &["4", "", "body only"],
            &["5"],
            &["6", "ctx only", ""],
        ],
    ));
    let store = SheetEntryStore::new(sheets.clone());

    assert_eq!(store.delete_empty_rows(&scratch()).unwrap(), 3);
    let rows = sheets.rows(&scratch());
    assert_eq!(rows[0], header());
    assert_eq!(ids(&rows), vec!["1", "4", "6"]);

    // Nothing left to clean: no structural request is sent
    let writes = sheets.writes();
    assert_eq!(store.delete_empty_rows(&scratch()).unwrap(), 0);
    assert_eq!(sheets.writes(), writes);
}

#[test]
fn test_cleanup_four_row_sheet() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[
            &["TempID", "Context", "Content"],
            &["1", "a", "b"],
            &["2", "", "  "],
            &["3", "", "x"],
            &["4", "", ""],
        ],
    ));
    let store = SheetEntryStore::new(sheets.clone());

    assert_eq!(store.delete_empty_rows(&scratch()).unwrap(), 2);
    let rows = sheets.rows(&scratch());
    assert_eq!(ids(&rows), vec!["1", "3"]);
    assert_eq!(rows[1][1], "a");
    assert_eq!(rows[2][2], "x");
}

#[test]
fn test_journal_append() {
    let journal = Locator::new("sheet-2", "Journal");
    let sheets = Arc::new(FakeSheets::default().with_tab(&journal, 5, &[]));
    let store = SheetEntryStore::new(sheets.clone());

    assert!(matches!(
        store.append_journal(&journal, "ctx", ""),
        Err(StoreError::Validation(_))
    ));
    assert_eq!(sheets.writes(), 0);

    assert_eq!(store.append_journal(&journal, "", "first").unwrap(), TempId(1));
    assert_eq!(store.append_journal(&journal, "c", "second").unwrap(), TempId(2));

    let rows = sheets.rows(&journal);
    let expected: Vec<String> = JOURNAL_HEADER.iter().map(|s| s.to_string()).collect();
    assert_eq!(rows[0], expected);
    assert_eq!(rows[2][0], "2");
    // HHMM.DD.MM.YY
    assert_eq!(rows[2][1].len(), 13);
    assert_eq!(rows[2][3], "second");
}

fn notebook_over(sheets: Arc<FakeSheets>) -> (Notebook, Arc<NoticeQueue>) {
    let notices = Arc::new(NoticeQueue::new());
    let store = Arc::new(SheetEntryStore::new(sheets));
    let notebook = Notebook::new(store, scratch(), perm()).with_notifier(notices.clone());
    (notebook, notices)
}

#[test]
fn test_notebook_round_trip_through_sheet() {
    let sheets = Arc::new(
        FakeSheets::default()
            .with_tab(
                &scratch(),
                11,
                &[&["TempID", "Context", "Content"], &["4", "Draft", "text"]],
            )
            .with_tab(
                &perm(),
                12,
                &[
                    &["TempID", "Context", "Content"],
                    &["1", "Recipes", "eggs"],
                    &["2", "Reading list", "books"],
                ],
            ),
    );
    let (mut nb, notices) = notebook_over(sheets.clone());

    assert_eq!(nb.load_store(), 1);
    let draft = nb.tabs().section(Section::Store)[1].id;
    nb.edit(draft, "Draft\n---\ntext, revised");
    assert_eq!(nb.save(draft), SaveOutcome::Updated(TempId(4)));
    assert_eq!(sheets.rows(&scratch())[1][2], "text, revised");

    assert_eq!(nb.load_permanent(), 2);
    nb.set_picker_query("READ");
    let opened = match nb.pick(0) {
        PickOutcome::Opened(id) => id,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(nb.active().label(), "Reading list");
    assert_eq!(nb.tabs().position(opened), Some((Section::Perm, 0)));

    nb.edit(opened, "Reading list\n---\nbooks, more books");
    match nb.close(opened) {
        CloseOutcome::Closed { saved, cleanup } => {
            assert_eq!(saved, SaveOutcome::Updated(TempId(2)));
            cleanup.wait();
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(sheets.rows(&perm())[2][2], "books, more books");
    assert!(notices.is_empty());
    nb.tabs().assert_invariants();
}

#[test]
fn test_closing_blank_tab_sends_no_create() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[&["TempID", "Context", "Content"], &["1", "a", "b"]],
    ));
    let (mut nb, _) = notebook_over(sheets.clone());
    let blank = nb.add_tab();

    match nb.close(blank) {
        CloseOutcome::Closed { saved, cleanup } => {
            assert_eq!(saved, SaveOutcome::Skipped);
            cleanup.wait();
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(sheets.writes(), 0);
    assert_eq!(sheets.rows(&scratch()).len(), 2);
}

#[test]
fn test_save_recreates_row_deleted_elsewhere() {
    let sheets = Arc::new(FakeSheets::default().with_tab(
        &scratch(),
        11,
        &[&["TempID", "Context", "Content"], &["3", "a", "b"]],
    ));
    let (mut nb, notices) = notebook_over(sheets.clone());
    nb.load_store();
    let tab = nb.tabs().section(Section::Store)[1].id;

    // Another client removes the row
    SheetEntryStore::new(sheets.clone())
        .delete_by_id(&scratch(), TempId(3))
        .unwrap();

    nb.edit(tab, "a\n---\nb2");
    assert_eq!(nb.save(tab), SaveOutcome::Created(TempId(1)));
    assert_eq!(nb.tabs().get(tab).unwrap().temp_id, Some(TempId(1)));
    assert_eq!(ids(&sheets.rows(&scratch())), vec!["1"]);
    assert_eq!(notices.drain().len(), 1);
}

#[test]
fn test_submit_to_journal_tab() {
    let journal = Locator::new("sheet-2", "Journal");
    let sheets = Arc::new(
        FakeSheets::default()
            .with_tab(&scratch(), 11, &[])
            .with_tab(&journal, 5, &[]),
    );
    let (mut nb, _) = notebook_over(sheets.clone());
    nb.edit_active("Standup\n---\nShipped the importer");

    assert_eq!(nb.submit_active(&journal), SubmitOutcome::Submitted(TempId(1)));
    assert_eq!(sheets.rows(&journal)[1][3], "Shipped the importer");
    assert_eq!(nb.active().editor().text(), "\n---\n");
    assert_eq!(nb.submit_active(&journal), SubmitOutcome::Empty);
}

#[test]
fn test_entry_rows_read_back_in_order() {
    let sheets = Arc::new(FakeSheets::default().with_tab(&scratch(), 11, &[]));
    let store = SheetEntryStore::new(sheets);
    for (ctx, content) in [("a", "1"), ("b", "2"), ("c", "3")] {
        store.create(&scratch(), ctx, content).unwrap();
    }
    let entries = store.read_all(&scratch()).unwrap();
    assert_eq!(
        entries,
        vec![
            Entry::new(1, "a", "1"),
            Entry::new(2, "b", "2"),
            Entry::new(3, "c", "3"),
        ]
    );
}
