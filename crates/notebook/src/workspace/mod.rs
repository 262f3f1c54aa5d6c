//! Tab workspace: the open tabs, the permanent-sheet picker and the
//! reconciliation of both with the remote tables

mod notebook;
mod notify;
mod picker;
mod tabs;
mod task;

pub use notebook::{CloseOutcome, Notebook, PickOutcome, SaveOutcome, SubmitOutcome, UpdateFallback};
pub use notify::{LogNotifier, Notice, NoticeQueue, Notifier, Severity};
pub use picker::{NEW_ENTRY_LABEL, NEW_ENTRY_SENTINEL, Picker};
pub use tabs::{Placement, Section, Tab, TabId, TabSet, TabState};
pub use task::{BackgroundTask, spawn_cleanup};
