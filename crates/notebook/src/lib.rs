//! Notebook crate - tabbed notes kept in Google Sheets
//!
//! This crate provides the platform-independent pieces of Sheetpad:
//! - OAuth2 token management and a thin Sheets API client
//! - Entry stores (Sheets-backed and in-memory) doing row CRUD by TempID
//! - A text editor with context/content split and bounded undo
//! - The tab workspace reconciling local tabs with two remote tables
//!
//! Nothing here draws anything; front ends drive [`Notebook`] and render
//! its state.

pub mod config;
pub mod editor;
pub mod error;
pub mod sheets;
pub mod store;
pub mod workspace;

pub use self::config::{NotebookConfig, OAuthCredentials, SubmitTarget, load_login_hint, save_login_hint};
pub use editor::{DIVIDER, Split, TextEditor, UndoHistory, compose, split_context_content};
pub use error::{ApiError, StoreError};
pub use sheets::{A1Range, Locator, OAuthFlow, SheetsApi, SheetsClient, TokenManager, TokenProvider, UreqTransport};
pub use store::{Entry, EntryStore, InMemoryEntryStore, SheetEntryStore, TempId};
pub use workspace::{
    CloseOutcome, LogNotifier, Notebook, Notice, NoticeQueue, Notifier, PickOutcome, Placement,
    SaveOutcome, Section, Severity, SubmitOutcome, Tab, TabId, TabState, UpdateFallback,
};
