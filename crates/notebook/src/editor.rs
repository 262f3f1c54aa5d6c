//! Per-tab text buffer
//!
//! A tab is edited as one buffer: everything before the first `---` is the
//! context, everything after it the content. Edits go through a bounded
//! linear undo history.

/// Separates context from content in the buffer
pub const DIVIDER: &str = "---";

/// Snapshots kept per buffer before the oldest are dropped
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Context and content parsed out of a buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Split {
    pub context: String,
    pub content: String,
}

/// Split a buffer on the first divider, trimming both halves
///
/// Later dividers stay in the content. Without a divider the whole buffer
/// is content.
pub fn split_context_content(text: &str) -> Split {
    match text.split_once(DIVIDER) {
        Some((context, content)) => Split {
            context: context.trim().to_string(),
            content: content.trim().to_string(),
        },
        None => Split {
            context: String::new(),
            content: text.trim().to_string(),
        },
    }
}

/// The buffer a tab starts with
pub fn compose(context: &str, content: &str) -> String {
    format!("{}\n{}\n{}", context, DIVIDER, content)
}

/// Ordered snapshots with a cursor; `0 <= cursor < len` always holds
#[derive(Debug, Clone)]
pub struct UndoHistory {
    snapshots: Vec<String>,
    cursor: usize,
    limit: usize,
}

impl UndoHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self::with_limit(initial, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(initial: impl Into<String>, limit: usize) -> Self {
        Self {
            snapshots: vec![initial.into()],
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record a snapshot, discarding any redo tail
    ///
    /// Returns false when `text` equals the snapshot under the cursor.
    pub fn push(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.snapshots[self.cursor] == text {
            return false;
        }

        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(text);
        if self.snapshots.len() > self.limit {
            let excess = self.snapshots.len() - self.limit;
            self.snapshots.drain(..excess);
        }
        self.cursor = self.snapshots.len() - 1;
        true
    }

    pub fn undo(&mut self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    pub fn redo(&mut self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    pub fn current(&self) -> &str {
        &self.snapshots[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn snapshots(&self) -> &[String] {
        &self.snapshots
    }
}

/// A buffer plus its history
#[derive(Debug, Clone)]
pub struct TextEditor {
    text: String,
    history: UndoHistory,
}

impl TextEditor {
    /// Start from a tab's saved context and content
    pub fn new(context: &str, content: &str) -> Self {
        Self::from_text(compose(context, content))
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            history: UndoHistory::new(text.clone()),
            text,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = UndoHistory::with_limit(self.text.clone(), limit);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn split(&self) -> Split {
        split_context_content(&self.text)
    }

    /// Replace the buffer, as a keystroke or paste would
    pub fn set_text(&mut self, text: impl Into<String>) -> Split {
        self.text = text.into();
        self.history.push(self.text.clone());
        self.split()
    }

    pub fn undo(&mut self) -> Option<Split> {
        let text = self.history.undo()?.to_string();
        self.text = text;
        Some(self.split())
    }

    pub fn redo(&mut self) -> Option<Split> {
        let text = self.history.redo()?.to_string();
        self.text = text;
        Some(self.split())
    }

    /// The parsed buffer, unless there is no content to submit
    pub fn submission(&self) -> Option<Split> {
        let split = self.split();
        (!split.content.is_empty()).then_some(split)
    }

    /// Reset to an empty context/content pair after a submit
    pub fn clear(&mut self) -> Split {
        self.set_text(compose("", ""))
    }
}
