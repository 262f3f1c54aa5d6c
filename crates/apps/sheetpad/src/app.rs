//! Interactive shell over a [`Notebook`]

use anyhow::Result;
use config::ConfigDir;
use log::debug;
use notebook::{
    CloseOutcome, Notebook, NotebookConfig, NoticeQueue, PickOutcome, SaveOutcome, Severity,
    SubmitOutcome, Tab, TabId, TabState,
};
use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::commands::{self, Command, HELP, TabRef};

pub struct SheetpadApp {
    notebook: Notebook,
    notices: Arc<NoticeQueue>,
    config: NotebookConfig,
    dir: ConfigDir,
}

impl SheetpadApp {
    pub fn new(notebook: Notebook, notices: Arc<NoticeQueue>, config: NotebookConfig, dir: ConfigDir) -> Self {
        Self {
            notebook,
            notices,
            config,
            dir,
        }
    }

    pub fn notebook(&self) -> &Notebook {
        &self.notebook
    }

    /// Read commands until `quit` or end of input
    pub fn run(&mut self, input: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
        writeln!(out, "sheetpad - type 'help' for commands")?;
        loop {
            write!(out, "[{}]> ", self.notebook.active().label())?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let command = match commands::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    writeln!(out, "{}", e)?;
                    continue;
                }
            };
            debug!("Command: {:?}", command);

            let keep_going = self.execute(command, input, out)?;
            self.flush_notices(out)?;
            if !keep_going {
                break;
            }
        }
        Ok(())
    }

    fn flush_notices(&self, out: &mut impl Write) -> Result<()> {
        for notice in self.notices.drain() {
            let tag = match notice.severity {
                Severity::Info => "info",
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            writeln!(out, "{}: {}", tag, notice.message)?;
        }
        Ok(())
    }

    fn resolve(&self, tab: TabRef) -> Option<TabId> {
        self.notebook.tabs().nth(tab - 1).map(|t| t.id)
    }

    fn describe(position: usize, tab: &Tab, active: bool) -> String {
        let marker = if active { "*" } else { " " };
        let state = match tab.state() {
            TabState::UnsavedNew => "new",
            TabState::SavedClean => "saved",
            TabState::Dirty => "unsaved",
        };
        let id = tab.temp_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        format!(
            "{}{:>3} [{}] {:<30} id {} ({})",
            marker,
            position,
            tab.section,
            tab.label(),
            id,
            state
        )
    }

    fn print_picker(&self, out: &mut impl Write) -> Result<()> {
        if let Some(picker) = self.notebook.picker() {
            for (i, entry) in picker.visible().iter().enumerate() {
                writeln!(out, "{:>3}  {}", i + 1, entry.context)?;
            }
        }
        Ok(())
    }

    /// Run one command; false means quit
    pub fn execute(&mut self, command: Command, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
        match command {
            Command::Tabs => {
                let active = self.notebook.tabs().active_id();
                for (i, tab) in self.notebook.tabs().iter().enumerate() {
                    writeln!(out, "{}", Self::describe(i + 1, tab, tab.id == active))?;
                }
            }
            Command::New => {
                self.notebook.add_tab();
            }
            Command::Switch(tab) => match self.resolve(tab) {
                Some(id) => {
                    self.notebook.activate(id);
                }
                None => writeln!(out, "no tab {}", tab)?,
            },
            Command::Show => writeln!(out, "{}", self.notebook.active().editor().text())?,
            Command::Edit => {
                let mut text = Vec::new();
                loop {
                    let mut line = String::new();
                    if input.read_line(&mut line)? == 0 {
                        break;
                    }
                    let line = line.trim_end_matches(['\r', '\n']);
                    if line == "." {
                        break;
                    }
                    text.push(line.to_string());
                }
                self.notebook.edit_active(&text.join("\n"));
            }
            Command::Undo => {
                let id = self.notebook.tabs().active_id();
                if !self.notebook.undo(id) {
                    writeln!(out, "nothing to undo")?;
                }
            }
            Command::Redo => {
                let id = self.notebook.tabs().active_id();
                if !self.notebook.redo(id) {
                    writeln!(out, "nothing to redo")?;
                }
            }
            Command::Save => match self.notebook.save_active() {
                SaveOutcome::Updated(id) => writeln!(out, "updated entry {}", id)?,
                SaveOutcome::Created(id) => writeln!(out, "saved as entry {}", id)?,
                SaveOutcome::Skipped => writeln!(out, "nothing to save")?,
                SaveOutcome::Failed | SaveOutcome::UnknownTab => {}
            },
            Command::Close(tab) => {
                let id = match tab {
                    Some(tab) => self.resolve(tab),
                    None => Some(self.notebook.tabs().active_id()),
                };
                match id.map(|id| self.notebook.close(id)) {
                    // Cleanup keeps running while the user carries on
                    Some(CloseOutcome::Closed { .. }) => {}
                    Some(CloseOutcome::LastTab) => writeln!(out, "the last tab stays open")?,
                    Some(CloseOutcome::UnknownTab) | None => writeln!(out, "no such tab")?,
                }
            }
            Command::Move {
                tab,
                placement,
                target,
            } => {
                let moved = match (self.resolve(tab), self.resolve(target)) {
                    (Some(a), Some(b)) => self.notebook.move_tab(a, b, placement),
                    _ => false,
                };
                if !moved {
                    writeln!(out, "tabs can only move within their own section")?;
                }
            }
            Command::Load(notebook::Section::Store) => {
                let added = self.notebook.load_store();
                writeln!(out, "opened {} tabs", added)?;
            }
            Command::Load(notebook::Section::Perm) => {
                self.notebook.load_permanent();
                self.print_picker(out)?;
            }
            Command::Find(query) => {
                if self.notebook.set_picker_query(&query) {
                    self.print_picker(out)?;
                } else {
                    writeln!(out, "no list open; run 'load perm' first")?;
                }
            }
            Command::Pick(index) => match self.notebook.pick(index) {
                PickOutcome::Focused(_) => writeln!(out, "already open")?,
                PickOutcome::Opened(_) => {}
                PickOutcome::Ignored => {}
            },
            Command::Cancel => self.notebook.cancel_picker(),
            Command::Submit(name) => {
                let Some(target) = self.config.submit_target(name.as_deref()).cloned() else {
                    writeln!(out, "no such submit target")?;
                    return Ok(true);
                };
                match self.notebook.submit_active(&target.locator) {
                    SubmitOutcome::Submitted(id) => writeln!(out, "journal entry {} in {}", id, target.name)?,
                    SubmitOutcome::Empty => writeln!(out, "nothing to submit")?,
                    SubmitOutcome::Failed | SubmitOutcome::UnknownTab => {}
                }
            }
            Command::Delete => {
                let id = self.notebook.tabs().active_id();
                if self.notebook.active().temp_id.is_none() {
                    writeln!(out, "tab has no saved entry")?;
                } else {
                    self.notebook.delete_entry(id);
                }
            }
            Command::Clean(section) => {
                let removed = self.notebook.clean(section);
                writeln!(out, "removed {} empty rows", removed)?;
            }
            Command::Hint(email) => {
                notebook::save_login_hint(&self.dir, &email)?;
                self.config.login_hint = (!email.trim().is_empty()).then(|| email.trim().to_string());
                writeln!(out, "sign-in hint saved; used at next sign-in")?;
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}
