//! Line commands understood by the REPL

use notebook::{Placement, Section};

/// Tabs are addressed by their 1-based position in the tab bar
pub type TabRef = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tabs,
    New,
    Switch(TabRef),
    Show,
    /// Replace the active buffer with the lines that follow, up to a lone "."
    Edit,
    Undo,
    Redo,
    Save,
    Close(Option<TabRef>),
    Move {
        tab: TabRef,
        placement: Placement,
        target: TabRef,
    },
    Load(Section),
    Find(String),
    Pick(usize),
    Cancel,
    Submit(Option<String>),
    Delete,
    Clean(Section),
    Hint(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
tabs                      list open tabs
new                       open a blank store tab
switch N                  activate tab N
show                      print the active buffer
edit                      replace the buffer; end input with a lone '.'
undo | redo               step through the buffer history
save                      save the active tab
close [N]                 save and close tab N (default: active)
move N before|after M     reorder within a section
load store|perm           open store rows / list permanent rows
find TEXT                 filter the permanent list
pick N                    open row N of the permanent list
cancel                    dismiss the permanent list
submit [TARGET]           append the active tab to a journal
delete                    delete the active tab's remote row
clean store|perm          remove blank rows now
hint EMAIL                remember the sign-in account
quit";

fn tab_ref(arg: Option<&str>) -> Result<TabRef, String> {
    let arg = arg.ok_or("missing tab number")?;
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("'{}' is not a tab number", arg)),
    }
}

fn section(arg: Option<&str>) -> Result<Section, String> {
    arg.ok_or("expected 'store' or 'perm'")?.parse()
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let command = match word.to_ascii_lowercase().as_str() {
        "tabs" | "ls" => Command::Tabs,
        "new" => Command::New,
        "switch" | "sw" => Command::Switch(tab_ref(args.next())?),
        "show" => Command::Show,
        "edit" => Command::Edit,
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "save" => Command::Save,
        "close" => Command::Close(args.next().map(|a| tab_ref(Some(a))).transpose()?),
        "move" => {
            let tab = tab_ref(args.next())?;
            let placement = match args.next() {
                Some("before") => Placement::Before,
                Some("after") => Placement::After,
                _ => return Err("usage: move N before|after M".to_string()),
            };
            let target = tab_ref(args.next())?;
            Command::Move {
                tab,
                placement,
                target,
            }
        }
        "load" => Command::Load(section(args.next())?),
        "find" => Command::Find(rest.to_string()),
        "pick" => {
            let arg = args.next().ok_or("missing row number")?;
            match arg.parse::<usize>() {
                Ok(n) if n >= 1 => Command::Pick(n - 1),
                _ => return Err(format!("'{}' is not a row number", arg)),
            }
        }
        "cancel" => Command::Cancel,
        "submit" => Command::Submit((!rest.is_empty()).then(|| rest.to_string())),
        "delete" => Command::Delete,
        "clean" => Command::Clean(section(args.next())?),
        "hint" => Command::Hint(rest.to_string()),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(command)
}
