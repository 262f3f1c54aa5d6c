//! Sheetpad - tabbed notes kept in Google Sheets
//!
//! This is the command-line entry point: it loads configuration, wires the
//! Sheets-backed store into a notebook and hands control to the shell.

use anyhow::{Context, Result};
use clap::Parser;
use config::ConfigDir;
use log::{error, info, warn};
use notebook::config::CREDENTIALS_FILE;
use notebook::{
    NotebookConfig, NoticeQueue, OAuthCredentials, OAuthFlow, SheetEntryStore, SheetsClient,
    TokenManager, UreqTransport,
};
use std::path::PathBuf;
use std::sync::Arc;

mod app;
mod commands;

use app::SheetpadApp;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config directory (default: ~/.config/sheetpad)
    #[arg(long, env = "SHEETPAD_CONFIG_DIR")]
    config: Option<PathBuf>,

    /// Account to pre-select on the consent screen
    #[arg(long)]
    login_hint: Option<String>,

    /// Google OAuth client file (installed or web app)
    #[arg(long)]
    credentials: Option<PathBuf>,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let dir = match args.config {
        Some(path) => ConfigDir::at(path),
        None => config::default_dir()?,
    };
    // Bootstrap config directory
    if let Err(e) = dir.ensure() {
        warn!("Failed to initialize config directory: {}", e);
    }

    let mut settings = NotebookConfig::load(&dir)?;
    if let Some(hint) = args.login_hint {
        settings.login_hint = Some(hint);
    }
    settings.validate()?;

    let creds = match &args.credentials {
        Some(path) => OAuthCredentials::from_file(path)?,
        None => OAuthCredentials::load(&dir).with_context(|| {
            format!(
                "Sheets credentials not found. Either:\n\
                 1. Place your Google OAuth credentials at: {}\n\
                 2. Or set environment variables: SHEETPAD_CLIENT_ID and SHEETPAD_CLIENT_SECRET",
                dir.path(CREDENTIALS_FILE).display()
            )
        })?,
    };

    let flow = OAuthFlow::new(creds.client_id, creds.client_secret)
        .with_login_hint(settings.login_hint.clone());
    let tokens = Arc::new(TokenManager::new(Arc::new(flow)));
    let client = SheetsClient::new(tokens.clone(), Arc::new(UreqTransport));
    let store = Arc::new(SheetEntryStore::new(Arc::new(client)));

    info!(
        "Store {} / permanent {}, {} submit targets",
        settings.store,
        settings.permanent,
        settings.submit_targets.len()
    );

    let notices = Arc::new(NoticeQueue::new());
    let notebook = settings.open_notebook(store, notices.clone());
    let mut app = SheetpadApp::new(notebook, notices, settings, dir);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let result = app.run(&mut stdin.lock(), &mut stdout.lock());

    tokens.dispose();
    result
}
