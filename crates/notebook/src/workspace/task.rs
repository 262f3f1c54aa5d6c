//! Fire-and-forget work that tests can still wait on

use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::sheets::Locator;
use crate::store::EntryStore;

/// Handle to work running on its own thread
///
/// Dropping the handle detaches the thread.
#[derive(Debug)]
pub struct BackgroundTask {
    handle: Option<JoinHandle<()>>,
}

impl BackgroundTask {
    pub fn spawn(name: &str, work: impl FnOnce() + Send + 'static) -> Self {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(work)
            .map_err(|e| warn!("Could not start {} thread: {}", name, e))
            .ok();
        Self { handle }
    }

    /// Block until the work has finished
    pub fn wait(mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Background task panicked");
        }
    }
}

/// Remove blank rows from a table without blocking the caller
pub fn spawn_cleanup(store: Arc<dyn EntryStore>, locator: Locator) -> BackgroundTask {
    BackgroundTask::spawn("sheet-cleanup", move || {
        match store.delete_empty_rows(&locator) {
            Ok(0) => debug!("No empty rows in {}", locator),
            Ok(n) => info!("Cleaned {} empty rows from {}", n, locator),
            Err(e) => warn!("Cleanup of {} failed: {}", locator, e),
        }
    })
}
