// Application state module
// Shared, read-only state handed to every connection task

use super::types::Config;
use crate::storage::UploadStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: UploadStore,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            store: UploadStore::new(&config.storage.upload_dir),
        }
    }

    /// Whether per-request access logging is enabled
    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
