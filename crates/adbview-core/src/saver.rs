//! Saving the captured log to a user-chosen file.

use crate::config::AppConfig;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Asks the user where to save.
///
/// `None` means the user cancelled.
#[async_trait]
pub trait SavePrompt: Send + Sync {
    async fn choose_path(&self, suggested_name: &str) -> Option<PathBuf>;
}

/// Prompt that never asks: every save goes to a fixed directory under the
/// suggested file name.
#[derive(Debug, Clone)]
pub struct DirectoryPrompt {
    dir: PathBuf,
}

impl DirectoryPrompt {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SavePrompt for DirectoryPrompt {
    async fn choose_path(&self, suggested_name: &str) -> Option<PathBuf> {
        Some(self.dir.join(sanitize_file_name(suggested_name)))
    }
}

/// Keep only the final component of a suggested name.
///
/// Empty suggestions, and ones with no usable final component, get a
/// timestamped default.
fn sanitize_file_name(suggested: &str) -> String {
    let last = suggested
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or("");

    if last.is_empty() || last == "." || last == ".." {
        default_file_name()
    } else {
        last.to_string()
    }
}

fn default_file_name() -> String {
    format!(
        "logcat-{}.{}",
        chrono::Local::now().format("%Y%m%d-%H%M%S"),
        AppConfig::DEFAULT_LOG_EXTENSION
    )
}

/// Writes log text to the destination a [`SavePrompt`] picks.
#[derive(Clone)]
pub struct LogSaver {
    prompt: Arc<dyn SavePrompt>,
}

impl LogSaver {
    pub fn new(prompt: Arc<dyn SavePrompt>) -> Self {
        Self { prompt }
    }

    /// Save `content` as UTF-8, returning the path written.
    pub async fn save(&self, content: &str, suggested_name: &str) -> Result<PathBuf> {
        let path = self
            .prompt
            .choose_path(suggested_name)
            .await
            .ok_or(BridgeError::Cancelled)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BridgeError::io_with_path(e, parent))?;
        }

        debug!("Writing {} bytes to {}", content.len(), path.display());
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| BridgeError::io_with_path(e, &path))?;

        info!("Saved log to {}", path.display());
        Ok(path)
    }
}

impl std::fmt::Debug for LogSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSaver").finish_non_exhaustive()
    }
}
