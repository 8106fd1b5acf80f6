use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

/// Operator toggle for status updates, persisted as a one-character marker
/// file (`1` enabled, `0` disabled) so it survives restarts.
#[derive(Debug)]
pub struct EnabledFlag {
    path: PathBuf,
    enabled: AtomicBool,
}

impl EnabledFlag {
    /// Reads the marker at `path`. A missing or unreadable marker means
    /// enabled.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let enabled = match std::fs::read_to_string(&path) {
            Ok(raw) => match raw.trim() {
                "0" => false,
                "1" => true,
                other => {
                    tracing::warn!(
                        "Unrecognized enabled marker {other:?} in {}; treating as enabled",
                        path.display()
                    );
                    true
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => true,
            Err(error) => {
                tracing::warn!(
                    "Failed to read enabled marker {}: {error}; treating as enabled",
                    path.display()
                );
                true
            }
        };
        tracing::info!(
            "Status updates {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Self {
            path,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Swaps the in-memory flag and returns whether it changed. Callers
    /// follow up with [`EnabledFlag::persist`].
    pub fn replace(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst) != enabled
    }

    /// Writes the marker. A failure leaves the in-memory value in effect for
    /// this run.
    pub fn persist(&self, enabled: bool) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create state directory {}", parent.display()))?;
        }
        std::fs::write(&self.path, if enabled { "1" } else { "0" })
            .with_context(|| format!("write enabled marker {}", self.path.display()))
    }
}
