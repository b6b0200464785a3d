use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::save::SaveRequest;

pub const TOAST_AUTO_HIDE_MS: u64 = 2000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// Host services the sidebar needs: a native folder chooser and the
/// system clipboard.
pub trait HostBridge {
    /// `None` when the user cancels the dialog.
    fn pick_folder(&self) -> Option<PathBuf>;
    fn read_clipboard_text(&self) -> Result<String, HostError>;
    fn write_clipboard_text(&self, text: &str) -> Result<(), HostError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub message: String,
    pub auto_hide_ms: u64,
}

impl Toast {
    fn video_path_copied(url: &str) -> Self {
        Self {
            message: format!("Video path copied as {}", url),
            auto_hide_ms: TOAST_AUTO_HIDE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sidebar {
    folder: Option<PathBuf>,
    video_source: Option<String>,
}

impl Sidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folder(&self) -> Option<&Path> {
        self.folder.as_deref()
    }

    pub fn video_source(&self) -> Option<&str> {
        self.video_source.as_deref()
    }

    pub fn set_folder(&mut self, folder: PathBuf) {
        self.folder = Some(folder);
    }

    /// Sets the source when `source` is non-blank. Returns the stored value.
    pub fn set_video_source(&mut self, source: &str) -> Option<&str> {
        let source = source.trim();
        if source.is_empty() {
            return None;
        }
        self.video_source = Some(source.to_string());
        self.video_source.as_deref()
    }

    pub fn can_save(&self) -> bool {
        self.folder.is_some() && self.video_source.is_some()
    }

    // Returns the chosen folder. Cancelling keeps whatever was selected before.
    pub fn open_folder<H: HostBridge>(&mut self, host: &H) -> Option<&Path> {
        let picked = host.pick_folder();
        self.apply_picked_folder(picked)
    }

    /// Second half of `open_folder`, for hosts that must run the dialog
    /// without holding the sidebar.
    pub fn apply_picked_folder(&mut self, picked: Option<PathBuf>) -> Option<&Path> {
        match picked {
            Some(folder) => {
                tracing::info!(folder = %folder.display(), "folder selected");
                self.folder = Some(folder);
                self.folder.as_deref()
            }
            None => {
                tracing::debug!("folder selection cancelled");
                None
            }
        }
    }

    /// Takes the video source from the clipboard.
    pub fn insert_link<H: HostBridge>(&mut self, host: &H) -> Option<Toast> {
        let text = match host.read_clipboard_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("failed to read clipboard contents: {}", e);
                return None;
            }
        };
        let source = self.set_video_source(&text)?.to_string();
        Some(Toast::video_path_copied(&source))
    }

    pub fn copy_video_url<H: HostBridge>(&self, host: &H) -> Option<Toast> {
        let url = self.video_source.as_deref()?;
        match host.write_clipboard_text(url) {
            Ok(()) => Some(Toast::video_path_copied(url)),
            Err(e) => {
                tracing::warn!("failed to copy video url: {}", e);
                None
            }
        }
    }

    // None while the save action is disabled
    pub fn save_request(&self) -> Option<SaveRequest> {
        Some(SaveRequest {
            folder: self.folder.clone()?,
            source: self.video_source.clone()?,
        })
    }
}
