use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("host refused to play item: {0}")]
    PlayError(String),
}

/// A row the host renders in its list UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub label: String,
    pub path: String,
    pub is_playable: bool,
}

impl ListItem {
    pub fn folder(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            is_playable: false,
        }
    }
}

/// A resolved stream ready for the host player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackResult {
    pub label: String,
    pub path: String,
    pub is_playable: bool,
}

impl PlaybackResult {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            is_playable: true,
        }
    }
}

/// Primitives the media-center host provides to the add-on
pub trait Host {
    /// Show a transient message to the user
    fn notify(&self, message: &str);

    /// Navigate the host UI to another add-on path
    fn redirect(&self, path: &str);

    /// Start playback of a resolved stream
    fn play(&self, item: &PlaybackResult) -> Result<(), HostError>;

    fn is_playing(&self) -> bool;

    fn set_subtitles(&self, path: &Path);
}
