//! Objects deserialized from the Spotify Web API, and the normalized [PlaybackSnapshot](snapshot::PlaybackSnapshot)
//! served to the widget.

pub mod album;
pub mod artist;
pub mod error;
pub mod playback;
pub mod snapshot;
pub mod track;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}
