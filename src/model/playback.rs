use std::time::Duration;

use serde::Deserialize;

use super::track::FullTrack;
use crate::util::duration_millis;

/// Currently playing item, as returned by the currently playing endpoint.
///
/// The `item` field is `null` when nothing is queued, or when the playing item isn't publicly available (e.g. the user
/// has enabled a private session).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CurrentlyPlayingItem {
    is_playing: bool,
    #[serde(default, rename = "progress_ms", deserialize_with = "duration_millis::option::deserialize")]
    progress: Option<Duration>,
    #[serde(default)]
    item: Option<FullTrack>,
}

impl CurrentlyPlayingItem {
    /// Whether or not the item is playing.
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// The item's playback progress at the time the response was generated.
    pub fn progress(&self) -> Option<Duration> {
        self.progress
    }

    /// The playing track.
    pub fn item(&self) -> Option<&FullTrack> {
        self.item.as_ref()
    }

    /// The playing track. Take ownership of the value.
    pub fn take_item(self) -> Option<FullTrack> {
        self.item
    }
}
