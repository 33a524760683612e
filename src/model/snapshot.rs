use serde::{Deserialize, Serialize};

use super::playback::CurrentlyPlayingItem;

/// One read of the user's playback state, in the shape the proxy endpoint serves and the widget consumes.
///
/// When `is_playing` is false every other field is ignored by the widget. Absent fields are omitted from the JSON.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl PlaybackSnapshot {
    /// `{"isPlaying": false}`. Returned for idle playback and for every kind of failure alike.
    pub fn not_playing() -> Self {
        Self::default()
    }
}

impl From<CurrentlyPlayingItem> for PlaybackSnapshot {
    fn from(playing: CurrentlyPlayingItem) -> Self {
        let is_playing = playing.is_playing();
        let progress_ms = playing.progress().map(|progress| progress.as_millis() as u64);

        let Some(track) = playing.take_item() else {
            return Self::not_playing();
        };

        Self {
            is_playing,
            title: Some(track.name().to_owned()),
            artist: Some(track.artist_names()),
            album: Some(track.album().name().to_owned()),
            album_image_url: track.album().cover().map(|image| image.url.clone()),
            song_url: track.external_urls().spotify.clone(),
            progress_ms,
            duration_ms: Some(track.duration().as_millis() as u64),
        }
    }
}
