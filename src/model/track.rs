//! Everything related to tracks.

use super::{album::PartialAlbum, artist::PartialArtist, ExternalUrls};
use crate::util::duration_millis;
use serde::Deserialize;
use std::time::Duration;

/// A full track object as returned in the `item` field of the currently playing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FullTrack {
    name: String,
    artists: Vec<PartialArtist>,
    album: PartialAlbum,
    #[serde(rename = "duration_ms", deserialize_with = "duration_millis::deserialize")]
    duration: Duration,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl FullTrack {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn artists(&self) -> &[PartialArtist] {
        &self.artists
    }

    /// The artists' names joined with `", "`, in the order Spotify lists them.
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name())
            .collect::<Vec<&str>>()
            .join(", ")
    }

    pub fn album(&self) -> &PartialAlbum {
        &self.album
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn external_urls(&self) -> &ExternalUrls {
        &self.external_urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_with_artists(artists: &[&str]) -> FullTrack {
        let artists: Vec<_> = artists.iter().map(|name| serde_json::json!({ "name": name })).collect();

        serde_json::from_value(serde_json::json!({
            "name": "Song",
            "artists": artists,
            "album": { "name": "Album", "images": [] },
            "duration_ms": 1000,
        }))
        .unwrap()
    }

    #[test]
    fn artist_names_joined_in_order() {
        assert_eq!(track_with_artists(&["A", "B"]).artist_names(), "A, B");
        assert_eq!(track_with_artists(&["B", "A", "C"]).artist_names(), "B, A, C");
    }

    #[test]
    fn single_artist_has_no_separator() {
        assert_eq!(track_with_artists(&["Solo"]).artist_names(), "Solo");
    }

    #[test]
    fn duration_from_millis() {
        assert_eq!(track_with_artists(&[]).duration(), Duration::from_millis(1000));
    }
}
