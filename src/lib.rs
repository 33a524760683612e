//! A "now playing" card for a Spotify account, in two halves.
//!
//! - The [proxy] serves `GET /api/spotify/now-playing`. It trades a stored refresh token for an access token, asks
//!   Spotify what the user is playing and answers with a normalized [PlaybackSnapshot](model::snapshot::PlaybackSnapshot).
//!   Failures never leak to the caller: they are logged and reported as `{"isPlaying": false}`.
//! - The [widget] polls that endpoint and keeps a local progress clock running between polls, only adopting the
//!   reported progress when the song or play state changes or the two drift apart.
//!
//! The refresh token is minted once with the authorization code flow, either by pasting the redirect URL into the
//! `mint-refresh-token` binary or by letting the [bootstrap] callback listener catch it.

pub mod bootstrap;
pub mod client;
pub mod config;
mod error;
pub mod model;
pub mod proxy;
pub mod scope;
mod util;
pub mod widget;

pub use crate::error::{Error, Result};
