use std::time::Duration;

use log::{debug, warn};

use crate::{error::Result, model::snapshot::PlaybackSnapshot};

/// How far the locally extrapolated progress may drift from the reported progress before it's hard-reset.
pub const DRIFT_TOLERANCE: Duration = Duration::from_millis(2000);

/// The widget's working state: the last snapshot plus a locally ticking progress clock.
///
/// The reported progress is only accurate at the instant it was fetched, so between polls the widget advances its own
/// clock and only adopts the reported value when the song changes, the play state changes, or the two disagree by more
/// than [DRIFT_TOLERANCE].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSync {
    last_snapshot: Option<PlaybackSnapshot>,
    local_progress_ms: u64,
    current_song_url: String,
    last_is_playing: bool,
}

/// What applying a snapshot decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub song_changed: bool,
    pub play_state_changed: bool,
    pub drift_ms: u64,
    /// Whether the local progress was overwritten with the reported one.
    pub resynced: bool,
}

impl Default for ProgressSync {
    fn default() -> Self {
        Self {
            last_snapshot: None,
            local_progress_ms: 0,
            current_song_url: String::new(),
            last_is_playing: true,
        }
    }
}

impl Reconciliation {
    pub fn significant_drift(&self) -> bool {
        self.drift_ms > DRIFT_TOLERANCE.as_millis() as u64
    }

    pub fn needs_sync(&self) -> bool {
        self.song_changed || self.play_state_changed || self.significant_drift()
    }
}

impl ProgressSync {
    /// Reconcile a freshly fetched snapshot with the local state. The snapshot always replaces the previous one.
    pub fn apply(&mut self, snapshot: PlaybackSnapshot) -> Reconciliation {
        let song_url = snapshot.song_url.as_deref().unwrap_or_default();
        let song_changed = !song_url.is_empty() && song_url != self.current_song_url;
        let play_state_changed = snapshot.is_playing != self.last_is_playing;
        let drift_ms = snapshot.progress_ms.unwrap_or(0).abs_diff(self.local_progress_ms);

        let mut reconciliation = Reconciliation {
            song_changed,
            play_state_changed,
            drift_ms,
            resynced: false,
        };

        if reconciliation.needs_sync() {
            if let Some(progress_ms) = snapshot.progress_ms {
                debug!(
                    "Resyncing progress {} -> {} (song changed: {}, play state changed: {}, drift: {}ms)",
                    self.local_progress_ms, progress_ms, song_changed, play_state_changed, drift_ms
                );

                self.local_progress_ms = progress_ms;
                reconciliation.resynced = true;
            }
        }

        if song_changed {
            self.current_song_url = song_url.to_owned();
        }

        if play_state_changed {
            self.last_is_playing = snapshot.is_playing;
        }

        self.last_snapshot = Some(snapshot);
        reconciliation
    }

    /// Like [apply](Self::apply), but a failed fetch counts as `{"isPlaying": false}`.
    pub fn apply_fetch_result(&mut self, result: Result<PlaybackSnapshot>) -> Reconciliation {
        let snapshot = result.unwrap_or_else(|err| {
            warn!("Error fetching now playing: {}", err);
            PlaybackSnapshot::not_playing()
        });

        self.apply(snapshot)
    }

    /// Advances the local clock by `step` if the last snapshot says something is playing. Returns whether it advanced.
    pub fn tick(&mut self, step: Duration) -> bool {
        if !self.is_ticking() {
            return false;
        }

        self.local_progress_ms += step.as_millis() as u64;
        true
    }

    /// Whether the local clock should be running.
    pub fn is_ticking(&self) -> bool {
        self.last_snapshot
            .as_ref()
            .map_or(false, |snapshot| snapshot.is_playing)
    }

    pub fn last_snapshot(&self) -> Option<&PlaybackSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn local_progress_ms(&self) -> u64 {
        self.local_progress_ms
    }

    pub fn current_song_url(&self) -> &str {
        &self.current_song_url
    }

    pub fn last_is_playing(&self) -> bool {
        self.last_is_playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SECOND: Duration = Duration::from_millis(1000);

    fn playing(song_url: &str, progress_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: true,
            title: Some("Title".to_owned()),
            artist: Some("Artist".to_owned()),
            song_url: Some(song_url.to_owned()),
            progress_ms: Some(progress_ms),
            duration_ms: Some(300_000),
            ..Default::default()
        }
    }

    fn paused(song_url: &str, progress_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: false,
            ..playing(song_url, progress_ms)
        }
    }

    /// A state that has been playing `song_url` with the local clock at `local_progress_ms`.
    fn synced_at(song_url: &str, local_progress_ms: u64) -> ProgressSync {
        let mut sync = ProgressSync::default();
        sync.apply(playing(song_url, local_progress_ms));
        sync
    }

    #[test]
    fn initial_state() {
        let sync = ProgressSync::default();

        assert!(sync.last_snapshot().is_none());
        assert_eq!(sync.local_progress_ms(), 0);
        assert_eq!(sync.current_song_url(), "");
        assert!(sync.last_is_playing());
        assert!(!sync.is_ticking());
    }

    #[test]
    fn first_song_resyncs() {
        let mut sync = ProgressSync::default();
        let reconciliation = sync.apply(playing("song-a", 1500));

        assert!(reconciliation.song_changed);
        assert!(!reconciliation.play_state_changed);
        assert!(!reconciliation.significant_drift());
        assert!(reconciliation.resynced);
        assert_eq!(sync.local_progress_ms(), 1500);
        assert_eq!(sync.current_song_url(), "song-a");
        assert!(sync.is_ticking());
    }

    #[test]
    fn steady_polls_within_tolerance_never_reset() {
        let mut sync = synced_at("song-a", 0);

        // the reported clock runs slightly ahead of the local one but stays within tolerance
        for poll in 1..=20u64 {
            sync.tick(SECOND);
            sync.tick(SECOND);

            let local_before = sync.local_progress_ms();
            let reconciliation = sync.apply(playing("song-a", poll * 2000 + 150));

            assert!(!reconciliation.needs_sync(), "poll {} resynced", poll);
            assert_eq!(sync.local_progress_ms(), local_before);
        }

        assert_eq!(sync.local_progress_ms(), 40_000);
    }

    #[test]
    fn significant_drift_resyncs() {
        let mut sync = synced_at("song-a", 10_000);
        let reconciliation = sync.apply(playing("song-a", 15_000));

        assert_eq!(reconciliation.drift_ms, 5000);
        assert!(reconciliation.significant_drift());
        assert!(reconciliation.resynced);
        assert_eq!(sync.local_progress_ms(), 15_000);
    }

    #[test]
    fn drift_backwards_resyncs() {
        let mut sync = synced_at("song-a", 60_000);
        sync.apply(playing("song-a", 3_000));

        assert_eq!(sync.local_progress_ms(), 3_000);
    }

    #[test]
    fn drift_of_exactly_tolerance_is_ignored() {
        let mut sync = synced_at("song-a", 10_000);
        let reconciliation = sync.apply(playing("song-a", 12_000));

        assert!(!reconciliation.significant_drift());
        assert_eq!(sync.local_progress_ms(), 10_000);
    }

    #[test]
    fn song_change_resyncs_even_with_small_drift() {
        let mut sync = synced_at("song-a", 10_000);
        let reconciliation = sync.apply(playing("song-b", 10_500));

        assert!(reconciliation.song_changed);
        assert!(!reconciliation.significant_drift());
        assert_eq!(sync.local_progress_ms(), 10_500);
        assert_eq!(sync.current_song_url(), "song-b");
    }

    #[test]
    fn pause_resyncs_and_stops_ticking() {
        let mut sync = synced_at("song-a", 10_000);
        sync.tick(SECOND);

        let reconciliation = sync.apply(paused("song-a", 11_200));

        assert!(reconciliation.play_state_changed);
        assert_eq!(sync.local_progress_ms(), 11_200);
        assert!(!sync.last_is_playing());
        assert!(!sync.is_ticking());

        assert!(!sync.tick(SECOND));
        assert_eq!(sync.local_progress_ms(), 11_200);
    }

    #[test]
    fn resume_restarts_ticking() {
        let mut sync = synced_at("song-a", 10_000);
        sync.apply(paused("song-a", 10_000));
        sync.apply(playing("song-a", 10_000));

        assert!(sync.last_is_playing());
        assert!(sync.tick(SECOND));
        assert_eq!(sync.local_progress_ms(), 11_000);
    }

    #[test]
    fn play_state_change_without_progress_keeps_local_clock() {
        let mut sync = synced_at("song-a", 42_000);
        let reconciliation = sync.apply(PlaybackSnapshot::not_playing());

        assert!(reconciliation.needs_sync());
        assert!(!reconciliation.resynced);
        assert_eq!(sync.local_progress_ms(), 42_000);
        assert_eq!(sync.current_song_url(), "song-a");
        assert!(!sync.is_ticking());
    }

    #[test]
    fn empty_song_url_is_not_a_song_change() {
        let mut sync = synced_at("song-a", 5_000);
        let reconciliation = sync.apply(PlaybackSnapshot {
            song_url: None,
            ..playing("", 5_500)
        });

        assert!(!reconciliation.song_changed);
        assert_eq!(sync.current_song_url(), "song-a");
    }

    #[test]
    fn snapshot_always_replaced() {
        let mut sync = synced_at("song-a", 5_000);
        let next = playing("song-a", 5_100);
        sync.apply(next.clone());

        assert_eq!(sync.last_snapshot(), Some(&next));
    }

    #[test]
    fn fetch_failure_counts_as_not_playing() {
        let mut failed = synced_at("song-a", 5_000);
        let mut idle = failed.clone();

        failed.apply_fetch_result(Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))));
        idle.apply(PlaybackSnapshot::not_playing());

        assert_eq!(failed, idle);
        assert_eq!(failed.last_snapshot(), Some(&PlaybackSnapshot::not_playing()));
    }
}
