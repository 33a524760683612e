//! The "now playing" display component.
//!
//! A [Widget] polls a [SnapshotSource] every two seconds and runs a one-second local clock while something is playing.
//! Both timers live in a single task that owns the [ProgressSync] state, so reconciliation always sees the latest
//! state. Every change is published through a [WidgetHandle], from which the current [View] can be rendered.
//!
//! Each poll runs in its own task and reports back over a channel. A slow response never delays the local clock, and
//! overlapping responses are applied in the order they arrive: the last one to resolve wins.
//!
//! ```no_run
//! # use nowplaying::widget::{HttpSnapshotSource, Widget};
//! # async fn foo() {
//! let source = HttpSnapshotSource::new("http://127.0.0.1:8080/api/spotify/now-playing".parse().unwrap());
//! let mut handle = Widget::new(source).spawn();
//!
//! while handle.changed().await {
//!     println!("{}", handle.view());
//! }
//! # }
//! ```

mod fetch;
mod render;
mod sync;

pub use self::{
    fetch::{HttpSnapshotSource, SnapshotSource},
    render::{format_time, render, PlayingView, SoundBars, View},
    sync::{ProgressSync, Reconciliation, DRIFT_TOLERANCE},
};

use std::{sync::Arc, time::Duration};

use log::{debug, trace};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant, Interval, MissedTickBehavior},
};

pub const POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Builder for a running widget.
#[derive(Debug)]
pub struct Widget<S> {
    source: Arc<S>,
    poll_interval: Duration,
    tick_interval: Duration,
}

/// A running widget. Dropping the handle stops it.
#[derive(Debug)]
pub struct WidgetHandle {
    state: watch::Receiver<ProgressSync>,
    task: JoinHandle<()>,
}

impl<S> Widget<S>
where
    S: SnapshotSource + 'static,
{
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            poll_interval: POLL_INTERVAL,
            tick_interval: TICK_INTERVAL,
        }
    }

    pub fn poll_interval(self, poll_interval: Duration) -> Self {
        Self { poll_interval, ..self }
    }

    /// The local clock advances by this much every time it ticks.
    pub fn tick_interval(self, tick_interval: Duration) -> Self {
        Self { tick_interval, ..self }
    }

    /// Starts polling immediately on the current tokio runtime.
    pub fn spawn(self) -> WidgetHandle {
        let (state_tx, state_rx) = watch::channel(ProgressSync::default());
        let task = tokio::spawn(self.run(state_tx));

        WidgetHandle { state: state_rx, task }
    }

    async fn run(self, state_tx: watch::Sender<ProgressSync>) {
        let mut sync = ProgressSync::default();
        let (fetched_tx, mut fetched_rx) = mpsc::unbounded_channel();

        // the first poll completes immediately
        let mut poll = time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick = self.new_tick_interval();

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    let source = Arc::clone(&self.source);
                    let fetched_tx = fetched_tx.clone();

                    tokio::spawn(async move {
                        let result = source.fetch().await;
                        // the widget may have been stopped while the request was in flight
                        let _ = fetched_tx.send(result);
                    });
                }

                Some(result) = fetched_rx.recv() => {
                    let was_ticking = sync.is_ticking();
                    let reconciliation = sync.apply_fetch_result(result);
                    trace!("Applied snapshot: {:?}", reconciliation);

                    // the local clock's lifetime is bound to the playing state
                    if !was_ticking && sync.is_ticking() {
                        debug!("Playback started, starting local clock");
                        tick = self.new_tick_interval();
                    } else if was_ticking && !sync.is_ticking() {
                        debug!("Playback stopped, stopping local clock");
                    }

                    state_tx.send_replace(sync.clone());
                }

                _ = tick.tick(), if sync.is_ticking() => {
                    sync.tick(self.tick_interval);
                    state_tx.send_replace(sync.clone());
                }

                _ = state_tx.closed() => {
                    debug!("Widget handle dropped, stopping");
                    break;
                }
            }
        }
    }

    fn new_tick_interval(&self) -> Interval {
        let mut tick = time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick
    }
}

impl WidgetHandle {
    /// A copy of the current state.
    pub fn state(&self) -> ProgressSync {
        self.state.borrow().clone()
    }

    /// The current view.
    pub fn view(&self) -> View {
        render(&self.state.borrow())
    }

    /// Waits until the state changes. Returns false if the widget has stopped.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Stops the widget. In-flight requests are abandoned.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for WidgetHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{error::Error, error::Result, model::snapshot::PlaybackSnapshot};

    /// Answers every fetch with whatever the closure returns for the call index and the time since the source was
    /// created.
    struct ScriptedSource<F> {
        calls: AtomicUsize,
        started: Instant,
        script: F,
    }

    impl<F> ScriptedSource<F>
    where
        F: Fn(usize, Duration) -> (Duration, Result<PlaybackSnapshot>) + Send + Sync,
    {
        fn new(script: F) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                started: Instant::now(),
                script,
            }
        }
    }

    #[async_trait]
    impl<F> SnapshotSource for ScriptedSource<F>
    where
        F: Fn(usize, Duration) -> (Duration, Result<PlaybackSnapshot>) + Send + Sync,
    {
        async fn fetch(&self) -> Result<PlaybackSnapshot> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let (latency, result) = (self.script)(call, self.started.elapsed());

            if !latency.is_zero() {
                time::sleep(latency).await;
            }

            result
        }
    }

    fn playing(song_url: &str, progress_ms: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: true,
            title: Some(song_url.to_uppercase()),
            artist: Some("Artist".to_owned()),
            song_url: Some(song_url.to_owned()),
            progress_ms: Some(progress_ms),
            duration_ms: Some(600_000),
            ..Default::default()
        }
    }

    async fn sleep_ms(ms: u64) {
        time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn skeleton_until_first_response() {
        let source = ScriptedSource::new(|_, _| (Duration::from_millis(500), Ok(playing("song-a", 0))));
        let handle = Widget::new(source).spawn();

        sleep_ms(100).await;
        assert_eq!(handle.view(), View::Skeleton);

        sleep_ms(500).await;
        assert!(matches!(handle.view(), View::Playing(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn steady_playback_never_jumps() {
        // the upstream clock runs 5% fast, which stays within the drift tolerance for the first ten seconds
        let source = ScriptedSource::new(|_, elapsed| {
            let progress = elapsed.as_millis() as u64 * 105 / 100 + 300;
            (Duration::ZERO, Ok(playing("song-a", progress)))
        });
        let handle = Widget::new(source).spawn();

        sleep_ms(10).await;
        assert_eq!(handle.state().local_progress_ms(), 300);

        sleep_ms(10_490).await;
        // ten local ticks since the first poll and no resync in between
        assert_eq!(handle.state().local_progress_ms(), 10_300);

        let View::Playing(view) = handle.view() else {
            panic!("expected playing view");
        };
        assert_eq!(view.elapsed, "0:10");
    }

    #[tokio::test(start_paused = true)]
    async fn reported_jump_is_adopted() {
        let source = ScriptedSource::new(|call, _| {
            let progress = if call == 0 { 10_000 } else { 60_000 };
            (Duration::ZERO, Ok(playing("song-a", progress)))
        });
        let handle = Widget::new(source).spawn();

        sleep_ms(500).await;
        assert_eq!(handle.state().local_progress_ms(), 10_000);

        // the second poll at 2s reports 60s; the local clock could have ticked once on the same instant at most
        sleep_ms(1_900).await;
        let local = handle.state().local_progress_ms();
        assert!(local == 60_000 || local == 61_000, "local progress {}", local);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_local_clock() {
        let source = ScriptedSource::new(|call, _| {
            let snapshot = if call == 0 {
                playing("song-a", 5_000)
            } else {
                PlaybackSnapshot {
                    is_playing: false,
                    ..playing("song-a", 7_000)
                }
            };

            (Duration::ZERO, Ok(snapshot))
        });
        let handle = Widget::new(source).spawn();

        sleep_ms(1_500).await;
        assert_eq!(handle.state().local_progress_ms(), 6_000);

        sleep_ms(1_000).await;
        assert_eq!(handle.state().local_progress_ms(), 7_000);
        assert!(!handle.state().is_ticking());
        assert_eq!(handle.view(), View::Idle);

        sleep_ms(10_000).await;
        assert_eq!(handle.state().local_progress_ms(), 7_000);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_restarts_local_clock() {
        let source = ScriptedSource::new(|call, _| {
            let snapshot = match call {
                0 => PlaybackSnapshot {
                    is_playing: false,
                    ..playing("song-a", 20_000)
                },
                _ => playing("song-a", 20_000),
            };

            (Duration::ZERO, Ok(snapshot))
        });
        let handle = Widget::new(source).spawn();

        sleep_ms(1_500).await;
        assert_eq!(handle.state().local_progress_ms(), 20_000);

        // resumed by the poll at 2s, first local tick one second after that
        sleep_ms(1_000).await;
        assert_eq!(handle.state().local_progress_ms(), 20_000);
        sleep_ms(1_000).await;
        assert_eq!(handle.state().local_progress_ms(), 21_000);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_renders_like_nothing_playing() {
        let failing = Widget::new(ScriptedSource::new(|_, _| {
            (
                Duration::ZERO,
                Err(Error::UnhandledSpotifyError(502, "bad gateway".to_owned())),
            )
        }))
        .spawn();
        let idle = Widget::new(ScriptedSource::new(|_, _| {
            (Duration::ZERO, Ok(PlaybackSnapshot::not_playing()))
        }))
        .spawn();

        sleep_ms(100).await;
        assert_eq!(failing.view(), View::Idle);
        assert_eq!(failing.view(), idle.view());
        assert_eq!(failing.state(), idle.state());
    }

    #[tokio::test(start_paused = true)]
    async fn last_response_wins() {
        // the first request is slow and resolves after the second one
        let source = ScriptedSource::new(|call, _| match call {
            0 => (Duration::from_millis(3_000), Ok(playing("slow", 1_000))),
            _ => (Duration::ZERO, Ok(playing("fast", 1_000))),
        });
        let handle = Widget::new(source).spawn();

        sleep_ms(2_500).await;
        assert_eq!(handle.state().current_song_url(), "fast");

        sleep_ms(1_000).await;
        assert_eq!(handle.state().current_song_url(), "slow");
        assert_eq!(
            handle.state().last_snapshot().and_then(|snapshot| snapshot.title.clone()),
            Some("SLOW".to_owned())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn changed_reports_updates() {
        let source = ScriptedSource::new(|_, _| (Duration::ZERO, Ok(playing("song-a", 0))));
        let mut handle = Widget::new(source).spawn();
        let mut seen = Vec::new();

        // the first poll, then the first local tick
        for _ in 0..2 {
            assert!(handle.changed().await);
            seen.push(handle.state().local_progress_ms());
        }

        assert_eq!(seen, vec![0, 1_000]);
    }
}
