use std::fmt;

use super::sync::ProgressSync;

const SPOTIFY_GLYPH: &str = "♫";
const BAR_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// What the widget shows. Derived from [ProgressSync] by [render] and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Nothing fetched yet.
    Skeleton,
    /// Nothing playing, or the last fetch failed.
    Idle,
    Playing(PlayingView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayingView {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub album_image_url: Option<String>,
    pub song_url: Option<String>,
    /// Elapsed time as `m:ss`.
    pub elapsed: String,
    pub bars: SoundBars,
}

/// The four-bar level indicator shown next to the elapsed time. Each bar bounces on its own period, offset from the
/// previous bar by 150 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundBars {
    clock_ms: u64,
}

impl SoundBars {
    const DELAYS_MS: [u64; 4] = [0, 150, 300, 450];
    const PERIODS_MS: [u64; 4] = [900, 700, 1100, 1300];

    pub fn at(clock_ms: u64) -> Self {
        Self { clock_ms }
    }

    /// Bar heights between 1 and 8 inclusive.
    pub fn heights(&self) -> [u8; 4] {
        let mut heights = [0; 4];

        for (bar, height) in heights.iter_mut().enumerate() {
            let period = Self::PERIODS_MS[bar];
            let phase = (self.clock_ms + period - Self::DELAYS_MS[bar] % period) % period;

            // triangle wave: up for the first half of the period, down for the second
            let half = period / 2;
            let level = if phase < half { phase } else { period - phase };
            *height = 1 + (level * 7 / half) as u8;
        }

        heights
    }
}

impl fmt::Display for SoundBars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for height in self.heights() {
            write!(f, "{}", BAR_GLYPHS[usize::from(height - 1)])?;
        }

        Ok(())
    }
}

/// Formats milliseconds as `minutes:seconds`, seconds zero-padded to two digits.
///
/// ```
/// # use nowplaying::widget::format_time;
/// assert_eq!(format_time(65000), "1:05");
/// assert_eq!(format_time(5000), "0:05");
/// assert_eq!(format_time(0), "0:00");
/// ```
pub fn format_time(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Derive the view from the widget state.
pub fn render(sync: &ProgressSync) -> View {
    let Some(snapshot) = sync.last_snapshot() else {
        return View::Skeleton;
    };

    if !snapshot.is_playing {
        return View::Idle;
    }

    View::Playing(PlayingView {
        title: snapshot.title.clone().unwrap_or_default(),
        artist: snapshot.artist.clone().unwrap_or_default(),
        album: snapshot.album.clone(),
        album_image_url: snapshot.album_image_url.clone(),
        song_url: snapshot.song_url.clone(),
        elapsed: format_time(sync.local_progress_ms()),
        bars: SoundBars::at(sync.local_progress_ms()),
    })
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Skeleton => {
                writeln!(f, "░░  ░░░░░░░░░░░░")?;
                write!(f, "░░  ░░░░░░░░")
            }

            View::Idle => {
                writeln!(f, "{}   not playing", SPOTIFY_GLYPH)?;
                write!(f, "    spotify")
            }

            View::Playing(playing) => {
                writeln!(f, "{} {}", playing.bars, playing.elapsed)?;
                writeln!(f, "{}", playing.title)?;
                write!(f, "{}", playing.artist)?;

                if let Some(album) = &playing.album {
                    write!(f, " · {}", album)?;
                }

                if let Some(song_url) = &playing.song_url {
                    write!(f, "\n↗ {}", song_url)?;
                }

                Ok(())
            }
        }
    }
}
