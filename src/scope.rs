use std::fmt::Display;

/// Scopes the widget needs the user to grant when minting a refresh token.
pub const NOW_PLAYING_SCOPES: [Scope; 2] = [Scope::UserReadCurrentlyPlaying, Scope::UserReadPlaybackState];

pub trait ToScopesString
where
    Self: IntoIterator<Item = Scope>,
{
    fn to_scopes_string(self) -> String;
}

/// OAuth authorization scopes relevant to reading playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    UserReadPlaybackState,
    UserReadCurrentlyPlaying,
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::UserReadPlaybackState => write!(f, "user-read-playback-state"),
            Scope::UserReadCurrentlyPlaying => write!(f, "user-read-currently-playing"),
        }
    }
}

impl<I> ToScopesString for I
where
    I: IntoIterator<Item = Scope>,
{
    fn to_scopes_string(self) -> String {
        self.into_iter()
            .map(|scope| scope.to_string())
            .collect::<Vec<String>>()
            .join(" ")
    }
}
