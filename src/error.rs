use crate::model::error::AuthenticationErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("The given state does not match the original state")]
    AuthorizationCodeStateMismatch,
    #[error("The redirect URL did not contain an authorization code")]
    MissingAuthorizationCode,
    #[error("The user denied the authorization request: {0}")]
    AuthorizationDenied(String),
    #[error("The client ID or secret is invalid")]
    InvalidClient,
    #[error("The refresh token is invalid: {0}. The user should be reauthorized")]
    InvalidRefreshToken(String),
    #[error("The authorization code is invalid")]
    InvalidAuthorizationCode,

    #[error("Unhandled authentication error: {0:?}: {1}")]
    UnhandledAuthenticationError(AuthenticationErrorKind, String),
    #[error("Unhandled API error {0}: {1}")]
    UnhandledSpotifyError(u16, String),

    #[error("Missing configuration value: {0}")]
    MissingConfiguration(&'static str),
    #[error("Invalid configuration value for {0}: {1}")]
    InvalidConfiguration(&'static str, String),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
