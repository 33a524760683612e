use crate::error::Error;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct AuthenticationErrorResponse {
    pub error: AuthenticationErrorKind,
    #[serde(default)]
    pub error_description: String,
}

/// The `error` field of a failed request to the accounts service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationErrorKind {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    UnauthorizedClient,
    UnsupportedGrantType,
    InvalidScope,
}

impl AuthenticationErrorResponse {
    pub fn into_unhandled_error(self) -> Error {
        Error::UnhandledAuthenticationError(self.error, self.error_description)
    }
}
