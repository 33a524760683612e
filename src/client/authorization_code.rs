//! Contains the [IncompleteAuthorizationCodeUserClient] and its builder. Together they implement the authorization
//! code flow, which is only needed once: to mint the refresh token the proxy runs with.
//!
//! [Spotify documentation on the authorization code flow.](https://developer.spotify.com/documentation/general/guides/authorization/code-flow/).
//!
//! # Usage
//!
//! ```no_run
//! # use nowplaying::client::SpotifyClientBuilder;
//! # use nowplaying::scope::NOW_PLAYING_SCOPES;
//! # async fn foo() {
//! let spotify_client = SpotifyClientBuilder::new("application client ID")
//!     .client_secret("application client secret")
//!     .build();
//!
//! // the callback URL here should match one of the callback URLs
//! // specified in your Spotify application
//! let incomplete_auth_code_client = spotify_client
//!     .authorization_code_client("http://127.0.0.1:3000")
//!     .scopes(NOW_PLAYING_SCOPES)
//!     .build();
//!
//! // direct the user to this URL. once they approve the application, they're
//! // redirected to the callback URL with `code` and `state` in the query
//! let authorize_url = incomplete_auth_code_client.get_authorize_url();
//! # let code = "";
//! # let state = "";
//!
//! let tokens = incomplete_auth_code_client
//!     .finalize(code, state)
//!     .await
//!     .expect("failed to finalize authorization code flow");
//!
//! println!("SPOTIFY_REFRESH_TOKEN={}", tokens.refresh_token.as_str());
//! # }
//! ```

use log::debug;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Url;
use serde::Deserialize;

use super::{extract_authentication_error, SpotifyClientWithSecret};
use crate::{
    config::RefreshToken,
    error::{Error, Result},
    model::error::AuthenticationErrorKind,
    scope::{Scope, ToScopesString},
    util::redact::redact,
};

const RANDOM_STATE_LENGTH: usize = 16;

/// An incomplete authorization code user client.
///
/// The client has been configured, and it has to be [finalized](IncompleteAuthorizationCodeUserClient::finalize) by
/// directing the user to the [authorize URL](IncompleteAuthorizationCodeUserClient::get_authorize_url) and retrieving
/// an authorization code and a state parameter from the redirect callback URL.
#[derive(Debug)]
pub struct IncompleteAuthorizationCodeUserClient {
    redirect_uri: String,
    state: String,
    scopes: Option<String>,
    show_dialog: bool,

    spotify_client: SpotifyClientWithSecret,
}

/// Builder for [IncompleteAuthorizationCodeUserClient].
#[derive(Debug)]
pub struct AuthorizationCodeUserClientBuilder {
    redirect_uri: String,
    scopes: Option<String>,
    show_dialog: bool,

    spotify_client: SpotifyClientWithSecret,
}

/// The tokens Spotify returns once the user has approved the application.
#[derive(Debug, Clone)]
pub struct UserTokens {
    pub access_token: String,
    pub refresh_token: RefreshToken,
    pub scope: Option<String>,
}

/// What the redirect back to the callback URL carried in its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectParameters {
    /// The user approved the application.
    Code { code: String, state: Option<String> },
    /// The user denied the request, or Spotify rejected it.
    Error { error: String, description: Option<String> },
    /// Neither a code nor an error; the user hasn't been redirected here yet.
    Empty,
}

#[derive(Deserialize)]
struct AuthorizeUserTokenResponse {
    access_token: String,
    refresh_token: String,

    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    expires_in: u32,
}

impl AuthorizationCodeUserClientBuilder {
    pub(super) fn new(redirect_uri: String, spotify_client: SpotifyClientWithSecret) -> Self {
        Self {
            redirect_uri,
            scopes: None,
            show_dialog: false,

            spotify_client,
        }
    }

    /// Specify the [OAuth authorization scopes](crate::scope::Scope) that the user is asked to grant for the
    /// application.
    pub fn scopes<T>(self, scopes: T) -> Self
    where
        T: IntoIterator<Item = Scope>,
    {
        Self {
            scopes: Some(scopes.to_scopes_string()),
            ..self
        }
    }

    /// Set whether or not to force the user to approve the application again, if they've already done so.
    pub fn show_dialog(self, show_dialog: bool) -> Self {
        Self { show_dialog, ..self }
    }

    /// Finalize the builder and return an [IncompleteAuthorizationCodeUserClient] with a freshly generated random
    /// state.
    pub fn build(self) -> IncompleteAuthorizationCodeUserClient {
        let state = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_STATE_LENGTH)
            .map(char::from)
            .collect();

        IncompleteAuthorizationCodeUserClient {
            redirect_uri: self.redirect_uri,
            state,
            scopes: self.scopes,
            show_dialog: self.show_dialog,

            spotify_client: self.spotify_client,
        }
    }
}

impl IncompleteAuthorizationCodeUserClient {
    /// Returns an authorization URL the user should be directed to in some manner.
    pub fn get_authorize_url(&self) -> String {
        let mut query_params = vec![
            ("response_type", "code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.spotify_client.client_id()),
            ("state", self.state.as_str()),
            ("show_dialog", if self.show_dialog { "true" } else { "false" }),
        ];

        if let Some(scopes) = &self.scopes {
            query_params.push(("scope", scopes.as_str()));
        }

        let mut authorize_url = self.spotify_client.authorize_url();
        authorize_url.query_pairs_mut().extend_pairs(query_params);

        authorize_url.into()
    }

    /// The random state included in the authorize URL.
    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Exchange the code and state from the callback URL query for an access token and a refresh token.
    ///
    /// If the originally generated state does not match `state`, returns
    /// [AuthorizationCodeStateMismatch](Error::AuthorizationCodeStateMismatch) without making a request.
    pub async fn finalize(&self, code: &str, state: &str) -> Result<UserTokens> {
        debug!(
            "Attempting to finalize authorization code flow with code: {} and state: {}",
            redact(code),
            state
        );

        if state != self.state {
            return Err(Error::AuthorizationCodeStateMismatch);
        }

        let token_request_form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .spotify_client
            .token_request()
            .form(&token_request_form)
            .send()
            .await?;

        debug!("Authorization code token response status: {}", response.status());

        let response = extract_authentication_error(response)
            .await
            .map_err(map_authentication_error)?;

        let token_response: AuthorizeUserTokenResponse = response.json().await?;
        debug!(
            "Got refresh token {} (scope: {:?}, access token expires in {}s)",
            redact(&token_response.refresh_token),
            token_response.scope,
            token_response.expires_in
        );

        Ok(UserTokens {
            access_token: token_response.access_token,
            refresh_token: RefreshToken::new(token_response.refresh_token),
            scope: token_response.scope,
        })
    }

    /// Finalize with the full URL the user was redirected to.
    pub async fn finalize_from_redirect(&self, redirect_url: &str) -> Result<UserTokens> {
        let url = Url::parse(redirect_url.trim())
            .map_err(|err| Error::InvalidConfiguration("redirect URL", err.to_string()))?;

        match RedirectParameters::from_query_pairs(url.query_pairs()) {
            RedirectParameters::Code {
                code,
                state: Some(state),
            } => self.finalize(&code, &state).await,
            RedirectParameters::Code { state: None, .. } => Err(Error::AuthorizationCodeStateMismatch),
            RedirectParameters::Error { error, description } => {
                Err(Error::AuthorizationDenied(description.unwrap_or(error)))
            }
            RedirectParameters::Empty => Err(Error::MissingAuthorizationCode),
        }
    }
}

impl RedirectParameters {
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;

        for (key, value) in pairs {
            match key.as_ref() {
                "code" => code = Some(value.into()),
                "state" => state = Some(value.into()),
                "error" => error = Some(value.into()),
                "error_description" => description = Some(value.into()),
                _ => {}
            }
        }

        if let Some(error) = error {
            RedirectParameters::Error { error, description }
        } else if let Some(code) = code {
            RedirectParameters::Code { code, state }
        } else {
            RedirectParameters::Empty
        }
    }
}

fn map_authentication_error(err: Error) -> Error {
    match err {
        Error::UnhandledAuthenticationError(AuthenticationErrorKind::InvalidGrant, _) => Error::InvalidAuthorizationCode,
        Error::UnhandledAuthenticationError(AuthenticationErrorKind::InvalidClient, _) => Error::InvalidClient,
        err => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::SpotifyClientBuilder, scope::NOW_PLAYING_SCOPES};

    fn incomplete_client() -> IncompleteAuthorizationCodeUserClient {
        SpotifyClientBuilder::new("client-id")
            .client_secret("secret")
            .build()
            .authorization_code_client("http://127.0.0.1:3000")
            .scopes(NOW_PLAYING_SCOPES)
            .build()
    }

    #[test]
    fn state_is_random_alphanumeric() {
        let first = incomplete_client();
        let second = incomplete_client();

        assert_eq!(first.state().len(), RANDOM_STATE_LENGTH);
        assert!(first.state().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first.state(), second.state());
    }

    #[test]
    fn authorize_url_contains_parameters() {
        let client = incomplete_client();
        let url = Url::parse(&client.get_authorize_url()).unwrap();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert_eq!(url.path(), "/authorize");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("client_id"), Some("client-id"));
        assert_eq!(get("redirect_uri"), Some("http://127.0.0.1:3000"));
        assert_eq!(get("state"), Some(client.state()));
        assert_eq!(get("show_dialog"), Some("false"));
        assert_eq!(get("scope"), Some("user-read-currently-playing user-read-playback-state"));
    }

    #[tokio::test]
    async fn state_mismatch_is_rejected_before_any_request() {
        let client = incomplete_client();
        let err = client.finalize("code", "wrong state").await.unwrap_err();

        assert!(matches!(err, Error::AuthorizationCodeStateMismatch));
    }

    #[tokio::test]
    async fn redirect_without_code_is_rejected() {
        let client = incomplete_client();
        let err = client.finalize_from_redirect("http://127.0.0.1:3000/").await.unwrap_err();

        assert!(matches!(err, Error::MissingAuthorizationCode));
    }

    #[tokio::test]
    async fn redirect_with_error_is_denied() {
        let client = incomplete_client();
        let err = client
            .finalize_from_redirect("http://127.0.0.1:3000/?error=access_denied&state=x")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AuthorizationDenied(reason) if reason == "access_denied"));
    }

    #[test]
    fn redirect_parameters_prefer_error() {
        let params = RedirectParameters::from_query_pairs([
            ("code", "abc"),
            ("error", "access_denied"),
            ("error_description", "The user said no"),
        ]);

        assert_eq!(
            params,
            RedirectParameters::Error {
                error: "access_denied".to_owned(),
                description: Some("The user said no".to_owned()),
            }
        );
    }

    #[test]
    fn redirect_parameters_with_code() {
        let params = RedirectParameters::from_query_pairs([("code", "abc"), ("state", "xyz")]);

        assert_eq!(
            params,
            RedirectParameters::Code {
                code: "abc".to_owned(),
                state: Some("xyz".to_owned()),
            }
        );
    }
}
