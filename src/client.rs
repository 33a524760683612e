//! Clients for the two Spotify hosts the widget talks to: the accounts service (token exchanges) and the Web API
//! (currently playing).
//!
//! [SpotifyClientWithSecret] holds the application credentials. From it, a [RefreshingUserClient] is built with a
//! user's refresh token for the proxy, or an [AuthorizationCodeUserClientBuilder] is started to mint a refresh token in
//! the first place.

pub(crate) mod authorization_code;

pub use self::authorization_code::{
    AuthorizationCodeUserClientBuilder, IncompleteAuthorizationCodeUserClient, RedirectParameters, UserTokens,
};

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use const_format::concatcp;
use log::{debug, trace, warn};
use reqwest::{header, Client as AsyncClient, StatusCode, Url};
use serde::Deserialize;

use crate::{
    config::{Config, Credentials, Endpoints, RefreshToken},
    error::{Error, Result},
    model::{
        error::{AuthenticationErrorKind, AuthenticationErrorResponse},
        playback::CurrentlyPlayingItem,
    },
    util::redact::redact,
};

const API_HOST: &str = "https://api.spotify.com/";
const API_VERSION: &str = "v1/";
pub(crate) const API_BASE_URL: &str = concatcp!(API_HOST, API_VERSION);
pub(crate) const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com/";

// paths relative to the configured base URLs
const API_CURRENTLY_PLAYING_TRACK_PATH: &str = "me/player/currently-playing";
const ACCOUNTS_AUTHORIZE_PATH: &str = "authorize";
const ACCOUNTS_API_TOKEN_PATH: &str = "api/token";

/// Anything the proxy can ask for the user's currently playing item.
///
/// [RefreshingUserClient] is the real implementation. `Ok(None)` means the upstream reported no content (nothing is
/// playing on any device).
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    async fn currently_playing(&self) -> Result<Option<CurrentlyPlayingItem>>;
}

/// A Spotify client that holds the application's client ID and secret.
///
/// This client uses `Arc` internally, so cloning it is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SpotifyClientWithSecret {
    inner: Arc<SpotifyClientWithSecretRef>,
    http_client: AsyncClient,
}

#[derive(Debug)]
struct SpotifyClientWithSecretRef {
    client_id: String,
    authorization_header: String,
    endpoints: Endpoints,
}

/// Builder for [SpotifyClientWithSecret].
#[derive(Debug, Clone)]
pub struct SpotifyClientBuilder {
    client_id: String,
}

/// Builder for [SpotifyClientWithSecret] once the client secret is known.
#[derive(Debug, Clone)]
pub struct ClientSecretSpotifyClientBuilder {
    client_id: String,
    client_secret: String,
    endpoints: Endpoints,
}

/// A client for a single user, authorized with a refresh token.
///
/// Every call to [currently_playing](PlaybackSource::currently_playing) exchanges the refresh token for a fresh access
/// token first. Access tokens are never cached.
#[derive(Debug, Clone)]
pub struct RefreshingUserClient {
    spotify_client: SpotifyClientWithSecret,
    refresh_token: RefreshToken,
}

#[derive(Debug, Deserialize)]
struct RefreshUserTokenResponse {
    access_token: String,

    // these fields are in the response but the client doesn't need them. keep them here for logging purposes
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    expires_in: u32,
}

impl SpotifyClientBuilder {
    pub fn new<S>(client_id: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            client_id: client_id.into(),
        }
    }

    pub fn client_secret<S>(self, client_secret: S) -> ClientSecretSpotifyClientBuilder
    where
        S: Into<String>,
    {
        ClientSecretSpotifyClientBuilder {
            client_id: self.client_id,
            client_secret: client_secret.into(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ClientSecretSpotifyClientBuilder {
    /// Use other base URLs than Spotify's own.
    pub fn endpoints(self, endpoints: Endpoints) -> Self {
        Self { endpoints, ..self }
    }

    pub fn build(self) -> SpotifyClientWithSecret {
        SpotifyClientWithSecret {
            inner: Arc::new(SpotifyClientWithSecretRef {
                authorization_header: build_authorization_header(&self.client_id, &self.client_secret),
                client_id: self.client_id,
                endpoints: self.endpoints,
            }),
            http_client: AsyncClient::new(),
        }
    }
}

impl SpotifyClientWithSecret {
    pub fn from_credentials(credentials: &Credentials, endpoints: Endpoints) -> Self {
        SpotifyClientBuilder::new(credentials.client_id.as_str())
            .client_secret(credentials.client_secret.as_str())
            .endpoints(endpoints)
            .build()
    }

    /// Begin the authorization code flow in order to get a refresh token for a user.
    pub fn authorization_code_client<S>(&self, redirect_uri: S) -> AuthorizationCodeUserClientBuilder
    where
        S: Into<String>,
    {
        AuthorizationCodeUserClientBuilder::new(redirect_uri.into(), self.clone())
    }

    /// Returns a client for the user the given refresh token belongs to. No request is made until the client is used.
    pub fn refreshing_user_client(&self, refresh_token: RefreshToken) -> RefreshingUserClient {
        RefreshingUserClient {
            spotify_client: self.clone(),
            refresh_token,
        }
    }

    pub(crate) fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    pub(crate) fn http_client(&self) -> &AsyncClient {
        &self.http_client
    }

    pub(crate) fn authorize_url(&self) -> Url {
        join_endpoint(&self.inner.endpoints.accounts, ACCOUNTS_AUTHORIZE_PATH)
    }

    pub(crate) fn token_url(&self) -> Url {
        join_endpoint(&self.inner.endpoints.accounts, ACCOUNTS_API_TOKEN_PATH)
    }

    pub(crate) fn currently_playing_url(&self) -> Url {
        join_endpoint(&self.inner.endpoints.api, API_CURRENTLY_PLAYING_TRACK_PATH)
    }

    /// Returns a POST request to the accounts token endpoint with the application's Basic authorization filled in.
    pub(crate) fn token_request(&self) -> reqwest::RequestBuilder {
        self.http_client
            .post(self.token_url())
            .header(header::AUTHORIZATION, self.inner.authorization_header.as_str())
    }
}

impl RefreshingUserClient {
    pub fn new(config: &Config) -> Self {
        SpotifyClientWithSecret::from_credentials(&config.credentials, config.endpoints.clone())
            .refreshing_user_client(config.refresh_token.clone())
    }

    /// Exchange the refresh token for a new access token.
    pub async fn access_token(&self) -> Result<String> {
        debug!(
            "Refreshing access token with refresh token: {}",
            redact(self.refresh_token.as_str())
        );

        let token_request_form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
        ];

        let response = self
            .spotify_client
            .token_request()
            .form(&token_request_form)
            .send()
            .await?;

        debug!("Token response status: {}", response.status());

        let response = extract_authentication_error(response)
            .await
            .map_err(map_refresh_token_error)?;

        let token_response: RefreshUserTokenResponse = response.json().await?;
        debug!(
            "Got access token {} (scope: {:?}, expires in {}s)",
            redact(&token_response.access_token),
            token_response.scope,
            token_response.expires_in
        );

        Ok(token_response.access_token)
    }
}

#[async_trait]
impl PlaybackSource for RefreshingUserClient {
    async fn currently_playing(&self) -> Result<Option<CurrentlyPlayingItem>> {
        let access_token = self.access_token().await?;

        let response = self
            .spotify_client
            .http_client()
            .get(self.spotify_client.currently_playing_url())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        debug!("Currently playing response status: {}", status);

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(response_to_error(response).await);
        }

        let currently_playing: CurrentlyPlayingItem = response.json().await?;
        trace!("Currently playing body: {:?}", currently_playing);

        Ok(Some(currently_playing))
    }
}

/// Joins a relative path under a base URL. The base URLs in [Endpoints] always end in a slash and the paths are
/// constants, so this cannot fail.
fn join_endpoint(base: &Url, path: &str) -> Url {
    base.join(path)
        .expect("failed to build endpoint URL: invalid path (this is likely a bug)")
}

fn build_authorization_header(client_id: &str, client_secret: &str) -> String {
    let auth = format!("{}:{}", client_id, client_secret);
    format!("Basic {}", BASE64.encode(auth))
}

/// Takes a response for an authentication request and if its status is 400 or 401, parses its body as an
/// authentication error. Other error statuses become an HTTP error. On success returns the given response without
/// modifying it.
async fn extract_authentication_error(response: reqwest::Response) -> Result<reqwest::Response> {
    match response.status() {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
            let error_response: AuthenticationErrorResponse = response.json().await?;
            warn!(
                "Authentication request failed: {:?}: {}",
                error_response.error, error_response.error_description
            );

            Err(error_response.into_unhandled_error())
        }

        _ => Ok(response.error_for_status()?),
    }
}

async fn response_to_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!("Spotify API returned {}: {}", status, body);

    Error::UnhandledSpotifyError(status, body)
}

fn map_refresh_token_error(err: Error) -> Error {
    match err {
        Error::UnhandledAuthenticationError(AuthenticationErrorKind::InvalidGrant, description) => {
            Error::InvalidRefreshToken(description)
        }
        Error::UnhandledAuthenticationError(AuthenticationErrorKind::InvalidClient, _) => Error::InvalidClient,
        err => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(accounts: &str, api: &str) -> SpotifyClientWithSecret {
        SpotifyClientBuilder::new("id")
            .client_secret("secret")
            .endpoints(Endpoints::new(accounts, api).unwrap())
            .build()
    }

    #[test]
    fn basic_authorization_header() {
        // base64("id:secret")
        assert_eq!(build_authorization_header("id", "secret"), "Basic aWQ6c2VjcmV0");
    }

    #[test]
    fn default_endpoints() {
        let client = SpotifyClientBuilder::new("id").client_secret("secret").build();

        assert_eq!(client.token_url().as_str(), "https://accounts.spotify.com/api/token");
        assert_eq!(client.authorize_url().as_str(), "https://accounts.spotify.com/authorize");
        assert_eq!(
            client.currently_playing_url().as_str(),
            "https://api.spotify.com/v1/me/player/currently-playing"
        );
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let client = client("http://127.0.0.1:9000/accounts", "http://127.0.0.1:9000/api/v1");

        assert_eq!(client.token_url().as_str(), "http://127.0.0.1:9000/accounts/api/token");
        assert_eq!(
            client.currently_playing_url().as_str(),
            "http://127.0.0.1:9000/api/v1/me/player/currently-playing"
        );
    }

    #[test]
    fn invalid_grant_maps_to_invalid_refresh_token() {
        let err = map_refresh_token_error(Error::UnhandledAuthenticationError(
            AuthenticationErrorKind::InvalidGrant,
            "Refresh token revoked".to_owned(),
        ));

        assert!(matches!(err, Error::InvalidRefreshToken(description) if description == "Refresh token revoked"));
    }

    #[test]
    fn invalid_client_maps_to_invalid_client() {
        let err = map_refresh_token_error(Error::UnhandledAuthenticationError(
            AuthenticationErrorKind::InvalidClient,
            String::new(),
        ));

        assert!(matches!(err, Error::InvalidClient));
    }
}
