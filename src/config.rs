//! Process-wide configuration, read once at startup and passed to whatever needs it.
//!
//! Every value comes from the environment (after loading `.env` with `dotenvy` in the binaries):
//!
//! | variable                | meaning                         | default                        |
//! |-------------------------|---------------------------------|--------------------------------|
//! | `SPOTIFY_CLIENT_ID`     | application client ID           | required                       |
//! | `SPOTIFY_CLIENT_SECRET` | application client secret       | required                       |
//! | `SPOTIFY_REFRESH_TOKEN` | the user's refresh token        | required by the proxy server   |
//! | `NOW_PLAYING_BIND`      | proxy server bind address       | `127.0.0.1:8080`               |
//! | `SPOTIFY_ACCOUNTS_URL`  | accounts service base URL       | `https://accounts.spotify.com/`|
//! | `SPOTIFY_API_URL`       | Web API base URL                | `https://api.spotify.com/v1/`  |
//! | `SPOTIFY_REDIRECT_URI`  | redirect URI for the bootstrap  | `http://127.0.0.1:3000`        |
//! | `NOW_PLAYING_URL`       | proxy endpoint the widget polls | `http://127.0.0.1:8080/api/spotify/now-playing` |

use std::{fmt, net::SocketAddr};

use reqwest::Url;

use crate::{
    client::{ACCOUNTS_BASE_URL, API_BASE_URL},
    error::{Error, Result},
    util::redact::redact,
};

pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";
pub const REFRESH_TOKEN_VAR: &str = "SPOTIFY_REFRESH_TOKEN";
pub const BIND_VAR: &str = "NOW_PLAYING_BIND";
pub const ACCOUNTS_URL_VAR: &str = "SPOTIFY_ACCOUNTS_URL";
pub const API_URL_VAR: &str = "SPOTIFY_API_URL";
pub const REDIRECT_URI_VAR: &str = "SPOTIFY_REDIRECT_URI";
pub const WIDGET_URL_VAR: &str = "NOW_PLAYING_URL";

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3000";
pub const DEFAULT_WIDGET_URL: &str = "http://127.0.0.1:8080/api/spotify/now-playing";

/// The application's client ID and secret. The secret is never printed by the `Debug` implementation.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Base URLs of the two Spotify hosts. Overridable so tests can point the client at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub accounts: Url,
    pub api: Url,
}

/// Configuration for the proxy server.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub refresh_token: RefreshToken,
    pub endpoints: Endpoints,
    pub bind_address: SocketAddr,
}

/// A refresh token. The `Debug` implementation only shows a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl Credentials {
    pub fn new<S, T>(client_id: S, client_secret: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads the credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            client_id: required(&lookup, CLIENT_ID_VAR)?,
            client_secret: required(&lookup, CLIENT_SECRET_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

impl RefreshToken {
    pub fn new<S>(token: S) -> Self
    where
        S: Into<String>,
    {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefreshToken({})", redact(&self.0))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            // both constants are valid absolute URLs
            accounts: Url::parse(ACCOUNTS_BASE_URL).expect("invalid accounts base URL (this is likely a bug)"),
            api: Url::parse(API_BASE_URL).expect("invalid API base URL (this is likely a bug)"),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at the given base URLs. A missing trailing slash is added so relative paths join under the
    /// base instead of replacing its last segment.
    pub fn new(accounts: &str, api: &str) -> Result<Self> {
        Ok(Self {
            accounts: parse_base_url(ACCOUNTS_URL_VAR, accounts)?,
            api: parse_base_url(API_URL_VAR, api)?,
        })
    }

    /// Reads the base URL overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let accounts = lookup(ACCOUNTS_URL_VAR).unwrap_or_else(|| ACCOUNTS_BASE_URL.to_owned());
        let api = lookup(API_URL_VAR).unwrap_or_else(|| API_BASE_URL.to_owned());

        Self::new(&accounts, &api)
    }
}

impl Config {
    pub fn new(credentials: Credentials, refresh_token: RefreshToken) -> Self {
        Self {
            credentials,
            refresh_token,
            endpoints: Endpoints::default(),
            // constant is a valid socket address
            bind_address: DEFAULT_BIND.parse().expect("invalid default bind address (this is likely a bug)"),
        }
    }

    pub fn endpoints(self, endpoints: Endpoints) -> Self {
        Self { endpoints, ..self }
    }

    pub fn bind_address(self, bind_address: SocketAddr) -> Self {
        Self { bind_address, ..self }
    }

    /// Reads the whole configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::from_lookup(&lookup)?;
        let refresh_token = RefreshToken::new(required(&lookup, REFRESH_TOKEN_VAR)?);
        let endpoints = Endpoints::from_lookup(&lookup)?;

        let bind = lookup(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let bind_address = bind
            .parse()
            .map_err(|err: std::net::AddrParseError| Error::InvalidConfiguration(BIND_VAR, err.to_string()))?;

        Ok(Self {
            credentials,
            refresh_token,
            endpoints,
            bind_address,
        })
    }
}

/// The redirect URI registered with the Spotify application.
pub fn redirect_uri_from_env() -> Result<Url> {
    let value = env_lookup(REDIRECT_URI_VAR).unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_owned());
    Url::parse(&value).map_err(|err| Error::InvalidConfiguration(REDIRECT_URI_VAR, err.to_string()))
}

/// The proxy endpoint URL the widget polls.
pub fn widget_url_from_env() -> Result<Url> {
    let value = env_lookup(WIDGET_URL_VAR).unwrap_or_else(|| DEFAULT_WIDGET_URL.to_owned());
    Url::parse(&value).map_err(|err| Error::InvalidConfiguration(WIDGET_URL_VAR, err.to_string()))
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => Err(Error::MissingConfiguration(name)),
    }
}

fn parse_base_url(name: &'static str, value: &str) -> Result<Url> {
    let value = if value.ends_with('/') {
        value.to_owned()
    } else {
        format!("{}/", value)
    };

    Url::parse(&value).map_err(|err| Error::InvalidConfiguration(name, err.to_string()))
}
