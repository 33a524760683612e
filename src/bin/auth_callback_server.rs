//! Mints a refresh token by catching Spotify's redirect on a local listener. The redirect URI (by default
//! `http://127.0.0.1:3000`) must be registered in the Spotify application.

use dotenvy::dotenv;
use log::error;
use nowplaying::{
    bootstrap::{await_refresh_token, save_refresh_token, TOKEN_FILE},
    client::SpotifyClientWithSecret,
    config::{redirect_uri_from_env, Credentials, Endpoints, REDIRECT_URI_VAR, REFRESH_TOKEN_VAR},
    scope::NOW_PLAYING_SCOPES,
    Error, Result,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    if let Err(err) = run().await {
        error!("Failed to mint a refresh token: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let credentials = Credentials::from_env()?;
    let endpoints = Endpoints::from_env()?;
    let redirect_uri = redirect_uri_from_env()?;

    let bind_address = redirect_uri
        .socket_addrs(|| None)
        .ok()
        .and_then(|addrs| addrs.into_iter().next())
        .ok_or_else(|| Error::InvalidConfiguration(REDIRECT_URI_VAR, "no host and port".to_owned()))?;

    let listener = TcpListener::bind(bind_address).await?;

    let incomplete_auth_code_client = SpotifyClientWithSecret::from_credentials(&credentials, endpoints)
        .authorization_code_client(redirect_uri.as_str())
        .scopes(NOW_PLAYING_SCOPES)
        .build();

    println!("Visit this URL to authorize:\n");
    println!("{}\n", incomplete_auth_code_client.get_authorize_url());
    println!("Waiting for authorization...\n");

    let tokens = await_refresh_token(incomplete_auth_code_client, listener).await?;
    let refresh_token = tokens.refresh_token.as_str();

    println!("Add this to your .env file:\n");
    println!("{}={}\n", REFRESH_TOKEN_VAR, refresh_token);
    println!("Token length: {} characters\n", refresh_token.len());

    save_refresh_token(TOKEN_FILE, &tokens.refresh_token).await?;
    println!("Token also saved to: {}", TOKEN_FILE);

    Ok(())
}
