//! Mints a refresh token by hand: open the printed URL, approve the application and paste the URL the browser was
//! redirected to.

use dotenvy::dotenv;
use log::error;
use nowplaying::{
    client::SpotifyClientWithSecret,
    config::{redirect_uri_from_env, Credentials, Endpoints, CLIENT_ID_VAR, CLIENT_SECRET_VAR, REFRESH_TOKEN_VAR},
    scope::NOW_PLAYING_SCOPES,
    Result,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

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
    let mut stdin = BufReader::new(io::stdin()).lines();

    let client_id = env_or_prompt(&mut stdin, CLIENT_ID_VAR, "Client ID").await?;
    let client_secret = env_or_prompt(&mut stdin, CLIENT_SECRET_VAR, "Client secret").await?;
    let redirect_uri = redirect_uri_from_env()?;

    let credentials = Credentials::new(client_id.as_str(), client_secret.as_str());
    let spotify_client = SpotifyClientWithSecret::from_credentials(&credentials, Endpoints::from_env()?);

    let incomplete_auth_code_client = spotify_client
        .authorization_code_client(redirect_uri.as_str())
        .scopes(NOW_PLAYING_SCOPES)
        .build();

    println!("Open this URL in a browser and approve the application:\n");
    println!("{}\n", incomplete_auth_code_client.get_authorize_url());

    let redirect_url = prompt(&mut stdin, "Paste the full URL you were redirected to").await?;
    let tokens = incomplete_auth_code_client
        .finalize_from_redirect(&redirect_url)
        .await?;

    println!("\nAdd these to your .env file:\n");
    println!("{}={}", CLIENT_ID_VAR, client_id);
    println!("{}={}", CLIENT_SECRET_VAR, client_secret);
    println!("{}={}", REFRESH_TOKEN_VAR, tokens.refresh_token.as_str());

    Ok(())
}

type Lines = io::Lines<BufReader<io::Stdin>>;

async fn env_or_prompt(stdin: &mut Lines, var: &str, label: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => prompt(stdin, label).await,
    }
}

async fn prompt(stdin: &mut Lines, label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(format!("{}: ", label).as_bytes()).await?;
    stdout.flush().await?;

    let line = stdin.next_line().await?.unwrap_or_default();
    Ok(line.trim().to_owned())
}
