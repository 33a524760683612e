//! A local callback listener that completes the authorization code flow without copy-pasting the redirect URL.
//!
//! Register the listener's address (`http://127.0.0.1:3000` by default) as a redirect URI in the Spotify application,
//! direct the user to the authorize URL and run [await_refresh_token]. Once Spotify redirects the browser back with a
//! code, the code is exchanged for tokens, the browser is shown a success page and the listener shuts down.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use log::{debug, error, info, warn};
use tokio::{net::TcpListener, sync::oneshot};

use crate::{
    client::{IncompleteAuthorizationCodeUserClient, RedirectParameters, UserTokens},
    config::RefreshToken,
    error::{Error, Result},
};

/// Where the auth callback binary saves the minted refresh token.
pub const TOKEN_FILE: &str = "spotify-token.txt";

/// How long the listener keeps serving after the outcome is known, so the browser gets its page.
pub const SHUTDOWN_DELAY: Duration = Duration::from_millis(1000);

const WAITING_PAGE: &str =
    "<h1>Waiting for authorization...</h1><p>Please complete the authorization in your browser.</p>";

type ResultSender = oneshot::Sender<Result<UserTokens>>;

#[derive(Clone)]
struct CallbackState {
    flow: Arc<IncompleteAuthorizationCodeUserClient>,
    result_tx: Arc<Mutex<Option<ResultSender>>>,
}

impl CallbackState {
    /// Reports the outcome. Only the first outcome is delivered.
    fn finish(&self, result: Result<UserTokens>) {
        let sender = match self.result_tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(sender) => {
                // the receiver is only gone if the listener is already shutting down
                let _ = sender.send(result);
            }
            None => debug!("Authorization already completed, ignoring callback"),
        }
    }
}

/// Builds the router that handles the redirect back to `/`. The outcome of the flow is sent through `result_tx`: the
/// tokens once a code has been exchanged, or [AuthorizationDenied](Error::AuthorizationDenied) if the user refused.
///
/// A failed exchange is shown to the browser as a 500 page but isn't reported, so the user can retry.
pub fn callback_router(
    flow: Arc<IncompleteAuthorizationCodeUserClient>,
    result_tx: oneshot::Sender<Result<UserTokens>>,
) -> Router {
    Router::new().route("/", get(callback)).with_state(CallbackState {
        flow,
        result_tx: Arc::new(Mutex::new(Some(result_tx))),
    })
}

async fn callback(State(state): State<CallbackState>, Query(params): Query<HashMap<String, String>>) -> Response {
    match RedirectParameters::from_query_pairs(params) {
        RedirectParameters::Empty => Html(WAITING_PAGE).into_response(),

        RedirectParameters::Error { error, description } => {
            let reason = description.unwrap_or(error);
            warn!("Authorization denied: {}", reason);

            let page = format!(
                "<h1>Authorization denied</h1><p>{}</p><p>You can close this window.</p>",
                escape_html(&reason)
            );

            state.finish(Err(Error::AuthorizationDenied(reason)));
            Html(page).into_response()
        }

        RedirectParameters::Code { code, state: returned_state } => {
            info!("Received authorization code, exchanging for a refresh token");

            // a redirect without state can't be ours
            let returned_state = returned_state.unwrap_or_default();

            match state.flow.finalize(&code, &returned_state).await {
                Ok(tokens) => {
                    let page = format!(
                        "<h1>Success!</h1><p>Your refresh token has been generated. Check your terminal!</p>\
                         <p>Token length: {} characters</p><p>You can close this window.</p>",
                        tokens.refresh_token.as_str().len()
                    );

                    state.finish(Ok(tokens));
                    Html(page).into_response()
                }

                Err(err) => {
                    error!("Failed to exchange authorization code: {}", err);

                    let page = format!("<h1>Error</h1><p>{}</p>", escape_html(&err.to_string()));
                    (StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response()
                }
            }
        }
    }
}

/// Serves the callback on `listener` until the flow completes, then shuts down after [SHUTDOWN_DELAY].
pub async fn await_refresh_token(
    flow: IncompleteAuthorizationCodeUserClient,
    listener: TcpListener,
) -> Result<UserTokens> {
    let (result_tx, result_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    info!("Waiting for the authorization callback on http://{}", listener.local_addr()?);

    let app = callback_router(Arc::new(flow), result_tx);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let result = match result_rx.await {
        Ok(result) => result,
        // the sender lives in the router, so the server has stopped on its own
        Err(_) => {
            return match server.await {
                Ok(Err(err)) => Err(err.into()),
                _ => Err(Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "callback listener stopped unexpectedly",
                ))),
            };
        }
    };

    tokio::time::sleep(SHUTDOWN_DELAY).await;
    info!("Shutting down callback listener");

    let _ = shutdown_tx.send(());
    match server.await {
        Ok(Err(err)) => warn!("Callback listener failed while shutting down: {}", err),
        Err(err) => warn!("Callback listener task failed: {}", err),
        Ok(Ok(())) => {}
    }

    result
}

/// Writes the refresh token to `path`, replacing whatever was there.
pub async fn save_refresh_token<P>(path: P, refresh_token: &RefreshToken) -> Result<()>
where
    P: AsRef<Path>,
{
    tokio::fs::write(path.as_ref(), refresh_token.as_str()).await?;
    debug!("Saved refresh token to {}", path.as_ref().display());

    Ok(())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }

    escaped
}
