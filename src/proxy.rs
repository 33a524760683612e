//! The proxy endpoint: `GET /api/spotify/now-playing`.
//!
//! The endpoint always answers 200 with a [PlaybackSnapshot]. Every failure (token exchange, transport, upstream error
//! status, undecodable body) is logged here and collapsed into `{"isPlaying": false}`, the same answer as when nothing
//! is playing.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{debug, info, warn};

use crate::{
    client::{PlaybackSource, RefreshingUserClient},
    config::Config,
    error::Result,
    model::snapshot::PlaybackSnapshot,
};

pub const NOW_PLAYING_ROUTE: &str = "/api/spotify/now-playing";

const NO_CACHE_HEADERS: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

#[derive(Clone)]
struct ProxyState {
    source: Arc<dyn PlaybackSource>,
}

/// Builds the router serving the now playing endpoint from the given source.
pub fn router<S>(source: S) -> Router
where
    S: PlaybackSource + 'static,
{
    Router::new()
        .route(NOW_PLAYING_ROUTE, get(now_playing))
        .with_state(ProxyState {
            source: Arc::new(source),
        })
}

/// Ask the source for the currently playing item and normalize it. Never fails.
pub async fn get_currently_playing(source: &dyn PlaybackSource) -> PlaybackSnapshot {
    match source.currently_playing().await {
        Ok(Some(currently_playing)) => PlaybackSnapshot::from(currently_playing),
        Ok(None) => {
            debug!("No playback, returning isPlaying: false");
            PlaybackSnapshot::not_playing()
        }
        Err(err) => {
            warn!("Error fetching now playing, returning isPlaying: false: {}", err);
            PlaybackSnapshot::not_playing()
        }
    }
}

async fn now_playing(State(state): State<ProxyState>) -> Response {
    let snapshot = get_currently_playing(state.source.as_ref()).await;
    (NO_CACHE_HEADERS, Json(snapshot)).into_response()
}

/// Runs the proxy server until interrupted.
pub async fn serve(config: Config) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!(
        "Serving now playing on http://{}{}",
        listener.local_addr()?,
        NOW_PLAYING_ROUTE
    );

    let app = router(RefreshingUserClient::new(&config));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }

            info!("Shutting down");
        })
        .await?;

    Ok(())
}
