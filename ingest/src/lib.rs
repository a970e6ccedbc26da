use std::future::Future;

use axum::extract::Request;
use axum::http::{header, HeaderValue};
use axum::middleware;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, Level};

pub use crate::route::AppState;
pub use crate::session::manager::Manager;

use crate::config::Config;
use crate::route::whip;

pub mod config;
pub mod recorder;

mod error;
mod route;
mod session;

/// The WHIP router with logging and, when enabled, CORS headers.
pub fn app(state: AppState) -> Router {
    let cors = state.config.http.cors;
    let mut app = whip::route()
        .layer(middleware::from_fn(http_log::print_request_response))
        .with_state(state);
    if cors {
        app = app.layer(middleware::map_response(cors_headers));
    }
    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let span = info_span!(
                    "http_request",
                    uri = ?request.uri(),
                    method = ?request.method(),
                    span_id = tracing::field::Empty,
                );
                span.record(
                    "span_id",
                    span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                );
                span
            })
            .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
            .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
    )
}

/// Serves WHIP on `listener` until `signal` resolves, then stops every
/// session so their recordings are finalized before returning.
pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(cfg);
    let sessions = state.sessions.clone();
    axum::serve(listener, app(state))
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));
    sessions.shutdown().await;
    info!("all sessions closed");
}

async fn cors_headers(mut res: Response) -> Response {
    let headers = res.headers_mut();
    let any = HeaderValue::from_static("*");
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, any.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, any);
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Location"),
    );
    res
}
