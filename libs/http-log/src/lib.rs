use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use tracing::{error, info, trace, warn};

/// Signaling waits for ICE gathering, so a few seconds is still normal.
const SLOW_EXCHANGE: Duration = Duration::from_secs(3);

/// Logs one line per request: method, uri, status and latency.
/// Bodies (SDP offers and answers) are logged at `trace`.
pub async fn print_request_response(
    req: Request,
    next: Next,
) -> std::result::Result<impl IntoResponse, (StatusCode, String)> {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let (parts, body) = req.into_parts();
    let bytes = buffer_and_print("request", &parts.headers, body).await?;
    let req = Request::from_parts(parts, Body::from(bytes));

    let res = next.run(req).await;
    let (parts, body) = res.into_parts();
    let bytes = buffer_and_print("response", &parts.headers, body).await?;
    let res = Response::from_parts(parts, Body::from(bytes));

    let elapsed = start.elapsed();
    let status = res.status();
    if status.is_server_error() {
        error!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            elapsed.as_millis()
        );
    } else if status.is_client_error() || elapsed > SLOW_EXCHANGE {
        warn!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            elapsed.as_millis()
        );
    } else {
        info!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            elapsed.as_millis()
        );
    }

    Ok(res)
}

async fn buffer_and_print<B>(
    direction: &str,
    headers: &HeaderMap,
    body: B,
) -> std::result::Result<Bytes, (StatusCode, String)>
where
    B: axum::body::HttpBody<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("failed to read {direction} body: {err}"),
            ));
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(body) => trace!("{direction} headers = {headers:?} body = {body:?}"),
        Err(_) => trace!(
            "{direction} headers = {headers:?} body = <{} bytes binary>",
            bytes.len()
        ),
    }

    Ok(bytes)
}
