use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use http::{header, HeaderMap, StatusCode};
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::error::AppError;
use crate::route::AppState;

pub const PATH: &str = "/";
const SDP_CONTENT_TYPE: &str = "application/sdp";

pub fn route() -> Router<AppState> {
    Router::new().route(PATH, post(whip).options(preflight))
}

async fn whip(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> crate::error::Result<Response<String>> {
    // WHIP clients send application/sdp, but plain curl uploads are accepted too
    if let Some(content_type) = headers.get(header::CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or_default();
        let mime = content_type.split(';').next().unwrap_or_default().trim();
        if !mime.eq_ignore_ascii_case(SDP_CONTENT_TYPE) {
            return Err(AppError::unsupported_media_type(format!(
                "Content-Type must be {SDP_CONTENT_TYPE}"
            )));
        }
    }
    if body.trim().is_empty() {
        return Err(AppError::invalid_offer("empty body"));
    }
    let offer = RTCSessionDescription::offer(body).map_err(AppError::invalid_offer)?;
    let (answer, _session) = state.sessions.negotiate(offer).await?;
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header(header::CONTENT_TYPE, SDP_CONTENT_TYPE)
        .header(header::LOCATION, PATH)
        .body(answer.sdp)?)
}

/// Pre-flight only: never negotiates.
async fn preflight(State(state): State<AppState>) -> crate::error::Result<Response<String>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, "OPTIONS, POST");
    for link in iceserver::link_header(&state.config.ice_servers) {
        builder = builder.header(header::LINK, link);
    }
    Ok(builder.body(String::new())?)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::route::AppState;

    fn state() -> AppState {
        let mut cfg = Config::default();
        cfg.ice_servers = vec![iceserver::IceServer {
            urls: vec!["stun:stun.l.google.com:19302".to_string()],
            ..Default::default()
        }];
        AppState::new(cfg)
    }

    #[tokio::test]
    async fn preflight_creates_no_session() {
        let state = state();
        let res = crate::app(state.clone())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(res.status().is_success());
        assert_eq!("*", res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN]);
        assert_eq!("*", res.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]);
        assert_eq!(
            "<stun:stun.l.google.com:19302>; rel=\"ice-server\"",
            res.headers()[header::LINK]
        );
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn garbage_offer_is_a_client_error() {
        let state = state();
        let res = crate::app(state.clone())
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/sdp")
                    .body(Body::from("this is not sdp"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, res.status());
        assert_eq!("*", res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN]);
        assert!(state.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn empty_offer_is_a_client_error() {
        let res = crate::app(state())
            .oneshot(Request::post("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(StatusCode::BAD_REQUEST, res.status());
    }

    #[tokio::test]
    async fn wrong_content_type_is_rejected() {
        let res = crate::app(state())
            .oneshot(
                Request::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(StatusCode::UNSUPPORTED_MEDIA_TYPE, res.status());
    }
}
