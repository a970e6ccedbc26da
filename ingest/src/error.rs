use axum::response::{IntoResponse, Response};
use http::StatusCode;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    InvalidOffer(String),
    UnsupportedMediaType(String),
    NegotiationTimeout,
    Throw(String),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn invalid_offer<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::InvalidOffer(t.to_string())
    }

    pub fn unsupported_media_type<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::UnsupportedMediaType(t.to_string())
    }

    pub fn throw<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Throw(t.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidOffer(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::NegotiationTimeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Throw(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidOffer(err) => write!(f, "invalid offer: {err}"),
            AppError::UnsupportedMediaType(err) => f.write_str(err),
            AppError::NegotiationTimeout => f.write_str("ICE gathering timed out"),
            AppError::Throw(err) => f.write_str(err),
            AppError::InternalServerError(err) => write!(f, "{err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_and_server_errors() {
        assert_eq!(
            StatusCode::BAD_REQUEST,
            AppError::invalid_offer("empty body").status()
        );
        assert_eq!(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::unsupported_media_type("text/plain").status()
        );
        assert!(AppError::NegotiationTimeout.status().is_server_error());
        assert!(AppError::from(anyhow::anyhow!("create answer"))
            .status()
            .is_server_error());
    }
}
