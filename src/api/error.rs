use crate::services::error::ExchangeError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Exchange(e) => match e {
                ExchangeError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
                ExchangeError::PayloadTooLarge { .. } => {
                    (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
                }
                // Unknown and expired tokens get the same response:
                // nothing about past existence leaks.
                ExchangeError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "Token not valid or file expired".to_string(),
                ),
                ExchangeError::Configuration(msg) => {
                    tracing::error!("configuration error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
                ExchangeError::Processing(msg) => {
                    tracing::error!("external processing failed: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Error during encryption".to_string(),
                    )
                }
                ExchangeError::OutputNotFound { listing } => {
                    tracing::error!(
                        "encrypted output not found; working directory contained {:?}",
                        listing
                    );
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Error during encryption".to_string(),
                    )
                }
                ExchangeError::Io(e) => {
                    tracing::error!("i/o error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
