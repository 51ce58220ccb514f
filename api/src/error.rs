use auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portfolio_engine::TradeError;
use serde_json::json;

use crate::services::portfolio::PortfolioError;

/// HTTP-facing error taxonomy. Validation problems carry their message to the
/// client; storage problems are logged server-side and surface as an opaque
/// 500 so internal detail never leaks.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not found" })),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response(),
            ApiError::Storage(err) => {
                tracing::error!(error = %err, "request failed on storage");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<TradeError> for ApiError {
    fn from(err: TradeError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized,
            AuthError::InvalidUsername | AuthError::UsernameTaken => {
                ApiError::Validation(err.to_string())
            }
            AuthError::Internal(detail) => ApiError::Storage(anyhow::anyhow!(detail)),
        }
    }
}

impl From<PortfolioError> for ApiError {
    fn from(err: PortfolioError) -> Self {
        match err {
            PortfolioError::NoPortfolio | PortfolioError::UnknownAsset => ApiError::NotFound,
            PortfolioError::UnknownCurrency(_)
            | PortfolioError::NotReferenceCurrency(_)
            | PortfolioError::NegativeCash => ApiError::Validation(err.to_string()),
            PortfolioError::Trade(trade) => trade.into(),
            PortfolioError::Storage(storage) => ApiError::Storage(storage),
        }
    }
}
