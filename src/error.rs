// Financials API - HTTP Errors
// Every failure reaches the client as `{"error": "..."}`; storage details stay
// in the server log.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::db::{Document, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// No record has the requested id; carries the record label
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Anything that went wrong in the store, reported with a fixed message
    #[error("{message}")]
    Storage {
        message: &'static str,
        #[source]
        source: StoreError,
    },

    /// The request body was rejected before reaching a handler
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// JSON object request body. Parse failures (bad syntax, wrong content
/// type, a body that is not an object) are answered here, the same way for
/// every route. Field values are cast later, against the record schema.
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub Document);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Document>::from_request(req, state).await {
            Ok(Json(doc)) => Ok(JsonBody(doc)),
            Err(rejection) => {
                let (status, message) = match rejection {
                    JsonRejection::JsonDataError(_) => (
                        StatusCode::BAD_REQUEST,
                        "Request body must be a JSON object".to_string(),
                    ),
                    other => (other.status(), other.body_text()),
                };
                tracing::warn!(%status, "Rejected request body: {message}");
                Err(ApiError::Rejected { status, message })
            }
        }
    }
}
