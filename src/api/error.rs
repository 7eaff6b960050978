use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors a request can surface. Anything that is not a client mistake
/// wraps the underlying failure and maps to a 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found")]
    NotFound,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Wire shape of every error response. `detail` is always present, null
/// when there is nothing to add.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub detail: Option<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::NotFound => ErrorBody {
                message: "Not found".to_string(),
                detail: None,
            },
            ApiError::BadRequest(detail) => ErrorBody {
                message: "Bad request".to_string(),
                detail: Some(detail.clone()),
            },
            ApiError::Internal(source) => ErrorBody {
                message: "Internal server error".to_string(),
                detail: Some(format!("{source:#}")),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(source) = &self {
            log::error!("request failed: {source:#}");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_a_null_detail() {
        let body = serde_json::to_value(ApiError::NotFound.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "message": "Not found", "detail": null })
        );
    }

    #[test]
    fn bad_request_carries_its_detail() {
        let body = serde_json::to_value(ApiError::BadRequest("No primary key for table logs".into()).body())
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "message": "Bad request",
                "detail": "No primary key for table logs"
            })
        );
    }

    #[test]
    fn statuses_match_variants() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::BadRequest(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
