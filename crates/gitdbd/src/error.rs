//! Maps engine errors onto the HTTP contract (§6): every failure is a 400
//! with `{"error": "<message>"}`, since the facade defines no other status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gitdb_core::error::GitDbError;

pub struct ApiError(pub GitDbError);

impl From<GitDbError> for ApiError {
    fn from(err: GitDbError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
