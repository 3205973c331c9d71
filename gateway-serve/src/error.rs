//! Maps [`GatewayError`] onto an HTTP status + JSON body. A local newtype
//! because neither `GatewayError` nor `IntoResponse` live in this crate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::error::GatewayError;
use serde_json::json;

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Limit(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::PolicyBlock(_) => StatusCode::FORBIDDEN,
            GatewayError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            GatewayError::Upstream { .. } | GatewayError::Tool(_) => StatusCode::BAD_GATEWAY,
            GatewayError::TransientInfra(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({"success": false, "message": self.0.to_string()}))).into_response()
    }
}
