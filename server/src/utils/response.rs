use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Reply envelope the front end expects: `{status, message, data}`.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        status: StatusCode::OK.as_u16(),
        message: Some(message.into()),
        data: Some(data),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Lookup replies carry data only, with no message.
pub fn data<T>(data: T) -> Response
where
    T: Serialize,
{
    let body = ApiResponse {
        status: StatusCode::OK.as_u16(),
        message: None,
        data: Some(data),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn empty_success(message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        status: StatusCode::OK.as_u16(),
        message: Some(message.into()),
        data: None,
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(
    code: &str,
    message: impl Into<String>,
    details: Option<Value>,
    status: StatusCode,
) -> Response {
    let body = ApiErrorResponse {
        status: status.as_u16(),
        code: code.to_string(),
        message: message.into(),
        details,
    };

    (status, Json(body)).into_response()
}
