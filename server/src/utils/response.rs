use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// One entry of a `{ "errors": [...] }` body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

impl FieldError {
    pub fn new(param: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            param: Some(param.into()),
        }
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            param: None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorListResponse {
    pub errors: Vec<FieldError>,
}

#[derive(Serialize)]
pub struct ErrorMessageResponse {
    pub error: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn success<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::OK, Json(data)).into_response()
}

pub fn created<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::CREATED, Json(data)).into_response()
}

pub fn empty_success(message: impl Into<String>) -> Response {
    let body = MessageResponse {
        message: message.into(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error_list(errors: Vec<FieldError>, status: StatusCode) -> Response {
    (status, Json(ErrorListResponse { errors })).into_response()
}

pub fn error_message(code: &str, message: impl Into<String>, status: StatusCode) -> Response {
    let body = ErrorMessageResponse {
        error: message.into(),
        code: code.to_string(),
    };

    (status, Json(body)).into_response()
}
