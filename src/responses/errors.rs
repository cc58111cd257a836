// responses/errors.rs
use crate::errors::{EntityRef, ServerError};
use astra::{Body, Response, ResponseBuilder};
use serde::Serialize;
use tracing::{error, warn};

pub type ResultResp = Result<Response, ServerError>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicting_entity: Option<EntityRef>,
    retryable: bool,
}

/// Convert a ServerError into a JSON error response.
pub fn error_to_response(err: ServerError) -> Response {
    let status = err.status();
    if status >= 500 {
        error!(code = err.code(), "request failed: {err}");
    } else if status != 404 {
        warn!(code = err.code(), "request rejected: {err}");
    }

    let (conflicting_entity, retryable) = match &err {
        ServerError::Scheduling(e) => (e.conflicting_entity(), e.is_retryable()),
        _ => (None, false),
    };
    let body = ErrorBody {
        code: err.code(),
        message: err.to_string(),
        conflicting_entity,
        retryable,
    };
    let json = serde_json::to_string(&body)
        .unwrap_or_else(|_| format!(r#"{{"code":"{}"}}"#, body.code));

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(json))
        .unwrap_or_else(|_| Response::new(Body::empty()))
}
