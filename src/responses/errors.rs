use crate::errors::ServerError;
use crate::responses::json::json_response;
use astra::Response;
use serde_json::json;

pub type ResultResp = Result<Response, ServerError>;

/// Client-facing message; server-side failures don't leak internals.
pub fn public_message(err: &ServerError) -> String {
    match err {
        ServerError::NotFound => "Not Found".to_string(),
        ServerError::BadRequest(msg)
        | ServerError::Unauthorized(msg)
        | ServerError::Forbidden(msg)
        | ServerError::Conflict(msg) => msg.clone(),
        ServerError::Config(msg) => format!("Server misconfigured: {msg}"),
        ServerError::Upstream(msg) => format!("Upstream service failed: {msg}"),
        ServerError::DbError(_) | ServerError::XlsxError(_) | ServerError::InternalError => {
            "Internal Server Error".to_string()
        }
    }
}

/// Convert a ServerError into a JSON error body for API routes.
pub fn json_error_response(err: ServerError) -> Response {
    let status = err.status();
    if status >= 500 {
        tracing::error!(status, error = %err, "request failed");
    }

    let body = json!({ "error": public_message(&err), "status": status });
    json_response(status, &body)
        .unwrap_or_else(|_| Response::new(astra::Body::from("Internal Server Error")))
}
