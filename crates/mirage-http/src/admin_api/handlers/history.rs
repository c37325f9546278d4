//! Recorded application request handler.

use crate::admin_api::types::{error_response, json_response, query_param, MessageResponse};
use crate::emulator::Emulator;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::info;

/// Query parameter naming the request type to look up
pub const REQUEST_TYPE_PARAM: &str = "requestType";

/// GET /applicationRequest?requestType=T - Take the last recorded request of a type
pub fn handle_last_request(query: Option<&str>, emulator: &Emulator) -> Response<Full<Bytes>> {
    let request_type = match query_param(query, REQUEST_TYPE_PARAM) {
        Some(t) if !t.is_empty() => t,
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("The {REQUEST_TYPE_PARAM} url parameter is required"),
            )
        }
    };

    info!(
        "Emulator request received from test client to obtain the last [{}] request",
        request_type
    );

    match emulator.last_request(&request_type) {
        Some(snapshot) => json_response(StatusCode::OK, &snapshot),
        None => json_response(
            StatusCode::NOT_FOUND,
            &MessageResponse {
                message: format!("[{request_type}] request was never sent to the emulator"),
            },
        ),
    }
}
