//! HTTP binding for application traffic.
//!
//! Converts hyper requests into `RequestSnapshot`s and emulator results back
//! into hyper responses.

use super::core::Emulator;
use super::types::{EmulatorError, MultiMap, RequestSnapshot, ResponseDefinition};
use crate::admin_api::types::{build_response, error_response};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use hyper::http::request::Parts;
use hyper::{Request, Response, StatusCode};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Header whose value replaces the request's path and query when present.
pub const URI_OVERRIDE_HEADER: &str = "X-Request-URI-Override";

/// Serve one application request through the emulator.
pub async fn handle_application_request<B>(
    req: Request<B>,
    emulator: &Emulator,
    uri_override_header: &str,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read application request body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "There was an error parsing the body of the application request",
            );
        }
    };

    let snapshot = build_snapshot(&parts, &body, uri_override_header);
    info!(
        "Application request received for URI [{}], {} [{}]",
        parts.uri.path(),
        uri_override_header,
        parts
            .headers
            .get(uri_override_header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    );

    match emulator.serve(snapshot).await {
        Ok(response) => into_http_response(&response),
        Err(e) => error_into_response(&e),
    }
}

/// Capture method, path, query parameters, headers and body.
///
/// A non-empty override header supplies the path and query instead of the
/// request URI.
pub fn build_snapshot(parts: &Parts, body: &[u8], uri_override_header: &str) -> RequestSnapshot {
    let uri_override = parts
        .headers
        .get(uri_override_header)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|v| !v.is_empty());

    let (path, query) = match uri_override.as_deref() {
        Some(value) => {
            debug!("Using URI override [{}]", value);
            let (path, query) = split_uri(value);
            (path.to_string(), query.map(str::to_string))
        }
        None => (
            parts.uri.path().to_string(),
            parts.uri.query().map(str::to_string),
        ),
    };

    let mut headers = MultiMap::new();
    for (name, value) in &parts.headers {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    RequestSnapshot {
        method: parts.method.as_str().to_string(),
        url: path,
        params: query.as_deref().map(parse_query_string).unwrap_or_default(),
        headers,
        body: String::from_utf8_lossy(body).into_owned(),
    }
}

/// Split a URI reference into path and optional query, dropping any scheme,
/// authority and fragment.
fn split_uri(uri: &str) -> (&str, Option<&str>) {
    let without_fragment = uri.split_once('#').map_or(uri, |(before, _)| before);
    let relative = match without_fragment.split_once("://") {
        Some((_, rest)) => rest.find(['/', '?']).map_or("", |i| &rest[i..]),
        None => without_fragment,
    };
    match relative.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (relative, None),
    }
}

/// Parse a query string into a multi-valued map, URL-decoding names and values.
///
/// Pairs without `=` are kept with an empty value.
pub fn parse_query_string(query: &str) -> MultiMap {
    let mut params = MultiMap::new();
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.entry(decode(key)).or_default().push(decode(value));
    }
    params
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

/// Build the HTTP response for a served rule.
///
/// `content-length` is left to hyper; header names or values hyper rejects
/// are skipped.
pub fn into_http_response(definition: &ResponseDefinition) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(definition.status_code).unwrap_or_else(|_| {
        warn!(
            "Configured status code {} is invalid, responding 500",
            definition.status_code
        );
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut response = build_response(status, definition.body.clone());
    let headers = response.headers_mut();
    for (name, values) in &definition.headers {
        if name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            continue;
        }
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            warn!("Skipping invalid response header name [{}]", name);
            continue;
        };
        for value in values {
            match HeaderValue::from_str(value) {
                Ok(header_value) => {
                    headers.append(header_name.clone(), header_value);
                }
                Err(_) => warn!("Skipping invalid value for response header [{}]", name),
            }
        }
    }
    response
}

/// Map a serve failure onto an error response.
pub fn error_into_response(error: &EmulatorError) -> Response<Full<Bytes>> {
    let status = match error {
        EmulatorError::NoMatchingRule(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &error.to_string())
}
