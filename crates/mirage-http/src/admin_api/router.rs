//! Route dispatch logic for the Admin API.
//!
//! Admin endpoints are matched on exact method and path; every other request
//! is application traffic and goes to the emulator. Health and metrics live on
//! the separate monitoring listener so they never shadow application rules.

use crate::admin_api::handlers::{history, rules, system};
use crate::admin_api::server::AppState;
use crate::admin_api::types::not_found;
use crate::emulator::handle_application_request;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use tracing::debug;

/// Admin endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdminRoute {
    /// POST /presetResponse
    PresetResponse,
    /// DELETE /reset
    Reset,
    /// GET /applicationRequest
    ApplicationRequest,
}

impl AdminRoute {
    fn parse(method: &Method, path: &str) -> Option<Self> {
        match (method, path) {
            (&Method::POST, "/presetResponse") => Some(AdminRoute::PresetResponse),
            (&Method::DELETE, "/reset") => Some(AdminRoute::Reset),
            (&Method::GET, "/applicationRequest") => Some(AdminRoute::ApplicationRequest),
            _ => None,
        }
    }
}

/// Monitoring endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitoringRoute {
    /// GET /health
    Health,
    /// GET /metrics
    Metrics,
}

impl MonitoringRoute {
    fn parse(method: &Method, path: &str) -> Option<Self> {
        match (method, path) {
            (&Method::GET, "/health") => Some(MonitoringRoute::Health),
            (&Method::GET, "/metrics") => Some(MonitoringRoute::Metrics),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Display,
{
    let emulator = state.emulator.as_ref();
    let response = match AdminRoute::parse(req.method(), req.uri().path()) {
        Some(route) => {
            debug!("Admin API: {} {}", req.method(), req.uri().path());
            match route {
                AdminRoute::PresetResponse => rules::handle_preset_response(req, emulator).await,
                AdminRoute::Reset => rules::handle_reset(emulator),
                AdminRoute::ApplicationRequest => {
                    history::handle_last_request(req.uri().query(), emulator)
                }
            }
        }
        None => handle_application_request(req, emulator, &state.uri_override_header).await,
    };
    Ok(response)
}

/// Router for the monitoring listener
pub async fn route_monitoring_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let emulator = state.emulator.as_ref();
    let response = match MonitoringRoute::parse(req.method(), req.uri().path()) {
        Some(MonitoringRoute::Health) => system::handle_health(emulator),
        Some(MonitoringRoute::Metrics) => system::handle_metrics(emulator),
        None => not_found(),
    };
    Ok(response)
}
