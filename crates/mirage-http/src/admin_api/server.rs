//! HTTP servers for admin/application traffic and for monitoring.

use crate::admin_api::router::{route_monitoring_request, route_request};
use crate::emulator::Emulator;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// State shared by every connection
#[derive(Debug)]
pub struct AppState {
    pub emulator: Arc<Emulator>,
    /// Header whose value replaces the application request URI
    pub uri_override_header: String,
}

/// Which router a listener dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    /// Admin endpoints plus application traffic
    Emulator,
    /// `/health` and `/metrics`
    Monitoring,
}

impl Surface {
    fn name(self) -> &'static str {
        match self {
            Surface::Emulator => "Mirage",
            Surface::Monitoring => "Monitoring",
        }
    }
}

/// Mirage server bound to one listener
pub struct AdminApiServer {
    listener: TcpListener,
    state: Arc<AppState>,
    surface: Surface,
}

impl AdminApiServer {
    /// Bind the admin and application listener; port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, state: AppState) -> Result<Self, anyhow::Error> {
        Self::bind_surface(addr, Arc::new(state), Surface::Emulator).await
    }

    /// Bind the health and metrics listener for the same emulator.
    pub async fn bind_monitoring(
        addr: SocketAddr,
        state: Arc<AppState>,
    ) -> Result<Self, anyhow::Error> {
        Self::bind_surface(addr, state, Surface::Monitoring).await
    }

    async fn bind_surface(
        addr: SocketAddr,
        state: Arc<AppState>,
        surface: Surface,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            state,
            surface,
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections until the emulator is shut down.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addr = self.local_addr()?;
        let name = self.surface.name();
        let surface = self.surface;
        info!("{} listening on http://{}", name, addr);

        let mut shutdown_rx = self.state.emulator.subscribe_shutdown();
        if self.state.emulator.is_shutting_down() {
            return Ok(());
        }

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req| {
                                    let state = Arc::clone(&state);
                                    async move {
                                        match surface {
                                            Surface::Emulator => route_request(req, state).await,
                                            Surface::Monitoring => {
                                                route_monitoring_request(req, state).await
                                            }
                                        }
                                    }
                                });
                                if let Err(e) = http1::Builder::new()
                                    .serve_connection(io, service)
                                    .await
                                {
                                    debug!("Connection error from {}: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error on {}: {}", addr, e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("{} on {} shutting down", name, addr);
                    break;
                }
            }
        }
        Ok(())
    }
}
