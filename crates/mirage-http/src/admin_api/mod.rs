//! HTTP surface of the emulator.
//!
//! One listener serves both the admin endpoints used by test clients and the
//! application traffic being emulated:
//! - Registering response rules (`POST /presetResponse`)
//! - Resetting transient rules and history (`DELETE /reset`)
//! - Taking the last recorded request of a type (`GET /applicationRequest`)
//!
//! Any other request is answered from the registered rules. Health and
//! metrics are served by a second, monitoring listener.

mod handlers;
mod router;
mod server;
pub(crate) mod types;

pub use server::{AdminApiServer, AppState};
