//! Rule registry, request history and the match-and-respond engine.
//!
//! ## Module Structure
//!
//! - `types`: Wire documents, request snapshots and `EmulatorError`
//! - `registry`: Priority-ordered predicates with their canned responses
//! - `history`: Bounded per-request-type request history
//! - `core`: The `Emulator` orchestrator
//! - `presets`: Loading rule documents from a directory at startup
//! - `handler`: HTTP binding for application traffic

mod core;
mod handler;
mod history;
mod presets;
mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use self::core::Emulator;
pub use handler::{
    build_snapshot, error_into_response, handle_application_request, into_http_response,
    parse_query_string, URI_OVERRIDE_HEADER,
};
pub use history::{RequestHistoryStore, DEFAULT_HISTORY_CAPACITY};
pub use registry::{CannedResponse, Resolution, ResponseRegistry};
pub use types::{
    Delay, EmulatorError, Lifetime, MultiMap, PredicateDefinition, RequestSnapshot,
    ResponseDefinition, ResponseRule,
};
