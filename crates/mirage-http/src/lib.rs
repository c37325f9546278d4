// Library exports for the binary, integration tests and benchmarks

pub mod admin_api;
pub mod config;
pub mod emulator;
pub mod metrics;
pub mod predicate;
