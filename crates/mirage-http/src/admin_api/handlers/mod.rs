//! Admin endpoint handlers.

pub mod history;
pub mod rules;
pub mod system;
