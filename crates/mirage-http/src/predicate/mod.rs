//! Rule DSL and compiled request predicates.
//!
//! Registration flows one way through this module:
//!
//! ```text
//! DSL line → Rule (rule) → RuleTest (factory) → RequestPredicate (builder)
//! ```
//!
//! # Module Structure
//!
//! - `rule` - DSL line parsing into `Rule`
//! - `string_matcher` - Compiled operators (is, contains, startsWith, endsWith, matches)
//! - `factory` - Field extraction plus operator for one line
//! - `request` - The AND-combined `RequestPredicate`
//! - `builder` - Validation and construction from a `ResponseRule`

mod builder;
mod factory;
mod request;
mod rule;
mod string_matcher;

pub use builder::{build_predicate, MIN_PRIORITY};
pub use factory::RuleTest;
pub use request::RequestPredicate;
pub use rule::{sanitise_value, Operator, Rule, RuleType};
pub use string_matcher::CompiledStringMatcher;
