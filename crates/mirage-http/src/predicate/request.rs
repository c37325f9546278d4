//! Compiled request predicate.

use super::factory::RuleTest;
use crate::emulator::{Lifetime, RequestSnapshot};
use std::fmt;
use std::hash::{Hash, Hasher};

/// AND of compiled rule tests, tagged with registration metadata.
///
/// Identity is structural over the rule texts, priority, lifetime and request
/// type: two predicates built from the same declaration compare equal and
/// hash alike, so either can be used to look up the other's response.
#[derive(Debug, Clone)]
pub struct RequestPredicate {
    tests: Vec<RuleTest>,
    rules: Vec<String>,
    priority: u32,
    lifetime: Lifetime,
    request_type: String,
}

impl RequestPredicate {
    pub(crate) fn new(
        tests: Vec<RuleTest>,
        rules: Vec<String>,
        priority: u32,
        lifetime: Lifetime,
        request_type: String,
    ) -> Self {
        Self {
            tests,
            rules,
            priority,
            lifetime,
            request_type,
        }
    }

    /// True when every rule accepts the snapshot; stops at the first failure.
    pub fn test(&self, snapshot: &RequestSnapshot) -> bool {
        self.tests.iter().all(|t| t.test(snapshot))
    }

    pub fn rules(&self) -> &[String] {
        &self.rules
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }
}

impl PartialEq for RequestPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
            && self.priority == other.priority
            && self.lifetime == other.lifetime
            && self.request_type == other.request_type
    }
}

impl Eq for RequestPredicate {}

impl Hash for RequestPredicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rules.hash(state);
        self.priority.hash(state);
        self.lifetime.hash(state);
        self.request_type.hash(state);
    }
}

impl fmt::Display for RequestPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (priority {}, {}): ",
            self.request_type,
            self.priority,
            self.lifetime.as_str()
        )?;
        for (i, test) in self.tests.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{}", test.rule())?;
        }
        Ok(())
    }
}
