//! Compiled string operators.
//!
//! Every operator is case-sensitive. An absent field value (missing header or
//! URL parameter) never satisfies any operator because the required value is
//! always present.

use super::rule::Operator;
use crate::emulator::EmulatorError;
use regex::Regex;
use std::sync::Arc;

/// Compiled operator for efficient runtime evaluation.
#[derive(Debug, Clone)]
pub enum CompiledStringMatcher {
    Is(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    /// Regex anchored to the whole value.
    Matches(Arc<Regex>),
}

impl CompiledStringMatcher {
    /// Compile an operator and its required value.
    pub fn compile(operator: Operator, required: &str) -> Result<Self, EmulatorError> {
        Ok(match operator {
            Operator::Is => CompiledStringMatcher::Is(required.to_string()),
            Operator::Contains => CompiledStringMatcher::Contains(required.to_string()),
            Operator::StartsWith => CompiledStringMatcher::StartsWith(required.to_string()),
            Operator::EndsWith => CompiledStringMatcher::EndsWith(required.to_string()),
            Operator::Matches => {
                let regex = Regex::new(&format!("^(?:{required})$")).map_err(|e| {
                    EmulatorError::InvalidRuleDefinition(format!(
                        "invalid regular expression '{required}': {e}"
                    ))
                })?;
                CompiledStringMatcher::Matches(Arc::new(regex))
            }
        })
    }

    /// Check if a value matches this matcher.
    ///
    /// # Arguments
    /// * `value` - The extracted field value (None if the field doesn't exist)
    pub fn matches(&self, value: Option<&str>) -> bool {
        let Some(v) = value else {
            return false;
        };
        match self {
            CompiledStringMatcher::Is(expected) => v == expected,
            CompiledStringMatcher::Contains(needle) => v.contains(needle.as_str()),
            CompiledStringMatcher::StartsWith(prefix) => v.starts_with(prefix.as_str()),
            CompiledStringMatcher::EndsWith(suffix) => v.ends_with(suffix.as_str()),
            CompiledStringMatcher::Matches(regex) => regex.is_match(v),
        }
    }
}
