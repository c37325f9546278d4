//! Building request predicates from response rules.

use super::factory::RuleTest;
use super::request::RequestPredicate;
use crate::emulator::{EmulatorError, ResponseRule};
use tracing::debug;

/// Lowest priority a predicate can carry; smaller values are raised to it.
pub const MIN_PRIORITY: u32 = 1;

/// Compile a response rule's predicate declaration.
///
/// Fails without side effects if the declaration is empty or any line fails
/// to parse or compile.
pub fn build_predicate(rule: &ResponseRule) -> Result<RequestPredicate, EmulatorError> {
    debug!(
        "Building request predicate for request type [{}]",
        rule.predicate.request_type
    );

    let definition = &rule.predicate;
    if definition.rules.is_empty() {
        return Err(EmulatorError::InvalidRuleDefinition(format!(
            "predicate definition was not supplied for request type [{}]",
            definition.request_type
        )));
    }
    if definition.request_type.is_empty() {
        return Err(EmulatorError::InvalidRuleDefinition(format!(
            "predicate request type was not supplied for rules {:?}",
            definition.rules
        )));
    }

    let tests = definition
        .rules
        .iter()
        .map(|text| RuleTest::from_text(text))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RequestPredicate::new(
        tests,
        definition.rules.clone(),
        clamp_priority(rule.priority),
        rule.time_to_live,
        definition.request_type.clone(),
    ))
}

fn clamp_priority(priority: i32) -> u32 {
    u32::try_from(priority).unwrap_or(0).max(MIN_PRIORITY)
}
