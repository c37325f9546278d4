//! Conversion of parsed rules into executable request tests.

use super::rule::{Rule, RuleType};
use super::string_matcher::CompiledStringMatcher;
use crate::emulator::{EmulatorError, RequestSnapshot};
use tracing::debug;

/// Where a test reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldExtractor {
    Method,
    Url,
    Body,
    Param(String),
    Header(String),
}

impl FieldExtractor {
    fn for_rule(rule: &Rule) -> Result<Self, EmulatorError> {
        let keyed = |make: fn(String) -> Self| {
            rule.required_key()
                .map(|key| make(key.to_string()))
                .ok_or_else(|| {
                    EmulatorError::InvalidRuleDefinition(format!(
                        "rule [{}] requires a key",
                        rule.text()
                    ))
                })
        };
        match rule.rule_type() {
            RuleType::HttpMethod => Ok(FieldExtractor::Method),
            RuleType::Url => Ok(FieldExtractor::Url),
            RuleType::Body => Ok(FieldExtractor::Body),
            RuleType::UrlParameter => keyed(FieldExtractor::Param),
            RuleType::Header => keyed(FieldExtractor::Header),
        }
    }

    fn extract<'a>(&self, snapshot: &'a RequestSnapshot) -> Option<&'a str> {
        match self {
            FieldExtractor::Method => Some(snapshot.method.as_str()),
            FieldExtractor::Url => Some(snapshot.url.as_str()),
            FieldExtractor::Body => Some(snapshot.body.as_str()),
            FieldExtractor::Param(key) => snapshot.param(key),
            FieldExtractor::Header(name) => snapshot.header(name),
        }
    }
}

/// One compiled DSL line.
#[derive(Debug, Clone)]
pub struct RuleTest {
    rule: Rule,
    field: FieldExtractor,
    matcher: CompiledStringMatcher,
}

impl RuleTest {
    /// Compile a rule into a test over request snapshots.
    pub fn compile(rule: Rule) -> Result<Self, EmulatorError> {
        let field = FieldExtractor::for_rule(&rule)?;
        let matcher = CompiledStringMatcher::compile(rule.operator(), rule.required_value())?;
        debug!(
            "Adding '{}' predicate for rule [{}]",
            rule.operator().keyword(),
            rule
        );
        Ok(Self {
            rule,
            field,
            matcher,
        })
    }

    /// Parse and compile one DSL line.
    pub fn from_text(text: &str) -> Result<Self, EmulatorError> {
        Self::compile(Rule::parse(text)?)
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn test(&self, snapshot: &RequestSnapshot) -> bool {
        self.matcher.matches(self.field.extract(snapshot))
    }
}
