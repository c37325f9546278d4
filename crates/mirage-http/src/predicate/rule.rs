//! Rule DSL parsing.
//!
//! A DSL line describes one field comparison:
//!
//! ```text
//! url contains 'order'
//! httpMethod is 'POST'
//! body matches '.*"id":\s*42.*'
//! url parameters contain parameter 'page' whose value is '2'
//! headers contain entry 'X-Trace' whose value starts with 'abc'
//! ```
//!
//! Field and operator detection are keyword based and first-match-wins, so a
//! value that embeds a keyword (e.g. a header value of `'url'`) changes how the
//! line is classified.

use crate::emulator::EmulatorError;
use std::fmt;

const URL_KEYWORD: &str = "url";
const BODY_KEYWORD: &str = "body";
const HTTP_METHOD_KEYWORD: &str = "httpMethod";
const URL_PARAMS_PREFIX: &str = "url parameters contain";
const URL_PARAM_PREFIX: &str = "url parameters contain parameter";
const HEADERS_PREFIX: &str = "headers contain entry";
const VALUE_ENCLOSING_CHARACTER: char = '\'';

/// Request field a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    HttpMethod,
    Url,
    Body,
    UrlParameter,
    Header,
}

/// Comparison applied to the extracted field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Is,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

impl Operator {
    /// Operator keywords in detection order.
    const KEYWORDS: [(&'static str, Operator); 5] = [
        ("is", Operator::Is),
        ("contains", Operator::Contains),
        ("ends with", Operator::EndsWith),
        ("starts with", Operator::StartsWith),
        ("matches", Operator::Matches),
    ];

    fn detect(text: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, op)| *op)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Operator::Is => "is",
            Operator::Contains => "contains",
            Operator::StartsWith => "starts with",
            Operator::EndsWith => "ends with",
            Operator::Matches => "matches",
        }
    }
}

/// A parsed DSL line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    text: String,
    rule_type: RuleType,
    operator: Operator,
    required_value: String,
    required_key: Option<String>,
}

impl Rule {
    /// Parse one DSL line.
    pub fn parse(text: &str) -> Result<Self, EmulatorError> {
        let match_text = text.rsplit_once(' ').map(|(_, last)| last).unwrap_or("");
        let required_value = sanitise_value(match_text).to_string();

        let (rule_type, required_key) =
            if text.contains(URL_KEYWORD) && !text.starts_with(URL_PARAMS_PREFIX) {
                (RuleType::Url, None)
            } else if text.contains(BODY_KEYWORD) {
                (RuleType::Body, None)
            } else if text.contains(HTTP_METHOD_KEYWORD) {
                (RuleType::HttpMethod, None)
            } else if text.starts_with(URL_PARAM_PREFIX) {
                (RuleType::UrlParameter, Some(required_key(text)?))
            } else if text.starts_with(HEADERS_PREFIX) {
                (RuleType::Header, Some(required_key(text)?))
            } else {
                return Err(EmulatorError::UnsupportedRule(format!(
                    "{text}: unknown rule type"
                )));
            };

        let operator = Operator::detect(text).ok_or_else(|| {
            EmulatorError::UnsupportedRule(format!("{text}: no supported operator keyword"))
        })?;

        Ok(Self {
            text: text.to_string(),
            rule_type,
            operator,
            required_value,
            required_key,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn required_value(&self) -> &str {
        &self.required_value
    }

    /// Map key to inspect; only set for URL parameter and header rules.
    pub fn required_key(&self) -> Option<&str> {
        self.required_key.as_deref()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} '{}'",
            self.rule_type,
            self.operator.keyword(),
            self.required_value
        )?;
        if let Some(key) = &self.required_key {
            write!(f, " (key '{key}')")?;
        }
        Ok(())
    }
}

/// Strip surrounding single quotes; unquoted values pass through unchanged.
pub fn sanitise_value(value: &str) -> &str {
    let quoted = value.len() >= 2
        && value.starts_with(VALUE_ENCLOSING_CHARACTER)
        && value.ends_with(VALUE_ENCLOSING_CHARACTER);
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Extract the key from `... 'key' ... 'value'`.
fn required_key(text: &str) -> Result<String, EmulatorError> {
    let mut segments: Vec<&str> = text.split(VALUE_ENCLOSING_CHARACTER).collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }
    if segments.len() != 4 {
        return Err(EmulatorError::InvalidRuleDefinition(format!(
            "rule [{text}] was invalid: expected a quoted key and value pair"
        )));
    }
    Ok(segments[1].to_string())
}
