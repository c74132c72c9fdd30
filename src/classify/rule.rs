use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Error type for rule compilation
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("regex compilation error in {list} rule '{pattern}': {source}")]
    RegexCompilation {
        list: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A single case-insensitive pattern
#[derive(Debug)]
pub struct CompiledRule {
    pub pattern: String,
    regex: Regex,
}

impl CompiledRule {
    fn compile(list: &'static str, pattern: &str) -> Result<Self, RuleError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RuleError::RegexCompilation {
                list,
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Literal text this rule matched in the line, if any
    pub fn find<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.regex.find(line).map(|m| m.as_str())
    }
}

/// An ordered list of rules; the first match wins
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(list: &'static str, patterns: &[String]) -> Result<Self, RuleError> {
        let rules = patterns
            .iter()
            .map(|p| CompiledRule::compile(list, p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Matched text of the first rule that hits, in list order
    pub fn first_match<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.rules.iter().find_map(|rule| rule.find(line))
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.first_match(line).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
