//! # Asset Rules Module
//!
//! Questo modulo decide quali nomi di asset sono idonei alla minimizzazione.
//!
//! ## Tipi di regola:
//! - una stringa semplice accetta i nomi che iniziano con essa
//! - `{ "regex": "..." }` accetta i nomi in cui il pattern trova un match
//!
//! ## Matching:
//! Un nome è idoneo se rispetta `test`, rispetta `include` (se presente) e non
//! rispetta `exclude` (se presente). Una lista di regole fa match se almeno una
//! regola fa match. Il `test` di default accetta nomi che terminano in `.html`,
//! eventualmente seguiti da una query string, senza distinzione di maiuscole.
//!
//! ## Esempio:
//! ```rust,ignore
//! let filter = AssetFilter::new(&Rules::default_test(), None, Some(&exclude))?;
//! assert!(filter.matches("index.html?v=3"));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MinimizeError, Result};
use crate::minimizer::OneOrMany;

/// Pattern used when no `test` is configured.
pub const DEFAULT_TEST: &str = r"(?i)\.html(\?.*)?$";

/// A rule as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    Prefix(String),
    Pattern { regex: String },
}

impl Rule {
    pub fn pattern(regex: impl Into<String>) -> Self {
        Self::Pattern {
            regex: regex.into(),
        }
    }

    fn compile(&self) -> Result<Matcher> {
        match self {
            Self::Prefix(prefix) => Ok(Matcher::Prefix(prefix.clone())),
            Self::Pattern { regex } => Regex::new(regex)
                .map(Matcher::Pattern)
                .map_err(|source| MinimizeError::InvalidRule {
                    pattern: regex.clone(),
                    source,
                }),
        }
    }
}

/// One rule or a list of rules
pub type Rules = OneOrMany<Rule>;

impl Rules {
    pub fn default_test() -> Self {
        OneOrMany::One(Rule::pattern(DEFAULT_TEST))
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Prefix(String),
    Pattern(Regex),
}

impl Matcher {
    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Prefix(prefix) => name.starts_with(prefix.as_str()),
            Self::Pattern(regex) => regex.is_match(name),
        }
    }
}

fn compile_all(rules: &Rules) -> Result<Vec<Matcher>> {
    rules.as_slice().iter().map(Rule::compile).collect()
}

fn any_match(matchers: &[Matcher], name: &str) -> bool {
    matchers.iter().any(|m| m.is_match(name))
}

/// Compiled test/include/exclude rules
#[derive(Debug, Clone)]
pub struct AssetFilter {
    test: Vec<Matcher>,
    include: Option<Vec<Matcher>>,
    exclude: Option<Vec<Matcher>>,
}

impl AssetFilter {
    /// Compile the configured rules; invalid patterns are configuration errors.
    pub fn new(test: &Rules, include: Option<&Rules>, exclude: Option<&Rules>) -> Result<Self> {
        Ok(Self {
            test: compile_all(test)?,
            include: include.map(compile_all).transpose()?,
            exclude: exclude.map(compile_all).transpose()?,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        if !any_match(&self.test, name) {
            return false;
        }
        if let Some(include) = &self.include {
            if !any_match(include, name) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if any_match(exclude, name) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_test_matches_html_with_query() {
        let filter = AssetFilter::new(&Rules::default_test(), None, None).unwrap();
        assert!(filter.matches("index.html"));
        assert!(filter.matches("nested/page.HTML"));
        assert!(filter.matches("a.html?v=1&x=2"));
        assert!(!filter.matches("a.htm"));
        assert!(!filter.matches("a.html.map"));
        assert!(!filter.matches("main.js"));
    }

    #[test]
    fn test_include_and_exclude() {
        let include = OneOrMany::Many(vec![Rule::Prefix("pages/".into()), Rule::Prefix("index".into())]);
        let exclude = OneOrMany::One(Rule::pattern(r"draft"));
        let filter = AssetFilter::new(&Rules::default_test(), Some(&include), Some(&exclude)).unwrap();

        assert!(filter.matches("pages/about.html"));
        assert!(filter.matches("index.html"));
        assert!(!filter.matches("blog/post.html"));
        assert!(!filter.matches("pages/draft-post.html"));
    }

    #[test]
    fn test_rules_deserialize_from_strings_and_patterns() {
        let rules: Rules = serde_json::from_value(json!(["static/", { "regex": "\\.htm$" }])).unwrap();
        let filter = AssetFilter::new(&rules, None, None).unwrap();
        assert!(filter.matches("static/a.txt"));
        assert!(filter.matches("legacy.htm"));
        assert!(!filter.matches("other/a.txt"));

        let single: Rules = serde_json::from_value(json!("docs/")).unwrap();
        assert_eq!(single, OneOrMany::One(Rule::Prefix("docs/".into())));
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let err = AssetFilter::new(&OneOrMany::One(Rule::pattern("(unclosed")), None, None).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_empty_test_list_matches_nothing() {
        let filter = AssetFilter::new(&OneOrMany::Many(Vec::new()), None, None).unwrap();
        assert!(!filter.matches("index.html"));
    }
}
