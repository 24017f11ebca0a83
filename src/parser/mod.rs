//! Edge-list line grammar and per-shard parsing.
//!
//! A shard is a text file with one edge per line:
//!
//! ```text
//! # comment
//! 1 3
//! "a" "b"        (with quote = Some('"'))
//! ```
//!
//! Lines are trimmed before classification. Each endpoint is one or more
//! word characters, either bare or wrapped in the configured quote character
//! on both sides, and the two endpoints are joined by the configured
//! separator. A line that is neither a comment nor an edge, blank lines
//! included, is malformed.

pub mod shard;

pub use shard::{EdgeGroups, ParsedShard, PerNodePartial, ShardParser};

use regex_lite::Regex;

use crate::error::{GraphError, Result};
use crate::NodeId;

pub const DEFAULT_SEPARATOR: &str = " ";

/// Borrowed endpoint tokens of one edge line, quotes stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLine<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

/// Classification of one trimmed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Comment,
    Edge(EdgeLine<'a>),
    Malformed,
}

/// Compiled edge-line grammar for a separator / quote pair.
#[derive(Debug, Clone)]
pub struct LineGrammar {
    separator: String,
    quote: Option<char>,
    edge: Regex,
}

impl LineGrammar {
    pub fn new(separator: &str, quote: Option<char>) -> Result<Self> {
        if separator.is_empty() {
            return Err(GraphError::InvalidConfig("separator must not be empty".into()));
        }
        if separator.chars().any(is_word_char) {
            return Err(GraphError::InvalidConfig(format!(
                "separator {separator:?} contains word characters"
            )));
        }
        if let Some(q) = quote {
            if is_word_char(q) || q.is_whitespace() {
                return Err(GraphError::InvalidConfig(format!(
                    "quote {q:?} must be a non-word, non-space character"
                )));
            }
        }

        // With a quote, each endpoint is `"(\w+)"` or `(\w+)`: two capture
        // groups per endpoint, exactly one of which participates.
        let token = match quote {
            Some(q) => {
                let q = regex_lite::escape(&q.to_string());
                format!(r"(?:{q}(\w+){q}|(\w+))")
            }
            None => r"(\w+)".to_string(),
        };
        let sep = regex_lite::escape(separator);
        let pattern = format!("^{token}{sep}{token}$");
        let edge = Regex::new(&pattern)
            .map_err(|e| GraphError::InvalidConfig(format!("line grammar: {e}")))?;

        Ok(Self {
            separator: separator.to_string(),
            quote,
            edge,
        })
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    /// Classify one raw line. Surrounding whitespace is ignored.
    pub fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        let line = line.trim();
        if line.starts_with('#') {
            return LineKind::Comment;
        }
        let Some(caps) = self.edge.captures(line) else {
            return LineKind::Malformed;
        };
        let (from, to) = match self.quote {
            Some(_) => (caps.get(1).or(caps.get(2)), caps.get(3).or(caps.get(4))),
            None => (caps.get(1), caps.get(2)),
        };
        match (from, to) {
            (Some(from), Some(to)) => LineKind::Edge(EdgeLine {
                from: from.as_str(),
                to: to.as_str(),
            }),
            _ => LineKind::Malformed,
        }
    }
}

impl Default for LineGrammar {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR, None).expect("default line grammar is valid")
    }
}

/// `\w` as the grammar understands it: ASCII letters, digits and `_`.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Id parser for already-numeric inputs, for use with `IdentityNumberer`.
pub fn parse_node_id(token: &str) -> Option<NodeId> {
    token.parse().ok()
}

/// Id parser that keeps each token as an opaque string.
pub fn parse_string_id(token: &str) -> Option<String> {
    Some(token.to_string())
}
