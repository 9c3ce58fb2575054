//! Separates a review body from an embedded operator reply.
//!
//! Scraped review text often carries the platform's public response inline,
//! introduced by a marker such as `"Reply from Fiverr:"`. The splitter cuts
//! at the first case-insensitive marker occurrence. A body that merely
//! mentions the operator ("Fiverr refunded me") is never split: the marker
//! requires the full `Reply from <operator>` phrase followed by a colon or
//! whitespace.

use anyhow::Result;
use regex::Regex;

/// Operator name used when none is configured.
pub const DEFAULT_OPERATOR: &str = "Fiverr";

/// Main text and optional reply produced by [`ReplySplitter::split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitText {
    pub main_text: String,
    pub reply_text: Option<String>,
}

/// Compiled reply-marker matcher for a set of operator names.
#[derive(Debug, Clone)]
pub struct ReplySplitter {
    marker: Regex,
}

impl ReplySplitter {
    /// Build a splitter recognizing `Reply from <name>` for each name.
    ///
    /// An empty list falls back to [`DEFAULT_OPERATOR`].
    pub fn new(operator_names: &[String]) -> Result<Self> {
        let names: Vec<String> = operator_names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(regex::escape)
            .collect();
        let alternation = if names.is_empty() {
            regex::escape(DEFAULT_OPERATOR)
        } else {
            names.join("|")
        };
        let marker = Regex::new(&format!(r"(?i)reply\s+from\s+(?:{})(?::|\s)", alternation))?;
        Ok(Self { marker })
    }

    /// Split raw review text at the first reply marker.
    pub fn split(&self, text: &str) -> SplitText {
        match self.marker.find(text) {
            Some(m) => SplitText {
                main_text: text[..m.start()].trim().to_string(),
                reply_text: Some(text[m.start()..].trim().to_string()),
            },
            None => SplitText {
                main_text: text.trim().to_string(),
                reply_text: None,
            },
        }
    }

    /// Reply text with its leading marker and label removed, for display.
    pub fn reply_body<'a>(&self, reply: &'a str) -> &'a str {
        match self.marker.find(reply) {
            Some(m) if m.start() == 0 => reply[m.end()..]
                .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
                .trim_end(),
            _ => reply.trim(),
        }
    }
}

impl Default for ReplySplitter {
    fn default() -> Self {
        Self {
            marker: Regex::new(r"(?i)reply\s+from\s+(?:Fiverr)(?::|\s)").expect("static regex"),
        }
    }
}
