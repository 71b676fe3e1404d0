//! Error types shared by the pattern modules.

use std::fmt;
use thiserror::Error;

/// Context attached to a placeholder parsing failure.
///
/// # Examples
/// ```
/// use trellis_bdd_patterns::PlaceholderIssue;
/// let issue = PlaceholderIssue::new("missing closing '}'", 4, Some("count".into()));
/// assert_eq!(issue.position, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderIssue {
    /// Static description of what went wrong.
    pub message: &'static str,
    /// Zero-based byte offset in the pattern where parsing failed.
    pub position: usize,
    /// Placeholder name, when one had been read before the failure.
    pub placeholder: Option<String>,
}

impl PlaceholderIssue {
    /// Create a new placeholder issue.
    #[must_use]
    pub fn new(message: &'static str, position: usize, placeholder: Option<String>) -> Self {
        Self {
            message,
            position,
            placeholder,
        }
    }
}

impl fmt::Display for PlaceholderIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.placeholder {
            Some(name) => write!(
                f,
                "{} for placeholder `{}` at byte {}",
                self.message, name, self.position
            ),
            None => write!(f, "{} at byte {}", self.message, self.position),
        }
    }
}

/// Errors raised while turning a step pattern into a regular expression.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern contains malformed placeholder syntax.
    #[error("{0}")]
    Placeholder(PlaceholderIssue),
    /// The generated regular expression failed to compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub(crate) fn placeholder_error(
    message: &'static str,
    position: usize,
    placeholder: Option<String>,
) -> PatternError {
    PatternError::Placeholder(PlaceholderIssue::new(message, position, placeholder))
}
