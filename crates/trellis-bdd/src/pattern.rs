//! Step pattern handling and compilation.
//!
//! `StepPattern` wraps a pattern literal and compiles it lazily into an
//! anchored regular expression, caching both the regex and the specificity
//! score used to rank overlapping candidates.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use regex::Regex;
use trellis_bdd_patterns::{capture_values, compile_pattern, PatternError, SpecificityScore};

use crate::types::StepError;

/// Pattern text used to match a step at runtime.
#[derive(Debug)]
pub struct StepPattern {
    text: &'static str,
    regex: OnceLock<Regex>,
    specificity: OnceLock<SpecificityScore>,
}

// Equality and hashing are by the underlying literal text so that
// `&'static StepPattern` can serve as a stable map key independent of
// allocation identity.
impl PartialEq for StepPattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for StepPattern {}

impl Hash for StepPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl StepPattern {
    /// Create a new pattern wrapper from a string literal.
    #[must_use]
    pub const fn new(value: &'static str) -> Self {
        Self {
            text: value,
            regex: OnceLock::new(),
            specificity: OnceLock::new(),
        }
    }

    /// Access the underlying pattern string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.text
    }

    /// Compile the pattern into a regular expression, caching the result.
    ///
    /// Idempotent and thread-safe; concurrent calls may race to build a
    /// `Regex` but only the first successful value is cached.
    ///
    /// # Errors
    /// Returns [`PatternError`] if the pattern contains invalid placeholders
    /// or the generated regex fails to compile.
    pub fn compile(&self) -> Result<(), PatternError> {
        self.regex().map(|_| ())
    }

    /// Test whether `text` matches this pattern, compiling on first use.
    ///
    /// # Errors
    /// Returns [`PatternError`] when the pattern is malformed.
    pub fn is_match(&self, text: &str) -> Result<bool, PatternError> {
        Ok(self.regex()?.is_match(text))
    }

    /// Extract placeholder captures from `text`.
    ///
    /// # Errors
    /// Returns [`StepError::PatternMismatch`] when the text does not match
    /// and [`StepError::InvalidPattern`] when the pattern itself is
    /// malformed.
    pub fn extract(&self, text: &str) -> Result<Vec<String>, StepError> {
        let regex = self.regex().map_err(|source| StepError::InvalidPattern {
            pattern: self.text,
            source,
        })?;
        capture_values(regex, text).ok_or_else(|| StepError::PatternMismatch {
            pattern: self.text,
            text: text.to_string(),
        })
    }

    /// Calculate and cache the specificity score for this pattern.
    ///
    /// Higher scores indicate more specific patterns; the registry uses the
    /// score to pick a winner when several patterns match the same text.
    ///
    /// # Errors
    /// Returns [`PatternError`] if the pattern contains invalid syntax.
    pub fn specificity(&self) -> Result<SpecificityScore, PatternError> {
        if let Some(score) = self.specificity.get() {
            return Ok(*score);
        }
        let score = SpecificityScore::measure(self.text)?;
        let _ = self.specificity.set(score);
        Ok(score)
    }

    fn regex(&self) -> Result<&Regex, PatternError> {
        if let Some(regex) = self.regex.get() {
            return Ok(regex);
        }
        let compiled = compile_pattern(self.text)?;
        // A concurrent caller may have won the race; keep whichever landed.
        Ok(self.regex.get_or_init(|| compiled))
    }
}

impl From<&'static str> for StepPattern {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}
