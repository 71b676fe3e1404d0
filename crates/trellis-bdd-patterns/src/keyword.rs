//! Canonical step keyword type shared by the runtime and macro crates.

use gherkin::StepType;
use std::fmt;
use std::str::FromStr;

/// Keyword under which a step definition or feature step is scoped.
///
/// `And` and `But` exist so feature parsing can preserve the conjunction as
/// written; matching resolves them onto the preceding primary keyword via
/// [`resolve`](Self::resolve).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKeyword {
    /// Establishes scenario preconditions.
    Given,
    /// Performs the action under test.
    When,
    /// Asserts an expected outcome.
    Then,
    /// Continues the preceding step's keyword.
    And,
    /// Contrasting continuation of the preceding step's keyword.
    But,
}

impl StepKeyword {
    /// Canonical display form of the keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
        }
    }

    /// Fold conjunctions onto the previous primary keyword.
    ///
    /// Primary keywords update `prev` and return themselves. `And`/`But`
    /// return the stored keyword, defaulting to `Given` when no primary
    /// keyword has been seen yet.
    ///
    /// # Examples
    /// ```
    /// use trellis_bdd_patterns::StepKeyword;
    ///
    /// let mut prev = None;
    /// assert_eq!(StepKeyword::When.resolve(&mut prev), StepKeyword::When);
    /// assert_eq!(StepKeyword::And.resolve(&mut prev), StepKeyword::When);
    /// ```
    #[must_use]
    pub fn resolve(self, prev: &mut Option<Self>) -> Self {
        if matches!(self, Self::And | Self::But) {
            prev.unwrap_or(Self::Given)
        } else {
            *prev = Some(self);
            self
        }
    }

    /// Whether this keyword is a conjunction rather than a primary keyword.
    #[must_use]
    pub const fn is_conjunction(self) -> bool {
        matches!(self, Self::And | Self::But)
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a step keyword.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid step keyword: {0}")]
pub struct KeywordParseError(pub String);

impl FromStr for StepKeyword {
    type Err = KeywordParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        [Self::Given, Self::When, Self::Then, Self::And, Self::But]
            .into_iter()
            .find(|kw| trimmed.eq_ignore_ascii_case(kw.as_str()))
            .ok_or_else(|| KeywordParseError(trimmed.to_string()))
    }
}

impl From<StepType> for StepKeyword {
    fn from(ty: StepType) -> Self {
        match ty {
            StepType::Given => Self::Given,
            StepType::When => Self::When,
            StepType::Then => Self::Then,
        }
    }
}
