//! Specificity scoring used to rank overlapping step patterns.

use std::cmp::Ordering;

use crate::errors::PatternError;
use crate::lexer::{lex, Token};

/// How precisely a pattern pins down the text it matches.
///
/// When several patterns match the same step text the highest score wins:
/// more literal characters first, then fewer placeholders, then more typed
/// placeholders as the tiebreaker.
///
/// # Examples
/// ```
/// use trellis_bdd_patterns::SpecificityScore;
///
/// let literal = SpecificityScore::measure("the cart is empty")?;
/// let templated = SpecificityScore::measure("the cart has {n} items")?;
/// assert!(literal > templated);
/// # Ok::<(), trellis_bdd_patterns::PatternError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecificityScore {
    /// Number of literal characters (not bytes) in the pattern.
    pub literal_chars: usize,
    /// Number of placeholders.
    pub placeholders: usize,
    /// Number of placeholders carrying a type hint.
    pub typed_placeholders: usize,
}

impl SpecificityScore {
    /// Measure the specificity of a pattern string.
    ///
    /// # Errors
    /// Returns [`PatternError`] when the pattern is malformed.
    pub fn measure(pattern: &str) -> Result<Self, PatternError> {
        let mut score = Self::default();
        for token in lex(pattern)? {
            match token {
                Token::Literal(text) => score.literal_chars += text.chars().count(),
                Token::Placeholder { hint, .. } => {
                    score.placeholders += 1;
                    if hint.is_some() {
                        score.typed_placeholders += 1;
                    }
                }
                // Stray braces match literally, so count them as literals.
                Token::StrayOpen { .. } | Token::StrayClose { .. } => score.literal_chars += 1,
            }
        }
        Ok(score)
    }
}

impl Ord for SpecificityScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.literal_chars
            .cmp(&other.literal_chars)
            .then_with(|| other.placeholders.cmp(&self.placeholders))
            .then_with(|| self.typed_placeholders.cmp(&other.typed_placeholders))
    }
}

impl PartialOrd for SpecificityScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(pattern: &str) -> SpecificityScore {
        SpecificityScore::measure(pattern)
            .unwrap_or_else(|e| panic!("pattern {pattern:?} should measure: {e}"))
    }

    #[test]
    fn literal_beats_placeholder() {
        assert!(measure("order two teas") > measure("order {n} teas"));
    }

    #[test]
    fn longer_literal_prefix_wins() {
        assert!(measure("the report lists exactly {n} rows") > measure("the report lists {rest}"));
    }

    #[test]
    fn fewer_placeholders_break_literal_ties() {
        let one = measure("ab {x}");
        let two = measure("a {x} {y}");
        assert_eq!(one.literal_chars, two.literal_chars);
        assert!(one > two);
    }

    #[test]
    fn typed_placeholder_is_final_tiebreaker() {
        assert!(measure("count {n:u32}") > measure("count {n}"));
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(measure("café {x}").literal_chars, 5);
    }
}
