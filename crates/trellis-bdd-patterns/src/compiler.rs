//! Compilation of lexed patterns into anchored regular expressions.

use regex::Regex;

use crate::errors::{placeholder_error, PatternError};
use crate::lexer::{lex, Token};

/// Regular-expression fragment for a placeholder type hint.
///
/// Unsigned integer hints match digits only, signed integers allow a sign,
/// and float hints accept scientific notation plus `nan`/`inf` spellings.
/// Unknown hints fall back to a lazy wildcard so surrounding literals keep
/// their anchoring power.
///
/// # Examples
/// ```
/// use trellis_bdd_patterns::type_hint_fragment;
///
/// assert_eq!(type_hint_fragment(Some("u32")), r"\d+");
/// assert_eq!(type_hint_fragment(None), r".+?");
/// ```
#[must_use]
pub fn type_hint_fragment(hint: Option<&str>) -> &'static str {
    match hint {
        Some("u8" | "u16" | "u32" | "u64" | "u128" | "usize") => r"\d+",
        Some("i8" | "i16" | "i32" | "i64" | "i128" | "isize") => r"[+-]?\d+",
        Some("f32" | "f64") => {
            r"(?i:(?:[+-]?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][+-]?\d+)?|nan|inf|infinity))"
        }
        _ => r".+?",
    }
}

/// Build the anchored regex source for a step pattern.
///
/// # Errors
/// Returns [`PatternError`] for malformed placeholders or unbalanced stray
/// braces.
///
/// # Examples
/// ```
/// use trellis_bdd_patterns::build_regex_source;
///
/// let source = build_regex_source("I have {count:u32} cukes")?;
/// assert_eq!(source, r"^I have (\d+) cukes$");
/// # Ok::<(), trellis_bdd_patterns::PatternError>(())
/// ```
pub fn build_regex_source(pattern: &str) -> Result<String, PatternError> {
    let mut source = String::with_capacity(pattern.len() * 2 + 2);
    source.push('^');
    let mut open_braces = 0usize;

    for token in lex(pattern)? {
        match token {
            Token::Literal(text) => source.push_str(&regex::escape(&text)),
            Token::Placeholder { hint, .. } => {
                source.push('(');
                source.push_str(type_hint_fragment(hint.as_deref()));
                source.push(')');
            }
            Token::StrayOpen { .. } => {
                open_braces += 1;
                source.push_str(r"\{");
            }
            Token::StrayClose { at } => {
                if open_braces == 0 {
                    return Err(placeholder_error(
                        "unmatched closing brace '}' in step pattern",
                        at,
                        None,
                    ));
                }
                open_braces -= 1;
                source.push_str(r"\}");
            }
        }
    }

    if open_braces != 0 {
        return Err(placeholder_error(
            "unbalanced braces in step pattern",
            pattern.len(),
            None,
        ));
    }

    source.push('$');
    Ok(source)
}

/// Compile a step pattern into a ready-to-match [`Regex`].
///
/// # Errors
/// Returns [`PatternError`] when the pattern is malformed or the generated
/// regex fails to compile.
pub fn compile_pattern(pattern: &str) -> Result<Regex, PatternError> {
    Ok(Regex::new(&build_regex_source(pattern)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pattern: &str) -> String {
        build_regex_source(pattern)
            .unwrap_or_else(|e| panic!("pattern {pattern:?} should compile: {e}"))
    }

    #[test]
    fn escapes_literal_metacharacters() {
        assert_eq!(source("cost is $5 (approx)"), r"^cost is \$5 \(approx\)$");
    }

    #[test]
    fn untyped_placeholder_is_lazy() {
        assert_eq!(source("pick {item}"), r"^pick (.+?)$");
    }

    #[test]
    fn signed_hint_allows_sign() {
        assert_eq!(source("delta {d:i32}"), r"^delta ([+-]?\d+)$");
    }

    #[test]
    fn stray_balanced_braces_match_literally() {
        let re = compile_pattern("{ literal }")
            .unwrap_or_else(|e| panic!("balanced stray braces should compile: {e}"));
        assert!(re.is_match("{ literal }"));
    }

    #[test]
    fn unmatched_closing_brace_is_rejected() {
        let Err(err) = build_regex_source("oops}") else {
            panic!("unmatched closing brace should fail");
        };
        assert!(err.to_string().contains("unmatched closing brace"));
    }

    #[test]
    fn leftover_open_brace_is_rejected() {
        let Err(err) = build_regex_source("{ oops") else {
            panic!("unbalanced braces should fail");
        };
        assert!(err.to_string().contains("unbalanced braces"));
    }

    #[test]
    fn float_hint_matches_scientific_notation() {
        let re = compile_pattern("value {v:f64}")
            .unwrap_or_else(|e| panic!("float pattern should compile: {e}"));
        for text in ["value 1.0", "value -2.5e3", "value NaN", "value inf"] {
            assert!(re.is_match(text), "{text} should match");
        }
        assert!(!re.is_match("value one"));
    }
}
