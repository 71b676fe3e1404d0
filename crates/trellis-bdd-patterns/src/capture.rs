//! Capture extraction for matched step text.

use regex::Regex;

/// Extract placeholder captures from `text` when it matches `re`.
///
/// Returns `None` on mismatch so callers can distinguish "no match" from an
/// empty capture set. Group 0 is skipped; optional groups that did not
/// participate yield empty strings to keep positions aligned with the
/// pattern's placeholders.
///
/// # Examples
/// ```
/// use regex::Regex;
/// use trellis_bdd_patterns::capture_values;
///
/// let re = Regex::new(r"^(\d+) of (\w+)$")?;
/// assert_eq!(
///     capture_values(&re, "3 of cukes"),
///     Some(vec!["3".to_string(), "cukes".to_string()])
/// );
/// assert_eq!(capture_values(&re, "none"), None);
/// # Ok::<(), regex::Error>(())
/// ```
#[must_use]
pub fn capture_values(re: &Regex, text: &str) -> Option<Vec<String>> {
    let caps = re.captures(text)?;
    Some(
        caps.iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regex(source: &str) -> Regex {
        Regex::new(source).unwrap_or_else(|e| panic!("test regex should compile: {e}"))
    }

    #[test]
    fn mismatch_returns_none() {
        assert_eq!(capture_values(&regex(r"^(\d+)$"), "abc"), None);
    }

    #[test]
    fn captures_keep_pattern_order() {
        assert_eq!(
            capture_values(&regex(r"^(\w+)-(\d+)$"), "run-7"),
            Some(vec!["run".to_string(), "7".to_string()])
        );
    }

    #[test]
    fn absent_optional_groups_are_empty() {
        assert_eq!(
            capture_values(&regex(r"^(a)?(b)?$"), "b"),
            Some(vec![String::new(), "b".to_string()])
        );
    }
}
