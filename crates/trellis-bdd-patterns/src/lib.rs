//! Step-pattern engine shared by the `trellis-bdd` runtime and proc-macro
//! crates.
//!
//! A step pattern is plain text with optional `{name}` or `{name:type}`
//! placeholders. The engine lexes patterns into tokens, compiles them into
//! anchored regular expressions, scores their specificity so overlapping
//! patterns can be ranked, and extracts placeholder captures at match time.
//! Keeping the implementation in one crate means compile-time validation in
//! the macros and runtime matching cannot drift apart.

mod capture;
mod compiler;
mod errors;
mod keyword;
mod lexer;
mod specificity;

pub use capture::capture_values;
pub use compiler::{build_regex_source, compile_pattern, type_hint_fragment};
pub use errors::{PatternError, PlaceholderIssue};
pub use keyword::{KeywordParseError, StepKeyword};
pub use lexer::placeholder_names;
pub use specificity::SpecificityScore;
