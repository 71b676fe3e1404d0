//! Core types shared across the crate.
//!
//! Defines lightweight wrappers for pattern and step text, the outcome type
//! produced by step wrappers, the step handler error enum, and the function
//! pointer alias stored in the registry.

use std::any::Any;

pub use trellis_bdd_patterns::{KeywordParseError, PatternError, StepKeyword};

/// Wrapper for step pattern strings used in matching logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternStr<'a>(&'a str);

impl<'a> PatternStr<'a> {
    /// Construct a new `PatternStr` from a string slice.
    #[must_use]
    pub const fn new(s: &'a str) -> Self {
        Self(s)
    }

    /// Access the underlying string slice.
    #[must_use]
    pub const fn as_str(self) -> &'a str {
        self.0
    }
}

impl<'a> From<&'a str> for PatternStr<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s)
    }
}

/// Wrapper for step text content from scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepText<'a>(&'a str);

impl<'a> StepText<'a> {
    /// Construct a new `StepText` from a string slice.
    #[must_use]
    pub const fn new(s: &'a str) -> Self {
        Self(s)
    }

    /// Access the underlying string slice.
    #[must_use]
    pub const fn as_str(self) -> &'a str {
        self.0
    }
}

impl<'a> From<&'a str> for StepText<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s)
    }
}

/// Outcome produced by step wrappers.
#[derive(Debug)]
#[must_use]
pub enum StepOutcome {
    /// The step executed successfully and may provide a value for later steps.
    Continue {
        /// Value returned by the step, made available to later steps by type.
        value: Option<Box<dyn Any>>,
    },
    /// The step requested that the rest of the scenario be skipped.
    Skipped {
        /// Optional reason describing why execution stopped.
        message: Option<String>,
    },
}

impl StepOutcome {
    /// Construct a successful outcome with an optional value.
    pub fn from_value(value: Option<Box<dyn Any>>) -> Self {
        Self::Continue { value }
    }

    /// Construct a skipped outcome with an optional reason.
    pub fn skipped(message: impl Into<Option<String>>) -> Self {
        Self::Skipped {
            message: message.into(),
        }
    }
}

/// Errors a step wrapper can report before or while invoking the handler.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StepError {
    /// A fixture the handler declared was not present in the context.
    #[error("missing fixture '{name}' of type '{ty}'")]
    MissingFixture {
        /// Name the handler requested the fixture under.
        name: &'static str,
        /// Type the handler expected the fixture to have.
        ty: &'static str,
    },
    /// A captured placeholder value failed to parse into the declared type.
    #[error("failed to parse argument '{name}' from value '{value}': {message}")]
    ArgumentParse {
        /// Placeholder name in the step pattern.
        name: &'static str,
        /// Raw captured text.
        value: String,
        /// Parser error message.
        message: String,
    },
    /// The step text did not match the pattern the wrapper was compiled for.
    #[error("step text '{text}' does not match pattern '{pattern}'")]
    PatternMismatch {
        /// Pattern the wrapper was registered with.
        pattern: &'static str,
        /// Step text the scenario supplied.
        text: String,
    },
    /// The pattern failed to compile when the wrapper first used it.
    #[error("invalid step pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern text that failed to compile.
        pattern: &'static str,
        /// Underlying pattern error.
        source: PatternError,
    },
    /// The handler declared a docstring argument but the step has none.
    #[error("step requires a docstring but none was provided")]
    MissingDocstring,
    /// The handler declared a data table argument but the step has none.
    #[error("step requires a data table but none was provided")]
    MissingTable,
}

/// Type alias for the stored step function pointer.
///
/// Arguments are the mutable step context, the matched step text, the
/// docstring if present, and the data table if present.
pub type StepFn = for<'a> fn(
    &mut crate::context::StepContext<'a>,
    &str,
    Option<&str>,
    Option<&[&[&str]]>,
) -> Result<StepOutcome, StepError>;
