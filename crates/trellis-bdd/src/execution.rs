//! Step resolution and invocation against a scenario context.
//!
//! The scenario runner hands each Gherkin step to [`execute_step`], which
//! resolves the definition through the registry, checks that the fixtures
//! the definition declared are present, and invokes the handler.

use std::fmt::Display;
use std::str::FromStr;

use crate::context::StepContext;
use crate::registry::{find_step, Step};
use crate::types::{StepError, StepKeyword, StepOutcome};

/// A single step to execute, with its surrounding diagnostic context.
#[derive(Debug, Clone, Copy)]
pub struct StepRequest<'a> {
    /// Primary keyword after conjunction resolution.
    pub keyword: StepKeyword,
    /// Step text with any outline placeholders already substituted.
    pub text: &'a str,
    /// Docstring attached to the step, when present.
    pub docstring: Option<&'a str>,
    /// Data table attached to the step, when present.
    pub table: Option<&'a [&'a [&'a str]]>,
}

/// Errors raised while resolving or running a single step.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// No registered definition matched the step.
    #[error("no step definition matches '{keyword} {text}'")]
    StepNotFound {
        /// Primary keyword the lookup used.
        keyword: StepKeyword,
        /// Step text that failed to match.
        text: String,
    },
    /// The matched definition requires fixtures the context does not hold.
    #[error(
        "step '{pattern}' (defined at {location}) requires missing fixtures [{}]; \
         the context provides [{}]",
        missing.join(", "),
        available.join(", ")
    )]
    MissingFixtures {
        /// Pattern of the matched definition.
        pattern: &'static str,
        /// Source location of the definition.
        location: String,
        /// Fixture names absent from the context.
        missing: Vec<String>,
        /// Fixture names the context does hold, sorted.
        available: Vec<String>,
    },
    /// The handler reported an error.
    #[error(transparent)]
    Handler(#[from] StepError),
}

fn validate_fixtures(step: &'static Step, ctx: &StepContext<'_>) -> Result<(), ExecutionError> {
    let missing: Vec<String> = step
        .fixtures
        .iter()
        .filter(|name| !ctx.has_fixture(name))
        .map(|name| (*name).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExecutionError::MissingFixtures {
            pattern: step.pattern.as_str(),
            location: step.location(),
            missing,
            available: ctx
                .fixture_names()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        })
    }
}

/// Resolve and run one step against the scenario context.
///
/// On success the outcome carries any value the handler returned, which the
/// caller feeds back into the context for later steps.
///
/// # Errors
/// Returns [`ExecutionError`] when no definition matches, required fixtures
/// are missing, or the handler fails.
pub fn execute_step(
    ctx: &mut StepContext<'_>,
    request: StepRequest<'_>,
) -> Result<StepOutcome, ExecutionError> {
    let Some(step) = find_step(request.keyword, request.text.into()) else {
        return Err(ExecutionError::StepNotFound {
            keyword: request.keyword,
            text: request.text.to_string(),
        });
    };
    validate_fixtures(step, ctx)?;
    log::trace!(
        "running step '{} {}' via '{}' from {}",
        request.keyword.as_str(),
        request.text,
        step.pattern.as_str(),
        step.location()
    );
    Ok((step.run)(ctx, request.text, request.docstring, request.table)?)
}

/// Parse a captured placeholder value into the handler's declared type.
///
/// Step wrappers generated by the attribute macros call this for each
/// placeholder argument.
///
/// # Errors
/// Returns [`StepError::ArgumentParse`] when the captured text does not
/// parse as `T`.
pub fn parse_step_argument<T>(name: &'static str, raw: &str) -> Result<T, StepError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| StepError::ArgumentParse {
        name,
        value: raw.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step;

    fn record_text(
        ctx: &mut StepContext<'_>,
        text: &str,
        _docstring: Option<&str>,
        _table: Option<&[&[&str]]>,
    ) -> Result<StepOutcome, StepError> {
        let _ = ctx;
        Ok(StepOutcome::from_value(Some(Box::new(text.to_string()))))
    }

    fn needs_counter(
        ctx: &mut StepContext<'_>,
        _text: &str,
        _docstring: Option<&str>,
        _table: Option<&[&[&str]]>,
    ) -> Result<StepOutcome, StepError> {
        let counter = ctx
            .get::<u32>("counter")
            .ok_or(StepError::MissingFixture {
                name: "counter",
                ty: "u32",
            })?;
        assert_eq!(*counter, 7);
        Ok(StepOutcome::from_value(None))
    }

    step!(StepKeyword::When, "an execution step runs", record_text, &[]);
    step!(
        StepKeyword::Then,
        "the execution counter is checked",
        needs_counter,
        &["counter"]
    );

    #[test]
    fn unknown_step_is_reported() {
        let mut ctx = StepContext::default();
        let request = StepRequest {
            keyword: StepKeyword::When,
            text: "an unregistered execution step",
            docstring: None,
            table: None,
        };
        let Err(err) = execute_step(&mut ctx, request) else {
            panic!("unknown step should not resolve");
        };
        assert!(matches!(err, ExecutionError::StepNotFound { .. }));
    }

    #[test]
    fn missing_fixture_is_reported_before_the_handler_runs() {
        let mut ctx = StepContext::default();
        let unrelated = String::from("present");
        ctx.insert("session", &unrelated);
        let request = StepRequest {
            keyword: StepKeyword::Then,
            text: "the execution counter is checked",
            docstring: None,
            table: None,
        };
        let Err(err) = execute_step(&mut ctx, request) else {
            panic!("missing fixture should fail the step");
        };
        let message = err.to_string();
        let ExecutionError::MissingFixtures { missing, available, .. } = err else {
            panic!("expected missing fixture error, got: {message}");
        };
        assert_eq!(missing, ["counter"]);
        assert_eq!(available, ["session"]);
        assert!(message.contains("[counter]"));
        assert!(message.contains("[session]"));
    }

    #[test]
    fn handler_runs_when_fixtures_are_present() {
        let mut ctx = StepContext::default();
        let counter = 7_u32;
        ctx.insert("counter", &counter);
        let request = StepRequest {
            keyword: StepKeyword::Then,
            text: "the execution counter is checked",
            docstring: None,
            table: None,
        };
        let outcome = execute_step(&mut ctx, request)
            .unwrap_or_else(|e| panic!("step should pass: {e}"));
        assert!(matches!(outcome, StepOutcome::Continue { value: None }));
    }

    #[test]
    fn returned_values_surface_in_the_outcome() {
        let mut ctx = StepContext::default();
        let request = StepRequest {
            keyword: StepKeyword::When,
            text: "an execution step runs",
            docstring: None,
            table: None,
        };
        let outcome = execute_step(&mut ctx, request)
            .unwrap_or_else(|e| panic!("step should pass: {e}"));
        let StepOutcome::Continue { value: Some(value) } = outcome else {
            panic!("handler should return a value");
        };
        assert_eq!(
            value.downcast_ref::<String>().map(String::as_str),
            Some("an execution step runs")
        );
    }

    #[test]
    fn parse_step_argument_reports_the_offending_value() {
        let parsed: Result<u32, _> = parse_step_argument("count", "nine");
        let Err(err) = parsed else {
            panic!("'nine' should not parse as u32");
        };
        assert!(err.to_string().contains("'count'"));
        assert!(err.to_string().contains("'nine'"));
    }
}
