//! Scenario execution driving step resolution, timing, and tracing.
//!
//! The `#[scenario]` macro expands each test into a call to [`run_scenario`]
//! with the scenario's steps baked in as constants. The runner resolves
//! conjunction keywords, executes each step with panic capture and timing,
//! records a [`ScenarioTrace`](crate::trace::ScenarioTrace) for the
//! reporter, and finally panics when any step failed so the host test fails.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::config;
use crate::context::StepContext;
use crate::execution::{execute_step, StepRequest};
use crate::panic::panic_message;
use crate::trace::{self, ScenarioTrace, StepStatus, StepTrace, TagRecord};
use crate::types::{StepKeyword, StepOutcome};

/// A tag attached to a feature or scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Tag name without the leading `@`.
    pub name: &'static str,
    /// Line the tag was declared on.
    pub line: u32,
}

/// One step of a scenario, captured at macro expansion time.
///
/// Outline placeholders are substituted before the step is emitted, so the
/// text here is always concrete.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioStep {
    /// Keyword exactly as written in the feature file, including `And` and
    /// `But`.
    pub keyword: StepKeyword,
    /// Step text.
    pub text: &'static str,
    /// Line number of the step.
    pub line: u32,
    /// Docstring attached to the step, when present.
    pub docstring: Option<&'static str>,
    /// Data table attached to the step, when present.
    pub table: Option<&'static [&'static [&'static str]]>,
}

/// Identity of a scenario run, captured at macro expansion time.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioMetadata {
    /// Feature file path as written in the `#[scenario]` attribute.
    pub feature_path: &'static str,
    /// Feature name from the file header.
    pub feature_name: &'static str,
    /// Line of the `Feature:` header.
    pub feature_line: u32,
    /// Tags on the feature.
    pub feature_tags: &'static [Tag],
    /// Scenario name.
    pub name: &'static str,
    /// Line of the scenario declaration; outline expansions keep the
    /// template's line.
    pub line: u32,
    /// Tags on the scenario.
    pub tags: &'static [Tag],
    /// Unique identifier of the generated test. Outline expansions append
    /// the example values, e.g. `test_login[alice-ok]`.
    pub test_id: &'static str,
}

/// Tag that lets a skipped scenario pass even when
/// [`fail_on_skipped`](crate::config::fail_on_skipped) is enabled.
pub const ALLOW_SKIPPED_TAG: &str = "allow_skipped";

fn allow_skipped(metadata: &ScenarioMetadata) -> bool {
    metadata
        .tags
        .iter()
        .chain(metadata.feature_tags)
        .any(|tag| tag.name.trim_start_matches('@') == ALLOW_SKIPPED_TAG)
}

fn tag_records(tags: &[Tag]) -> Vec<TagRecord> {
    tags.iter()
        .map(|tag| TagRecord {
            name: tag.name.to_string(),
            line: tag.line,
        })
        .collect()
}

enum Halt {
    Failed { step_index: usize, error: String },
    Skipped { message: Option<String> },
}

fn run_steps(
    ctx: &mut StepContext<'_>,
    steps: &[ScenarioStep],
    traces: &mut Vec<StepTrace>,
) -> Option<Halt> {
    let mut previous: Option<StepKeyword> = None;
    let mut halt = None;
    for (index, step) in steps.iter().enumerate() {
        let resolved = step.keyword.resolve(&mut previous);
        if halt.is_some() {
            traces.push(StepTrace {
                keyword: step.keyword.as_str().to_string(),
                text: step.text.to_string(),
                line: step.line,
                duration_ns: 0,
                status: StepStatus::Skipped,
                error: None,
            });
            continue;
        }
        let request = StepRequest {
            keyword: resolved,
            text: step.text,
            docstring: step.docstring,
            table: step.table,
        };
        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| execute_step(ctx, request)));
        let duration_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let (status, error) = match outcome {
            Ok(Ok(StepOutcome::Continue { value })) => {
                if let Some(value) = value {
                    ctx.insert_value(value);
                }
                (StepStatus::Passed, None)
            }
            Ok(Ok(StepOutcome::Skipped { message })) => {
                halt = Some(Halt::Skipped { message });
                (StepStatus::Skipped, None)
            }
            Ok(Err(err)) => {
                let error = err.to_string();
                halt = Some(Halt::Failed {
                    step_index: index,
                    error: error.clone(),
                });
                (StepStatus::Failed, Some(error))
            }
            Err(payload) => {
                let error = panic_message(payload.as_ref());
                halt = Some(Halt::Failed {
                    step_index: index,
                    error: error.clone(),
                });
                (StepStatus::Failed, Some(error))
            }
        };
        traces.push(StepTrace {
            keyword: step.keyword.as_str().to_string(),
            text: step.text.to_string(),
            line: step.line,
            duration_ns,
            status,
            error,
        });
    }
    halt
}

/// Execute a scenario's steps in order against the provided context.
///
/// Steps after a failure or a skip are recorded as skipped without running.
/// The full trace is recorded before control returns, so the report stays
/// complete even though a failure panics out of the test.
///
/// # Panics
/// Panics when any step fails, or when a step skipped the scenario while
/// [`fail_on_skipped`](crate::config::fail_on_skipped) is set and neither
/// the scenario nor the feature carries the `allow_skipped` tag.
pub fn run_scenario(
    metadata: &ScenarioMetadata,
    steps: &[ScenarioStep],
    ctx: &mut StepContext<'_>,
) {
    let mut traces = Vec::with_capacity(steps.len());
    let halt = run_steps(ctx, steps, &mut traces);
    trace::record(ScenarioTrace {
        feature_path: metadata.feature_path.to_string(),
        feature_name: metadata.feature_name.to_string(),
        feature_line: metadata.feature_line,
        feature_tags: tag_records(metadata.feature_tags),
        scenario_name: metadata.name.to_string(),
        scenario_line: metadata.line,
        scenario_tags: tag_records(metadata.tags),
        test_id: metadata.test_id.to_string(),
        steps: traces,
    });
    match halt {
        Some(Halt::Failed { step_index, error }) => {
            let step = &steps[step_index];
            panic!(
                "scenario '{}' ({}:{}) failed at step '{} {}': {error}",
                metadata.name,
                metadata.feature_path,
                step.line,
                step.keyword.as_str(),
                step.text,
            );
        }
        Some(Halt::Skipped { message }) => {
            if config::fail_on_skipped() && !allow_skipped(metadata) {
                let reason = message.unwrap_or_else(|| "no reason given".to_string());
                panic!(
                    "scenario '{}' ({}) skipped while skips are treated as failures: {reason}",
                    metadata.name, metadata.feature_path,
                );
            }
            if let Some(reason) = message {
                log::info!(
                    "scenario '{}' ({}) skipped: {reason}",
                    metadata.name,
                    metadata.feature_path,
                );
            }
        }
        None => {}
    }
}
