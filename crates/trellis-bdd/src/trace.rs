//! Per-step execution traces and the process-wide collector.
//!
//! Every scenario run records one [`ScenarioTrace`] holding the timing,
//! status, and error text of each step. The collector keeps traces for the
//! lifetime of the process; when a report path is configured the cucumber
//! JSON file is rewritten after each scenario so a partial report survives
//! an aborted run.

use std::sync::{Mutex, PoisonError};

use crate::config;
use crate::report;

/// Status of a single executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step ran to completion.
    Passed,
    /// The step failed or its definition could not be resolved.
    Failed,
    /// The step did not run because an earlier step failed or skipped.
    Skipped,
}

impl StepStatus {
    /// Lowercase label used by the cucumber JSON format.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Record of one executed (or skipped) step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTrace {
    /// Keyword as written in the feature file, e.g. `And`.
    pub keyword: String,
    /// Step text with outline placeholders substituted.
    pub text: String,
    /// Line number of the step in the feature file.
    pub line: u32,
    /// Wall-clock duration of the handler in nanoseconds.
    pub duration_ns: u64,
    /// Final status of the step.
    pub status: StepStatus,
    /// Error text when the step failed.
    pub error: Option<String>,
}

/// A tag with the line it was declared on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    /// Tag name without the leading `@`.
    pub name: String,
    /// Line number of the tag declaration.
    pub line: u32,
}

/// Record of one scenario run, including every step trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioTrace {
    /// Path of the feature file, as given to the scenario macro.
    pub feature_path: String,
    /// Feature name from the feature file header.
    pub feature_name: String,
    /// Line of the `Feature:` header.
    pub feature_line: u32,
    /// Tags on the feature.
    pub feature_tags: Vec<TagRecord>,
    /// Scenario name from the feature file.
    pub scenario_name: String,
    /// Line of the scenario declaration. Outline expansions keep the
    /// template's line.
    pub scenario_line: u32,
    /// Tags on the scenario.
    pub scenario_tags: Vec<TagRecord>,
    /// Unique identifier of the generated test, including outline values.
    pub test_id: String,
    /// Step traces in execution order.
    pub steps: Vec<StepTrace>,
}

impl ScenarioTrace {
    /// Whether any step in this scenario failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}

static TRACES: Mutex<Vec<ScenarioTrace>> = Mutex::new(Vec::new());

/// Record a finished scenario and refresh the JSON report if configured.
pub fn record(trace: ScenarioTrace) {
    let mut guard = TRACES.lock().unwrap_or_else(PoisonError::into_inner);
    guard.push(trace);
    if let Some(path) = config::report_path() {
        if let Err(err) = report::write_report_file(&guard, &path) {
            log::warn!("failed to write cucumber report to {}: {err}", path.display());
        }
    }
}

/// Copy of every trace recorded so far, in completion order.
#[must_use]
pub fn snapshot() -> Vec<ScenarioTrace> {
    TRACES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Remove and return every recorded trace.
#[must_use]
pub fn drain() -> Vec<ScenarioTrace> {
    std::mem::take(&mut *TRACES.lock().unwrap_or_else(PoisonError::into_inner))
}
