//! Runtime support for behaviour-driven tests.
//!
//! Step definitions register themselves at link time through [`inventory`];
//! the `#[scenario]` attribute from `trellis-bdd-macros` binds a test
//! function to a Gherkin scenario and drives it through [`run_scenario`].
//! Steps match by literal pattern text first, then by placeholder patterns
//! ranked on specificity, and may be reused across keywords when no
//! definition exists under the requested one.
//!
//! Every run records a per-step trace (status, wall-clock duration, error
//! text) that the cucumber JSON reporter renders whenever the
//! `TRELLIS_BDD_JSON` environment variable names an output file.

pub mod config;
mod context;
pub mod execution;
pub mod generator;
mod panic;
mod pattern;
mod registry;
pub mod report;
pub mod scenario;
pub mod trace;
mod types;

pub use context::StepContext;
pub use execution::{execute_step, parse_step_argument, ExecutionError, StepRequest};
pub use generator::{parse_registry_dump, scaffold_feature, scaffold_missing, DefinedStep};
pub use panic::panic_message;
pub use pattern::StepPattern;
#[cfg(feature = "diagnostics")]
pub use registry::diagnostics;
pub use registry::{
    duplicate_steps, find_step, lookup_step, registered_steps, unused_steps, Step,
};
pub use scenario::{run_scenario, ScenarioMetadata, ScenarioStep, Tag, ALLOW_SKIPPED_TAG};
pub use types::{
    KeywordParseError, PatternError, PatternStr, StepError, StepFn, StepKeyword, StepOutcome,
    StepText,
};

// Re-exported for use by the `step!` macro.
pub use inventory::{iter, submit};
