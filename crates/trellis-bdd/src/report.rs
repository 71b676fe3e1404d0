//! Cucumber-format JSON report writer.
//!
//! Renders recorded scenario traces into the JSON schema consumed by
//! cucumber report tooling: an array of features, each holding scenario
//! elements whose steps carry a lowercase status, a duration in
//! nanoseconds, and an error message when the step failed.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::trace::{ScenarioTrace, StepStatus, StepTrace, TagRecord};

/// Errors raised while producing or persisting a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Serialising the report failed.
    #[error("failed to serialise cucumber report: {0}")]
    Serialise(#[from] serde_json::Error),
    /// Writing the report file failed.
    #[error("failed to write cucumber report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct Feature<'a> {
    keyword: &'static str,
    uri: &'a str,
    name: &'a str,
    id: String,
    line: u32,
    description: &'static str,
    tags: Vec<Tag<'a>>,
    elements: Vec<Element<'a>>,
}

#[derive(Serialize)]
struct Element<'a> {
    keyword: &'static str,
    id: &'a str,
    name: &'a str,
    line: u32,
    description: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    tags: Vec<Tag<'a>>,
    steps: Vec<ReportStep<'a>>,
}

#[derive(Serialize)]
struct Tag<'a> {
    name: &'a str,
    line: u32,
}

#[derive(Serialize)]
struct ReportStep<'a> {
    keyword: &'a str,
    name: &'a str,
    line: u32,
    #[serde(rename = "match")]
    match_: Match,
    result: StepResult<'a>,
}

#[derive(Serialize)]
struct Match {
    location: &'static str,
}

#[derive(Serialize)]
struct StepResult<'a> {
    status: &'static str,
    duration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<&'a str>,
}

fn tags(records: &[TagRecord]) -> Vec<Tag<'_>> {
    records
        .iter()
        .map(|t| Tag {
            name: &t.name,
            line: t.line,
        })
        .collect()
}

fn report_step(step: &StepTrace) -> ReportStep<'_> {
    let error_message = match step.status {
        StepStatus::Failed => step.error.as_deref(),
        StepStatus::Passed | StepStatus::Skipped => None,
    };
    ReportStep {
        keyword: &step.keyword,
        name: &step.text,
        line: step.line,
        match_: Match { location: "" },
        result: StepResult {
            status: step.status.label(),
            duration: step.duration_ns,
            error_message,
        },
    }
}

fn element(trace: &ScenarioTrace) -> Element<'_> {
    Element {
        keyword: "Scenario",
        id: &trace.test_id,
        name: &trace.scenario_name,
        line: trace.scenario_line,
        description: "",
        kind: "scenario",
        tags: tags(&trace.scenario_tags),
        steps: trace.steps.iter().map(report_step).collect(),
    }
}

fn feature_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

fn features(traces: &[ScenarioTrace]) -> Vec<Feature<'_>> {
    let mut result: Vec<Feature<'_>> = Vec::new();
    for trace in traces {
        match result.iter_mut().find(|f| f.uri == trace.feature_path) {
            Some(feature) => feature.elements.push(element(trace)),
            None => result.push(Feature {
                keyword: "Feature",
                uri: &trace.feature_path,
                name: &trace.feature_name,
                id: feature_id(&trace.feature_name),
                line: trace.feature_line,
                description: "",
                tags: tags(&trace.feature_tags),
                elements: vec![element(trace)],
            }),
        }
    }
    result
}

/// Serialise the provided traces into the supplied writer.
///
/// # Errors
/// Returns a [`serde_json::Error`] when serialisation fails.
pub fn write<W: Write>(writer: &mut W, traces: &[ScenarioTrace]) -> serde_json::Result<()> {
    serde_json::to_writer(writer, &features(traces))
}

/// Produce the cucumber JSON document for the provided traces.
///
/// # Errors
/// Returns a [`serde_json::Error`] when serialisation fails.
pub fn to_string(traces: &[ScenarioTrace]) -> serde_json::Result<String> {
    serde_json::to_string(&features(traces))
}

/// Serialise every scenario trace recorded so far into the writer.
///
/// # Errors
/// Returns a [`serde_json::Error`] when serialisation fails.
pub fn write_snapshot<W: Write>(writer: &mut W) -> serde_json::Result<()> {
    write(writer, &crate::trace::snapshot())
}

/// Write the report for the provided traces to `path`, replacing any
/// previous contents.
///
/// # Errors
/// Returns [`ReportError`] when serialisation or the filesystem write fails.
pub fn write_report_file(traces: &[ScenarioTrace], path: &Path) -> Result<(), ReportError> {
    let json = to_string(traces)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(feature: &str, scenario: &str, status: StepStatus) -> ScenarioTrace {
        ScenarioTrace {
            feature_path: format!("features/{feature}.feature"),
            feature_name: feature.to_string(),
            feature_line: 1,
            feature_tags: vec![TagRecord {
                name: "feature-tag".into(),
                line: 1,
            }],
            scenario_name: scenario.to_string(),
            scenario_line: 3,
            scenario_tags: Vec::new(),
            test_id: format!("test_{scenario}"),
            steps: vec![StepTrace {
                keyword: "Given".into(),
                text: "a traced step".into(),
                line: 4,
                duration_ns: 2_500,
                status,
                error: (status == StepStatus::Failed).then(|| "boom".to_string()),
            }],
        }
    }

    fn value(traces: &[ScenarioTrace]) -> serde_json::Value {
        let json = to_string(traces).unwrap_or_else(|e| panic!("report should serialise: {e}"));
        serde_json::from_str(&json).unwrap_or_else(|e| panic!("report should be valid JSON: {e}"))
    }

    #[test]
    fn scenarios_group_under_their_feature() {
        let report = value(&[
            trace("checkout", "pays", StepStatus::Passed),
            trace("checkout", "refunds", StepStatus::Passed),
            trace("search", "finds", StepStatus::Passed),
        ]);
        let features = report.as_array().map_or(0, Vec::len);
        assert_eq!(features, 2);
        assert_eq!(report[0]["elements"].as_array().map_or(0, Vec::len), 2);
        assert_eq!(report[0]["uri"], "features/checkout.feature");
    }

    #[test]
    fn feature_id_is_hyphenated_lowercase_name() {
        let report = value(&[trace("Order Tracking", "works", StepStatus::Passed)]);
        assert_eq!(report[0]["id"], "order-tracking");
        assert_eq!(report[0]["keyword"], "Feature");
    }

    #[test]
    fn failed_steps_carry_the_error_message() {
        let report = value(&[trace("billing", "fails", StepStatus::Failed)]);
        let step = &report[0]["elements"][0]["steps"][0];
        assert_eq!(step["result"]["status"], "failed");
        assert_eq!(step["result"]["error_message"], "boom");
        assert_eq!(step["result"]["duration"], 2_500);
        assert_eq!(step["match"]["location"], "");
    }

    #[test]
    fn passed_steps_omit_the_error_message() {
        let report = value(&[trace("billing", "passes", StepStatus::Passed)]);
        let result = &report[0]["elements"][0]["steps"][0]["result"];
        assert_eq!(result["status"], "passed");
        assert!(result.get("error_message").is_none());
    }

    #[test]
    fn element_carries_test_id_and_type() {
        let report = value(&[trace("billing", "passes", StepStatus::Passed)]);
        let element = &report[0]["elements"][0];
        assert_eq!(element["id"], "test_passes");
        assert_eq!(element["type"], "scenario");
        assert_eq!(element["description"], "");
    }

    #[test]
    #[serial_test::serial]
    fn write_snapshot_serialises_recorded_traces() {
        crate::config::set_report_path(None);
        let _ = crate::trace::drain();
        crate::trace::record(trace("snap", "records", StepStatus::Passed));
        let mut buffer = Vec::new();
        write_snapshot(&mut buffer).unwrap_or_else(|e| panic!("snapshot should serialise: {e}"));
        let report: serde_json::Value = serde_json::from_slice(&buffer)
            .unwrap_or_else(|e| panic!("snapshot should be valid JSON: {e}"));
        assert_eq!(report[0]["uri"], "features/snap.feature");
        assert_eq!(report[0]["elements"][0]["id"], "test_records");
        let _ = crate::trace::drain();
        crate::config::clear_report_path_override();
    }

    #[test]
    fn write_report_file_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("report.json");
        write_report_file(&[trace("a", "one", StepStatus::Passed)], &path)
            .unwrap_or_else(|e| panic!("first write should succeed: {e}"));
        write_report_file(&[trace("b", "two", StepStatus::Passed)], &path)
            .unwrap_or_else(|e| panic!("second write should succeed: {e}"));
        let contents =
            std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("report readable: {e}"));
        assert!(contents.contains("features/b.feature"));
        assert!(!contents.contains("features/a.feature"));
    }
}
