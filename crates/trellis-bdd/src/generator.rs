//! Code-stub generation for undefined scenarios and steps.
//!
//! Given a parsed feature, [`scaffold_feature`] renders a ready-to-edit Rust
//! test module: one `#[scenario]` test per scenario plus a stub function for
//! every distinct step, grouped by keyword and alphabetised. Outline
//! placeholders written as `<name>` become `{name}` pattern placeholders
//! with a `String` argument on the stub.

use std::collections::HashMap;
use std::sync::LazyLock;

use convert_case::{Case, Casing};
use regex::Regex;
use serde::Deserialize;
use trellis_bdd_patterns::{placeholder_names, StepKeyword};

static OUTLINE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(\w+)>").unwrap_or_else(|e| panic!("outline parameter regex: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
struct StepStub {
    keyword: StepKeyword,
    pattern: String,
}

/// One already-registered step read back from a registry dump.
///
/// The dump is the JSON array produced by the registry's `diagnostics`
/// output; extra fields such as fixtures and source location are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DefinedStep {
    /// Keyword the definition is registered under, e.g. `Given`.
    pub keyword: String,
    /// Pattern text of the definition.
    pub pattern: String,
}

impl DefinedStep {
    fn covers(&self, stub: &StepStub) -> bool {
        self.pattern == stub.pattern && self.keyword.parse::<StepKeyword>() == Ok(stub.keyword)
    }
}

/// Parse a registry dump JSON document into its step definitions.
///
/// # Errors
/// Returns a [`serde_json::Error`] when the document is not a valid dump.
pub fn parse_registry_dump(json: &str) -> serde_json::Result<Vec<DefinedStep>> {
    serde_json::from_str(json)
}

/// Convert outline angle-bracket parameters into pattern placeholders.
fn outline_to_pattern(text: &str) -> String {
    OUTLINE_PARAM.replace_all(text, "{$1}").into_owned()
}

/// Escape a string for inclusion in a Rust string literal.
fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape a string for use as a `todo!` format string.
fn escape_message(text: &str) -> String {
    escape_literal(text).replace('{', "{{").replace('}', "}}")
}

/// Derive a Rust identifier from free text.
fn identifier(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let name = spaced.to_case(Case::Snake);
    if name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        name
    } else if name.is_empty() {
        "step".to_string()
    } else {
        format!("step_{name}")
    }
}

/// Hands out identifiers, suffixing repeats with a counter.
#[derive(Default)]
struct NamePool {
    seen: HashMap<String, usize>,
}

impl NamePool {
    fn claim(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{base}_{count}")
        }
    }
}

fn container_stubs(steps: &[gherkin::Step], stubs: &mut Vec<StepStub>) {
    let mut previous: Option<StepKeyword> = None;
    for step in steps {
        let keyword = StepKeyword::from(step.ty).resolve(&mut previous);
        let pattern = outline_to_pattern(&step.value);
        let stub = StepStub { keyword, pattern };
        if !stubs.contains(&stub) {
            stubs.push(stub);
        }
    }
}

fn collect_stubs(feature: &gherkin::Feature) -> Vec<StepStub> {
    let mut stubs = Vec::new();
    if let Some(background) = &feature.background {
        container_stubs(&background.steps, &mut stubs);
    }
    for scenario in &feature.scenarios {
        container_stubs(&scenario.steps, &mut stubs);
    }
    stubs.sort_by(|a, b| {
        keyword_rank(a.keyword)
            .cmp(&keyword_rank(b.keyword))
            .then_with(|| a.pattern.cmp(&b.pattern))
    });
    stubs
}

fn keyword_rank(keyword: StepKeyword) -> usize {
    match keyword {
        StepKeyword::Given => 0,
        StepKeyword::When => 1,
        StepKeyword::Then | StepKeyword::And | StepKeyword::But => 2,
    }
}

fn macro_imports(feature: &gherkin::Feature, stubs: &[StepStub]) -> Vec<&'static str> {
    let mut imports = Vec::new();
    for stub in stubs {
        let name = match stub.keyword {
            StepKeyword::Given => "given",
            StepKeyword::When => "when",
            StepKeyword::Then | StepKeyword::And | StepKeyword::But => "then",
        };
        if !imports.contains(&name) {
            imports.push(name);
        }
    }
    if !feature.scenarios.is_empty() {
        imports.push("scenario");
    }
    imports.sort_unstable();
    imports
}

fn push_scenario_tests(out: &mut String, feature: &gherkin::Feature, feature_path: &str) {
    let mut names = NamePool::default();
    for scenario in &feature.scenarios {
        let test_name = names.claim(&format!("test_{}", identifier(&scenario.name)));
        out.push_str(&format!(
            "#[scenario(path = \"{}\", name = \"{}\")]\nfn {test_name}() {{}}\n\n",
            escape_literal(feature_path),
            escape_literal(&scenario.name),
        ));
    }
}

fn push_step_stubs(out: &mut String, stubs: &[StepStub]) {
    let mut names = NamePool::default();
    for stub in stubs {
        let attribute = match stub.keyword {
            StepKeyword::Given => "given",
            StepKeyword::When => "when",
            StepKeyword::Then | StepKeyword::And | StepKeyword::But => "then",
        };
        let fn_name = names.claim(&identifier(&stub.pattern));
        let args = placeholder_names(&stub.pattern)
            .unwrap_or_default()
            .iter()
            .map(|name| format!("{name}: String"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "#[{attribute}(\"{}\")]\nfn {fn_name}({args}) {{\n    todo!(\"{}\");\n}}\n\n",
            escape_literal(&stub.pattern),
            escape_message(&stub.pattern),
        ));
    }
}

/// Render a Rust test module scaffolding every scenario and step of a
/// feature.
///
/// `feature_path` is embedded verbatim in the generated `#[scenario]`
/// attributes, so it should be the path the generated module will use at
/// compile time, typically relative to the crate root.
#[must_use]
pub fn scaffold_feature(feature: &gherkin::Feature, feature_path: &str) -> String {
    scaffold_missing(feature, feature_path, &[])
}

/// Like [`scaffold_feature`], but omits stubs for steps that already have a
/// definition in `defined`, so only the missing ones are generated.
/// Scenario tests are always emitted.
#[must_use]
pub fn scaffold_missing(
    feature: &gherkin::Feature,
    feature_path: &str,
    defined: &[DefinedStep],
) -> String {
    let stubs: Vec<StepStub> = collect_stubs(feature)
        .into_iter()
        .filter(|stub| !defined.iter().any(|existing| existing.covers(stub)))
        .collect();
    let mut out = String::new();
    out.push_str(&format!("//! {} feature tests.\n\n", feature.name));
    let imports = macro_imports(feature, &stubs);
    if !imports.is_empty() {
        out.push_str(&format!(
            "use trellis_bdd_macros::{{{}}};\n\n",
            imports.join(", ")
        ));
    }
    push_scenario_tests(&mut out, feature, feature_path);
    push_step_stubs(&mut out, &stubs);
    let trimmed = out.trim_end();
    format!("{trimmed}\n")
}
