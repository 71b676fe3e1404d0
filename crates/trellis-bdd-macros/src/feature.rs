//! Feature file loading and scenario modelling.
//!
//! Parses a feature file with the `gherkin` crate at macro expansion time
//! and reduces it to the data the generated test needs: background and
//! scenario steps with their written keywords and line numbers, tags, and
//! outline example tables. Outline placeholders are substituted here so the
//! generated constants carry concrete step text.

use std::path::{Path, PathBuf};

use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use trellis_bdd_patterns::StepKeyword;

use crate::codegen::quote_keyword;

/// A step with everything the runtime's `ScenarioStep` needs.
#[derive(Debug, Clone)]
pub(crate) struct StepModel {
    pub(crate) keyword: StepKeyword,
    pub(crate) text: String,
    pub(crate) line: u32,
    pub(crate) docstring: Option<String>,
    pub(crate) table: Option<Vec<Vec<String>>>,
}

/// Example rows of a scenario outline; the header row is split off.
#[derive(Debug, Clone)]
pub(crate) struct OutlineModel {
    pub(crate) headers: Vec<String>,
    pub(crate) rows: Vec<Vec<String>>,
}

/// One scenario of a feature, with the background steps prepended.
#[derive(Debug, Clone)]
pub(crate) struct ScenarioModel {
    pub(crate) name: String,
    pub(crate) line: u32,
    pub(crate) tags: Vec<String>,
    pub(crate) steps: Vec<StepModel>,
    pub(crate) outline: Option<OutlineModel>,
}

/// A feature reduced to what the generated tests embed.
#[derive(Debug, Clone)]
pub(crate) struct FeatureModel {
    pub(crate) name: String,
    pub(crate) line: u32,
    pub(crate) tags: Vec<String>,
    pub(crate) scenarios: Vec<ScenarioModel>,
}

fn line_number(position: gherkin::LineCol) -> u32 {
    u32::try_from(position.line).unwrap_or(u32::MAX)
}

/// The written keyword decides conjunction handling; the parsed step type
/// is the fallback for localised keywords.
fn step_keyword(step: &gherkin::Step) -> StepKeyword {
    step.keyword
        .trim()
        .parse()
        .unwrap_or_else(|_| StepKeyword::from(step.ty))
}

fn step_model(step: &gherkin::Step) -> StepModel {
    StepModel {
        keyword: step_keyword(step),
        text: step.value.clone(),
        line: line_number(step.position),
        docstring: step.docstring.clone(),
        table: step.table.as_ref().map(|t| t.rows.clone()),
    }
}

fn outline_model(scenario: &gherkin::Scenario) -> syn::Result<Option<OutlineModel>> {
    if scenario.examples.is_empty() {
        return Ok(None);
    }
    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    for examples in &scenario.examples {
        let Some(table) = examples.table.as_ref() else {
            continue;
        };
        let mut table_rows = table.rows.iter();
        let Some(header_row) = table_rows.next() else {
            continue;
        };
        match &headers {
            None => headers = Some(header_row.clone()),
            Some(existing) if existing != header_row => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    format!(
                        "examples tables of scenario '{}' declare differing headers",
                        scenario.name
                    ),
                ));
            }
            Some(_) => {}
        }
        rows.extend(table_rows.cloned());
    }
    let Some(headers) = headers else {
        return Err(syn::Error::new(
            Span::call_site(),
            format!(
                "scenario outline '{}' has no examples table rows",
                scenario.name
            ),
        ));
    };
    if rows.is_empty() {
        return Err(syn::Error::new(
            Span::call_site(),
            format!("scenario outline '{}' has an empty examples table", scenario.name),
        ));
    }
    Ok(Some(OutlineModel { headers, rows }))
}

fn scenario_model(
    feature: &gherkin::Feature,
    scenario: &gherkin::Scenario,
) -> syn::Result<ScenarioModel> {
    let mut steps: Vec<StepModel> = Vec::new();
    if let Some(background) = &feature.background {
        steps.extend(background.steps.iter().map(step_model));
    }
    steps.extend(scenario.steps.iter().map(step_model));
    Ok(ScenarioModel {
        name: scenario.name.clone(),
        line: line_number(scenario.position),
        tags: scenario.tags.clone(),
        steps,
        outline: outline_model(scenario)?,
    })
}

fn feature_model(feature: &gherkin::Feature) -> syn::Result<FeatureModel> {
    let scenarios = feature
        .scenarios
        .iter()
        .map(|scenario| scenario_model(feature, scenario))
        .collect::<syn::Result<Vec<_>>>()?;
    Ok(FeatureModel {
        name: feature.name.clone(),
        line: line_number(feature.position),
        tags: feature.tags.clone(),
        scenarios,
    })
}

/// Resolve `path` against `CARGO_MANIFEST_DIR` as Cargo sets it for the
/// crate being compiled.
pub(crate) fn manifest_relative(path: &str) -> syn::Result<PathBuf> {
    let manifest_dir = std::env::var_os("CARGO_MANIFEST_DIR").ok_or_else(|| {
        syn::Error::new(
            Span::call_site(),
            "CARGO_MANIFEST_DIR is not set; feature paths require a Cargo build",
        )
    })?;
    Ok(Path::new(&manifest_dir).join(path))
}

/// Load and model a feature file.
pub(crate) fn load_feature(full_path: &Path, span: Span) -> syn::Result<FeatureModel> {
    if !full_path.is_file() {
        return Err(syn::Error::new(
            span,
            format!("feature file not found: {}", full_path.display()),
        ));
    }
    let feature = gherkin::Feature::parse_path(full_path, gherkin::GherkinEnv::default())
        .map_err(|err| {
            syn::Error::new(
                span,
                format!("failed to parse feature {}: {err}", full_path.display()),
            )
        })?;
    feature_model(&feature)
}

/// Substitute `<header>` outline parameters into `text`.
///
/// Unknown `<word>` parameters are an error so a renamed examples column
/// fails the build instead of leaking angle brackets into step text.
pub(crate) fn substitute_outline(
    text: &str,
    headers: &[String],
    row: &[String],
) -> syn::Result<String> {
    let mut result = text.to_string();
    for (header, value) in headers.iter().zip(row) {
        result = result.replace(&format!("<{header}>"), value);
    }
    if let Some(unknown) = leftover_parameter(&result) {
        return Err(syn::Error::new(
            Span::call_site(),
            format!("step '{text}' references unknown examples column '{unknown}'"),
        ));
    }
    Ok(result)
}

fn leftover_parameter(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut start = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => start = Some(i + 1),
            b'>' => {
                if let Some(s) = start.take() {
                    let inner = &text[s..i];
                    if !inner.is_empty()
                        && inner
                            .bytes()
                            .all(|c| c.is_ascii_alphanumeric() || c == b'_')
                    {
                        return Some(inner.to_string());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Tokens for a `trellis_bdd::ScenarioStep` literal.
pub(crate) fn step_tokens(step: &StepModel) -> TokenStream2 {
    let keyword = quote_keyword(step.keyword);
    let text = &step.text;
    let line = step.line;
    let docstring = match &step.docstring {
        Some(content) => quote! { ::std::option::Option::Some(#content) },
        None => quote! { ::std::option::Option::None },
    };
    let table = match &step.table {
        Some(rows) => {
            let row_tokens = rows.iter().map(|row| {
                let cells = row.iter();
                quote! { &[#(#cells),*] }
            });
            quote! { ::std::option::Option::Some(&[#(#row_tokens),*]) }
        }
        None => quote! { ::std::option::Option::None },
    };
    quote! {
        trellis_bdd::ScenarioStep {
            keyword: #keyword,
            text: #text,
            line: #line,
            docstring: #docstring,
            table: #table,
        }
    }
}

/// Tokens for a `&[trellis_bdd::Tag]` literal. Gherkin does not retain tag
/// positions, so tags are attributed to the line above their owner.
pub(crate) fn tag_tokens(tags: &[String], owner_line: u32) -> TokenStream2 {
    let line = owner_line.saturating_sub(1);
    let entries = tags.iter().map(|name| {
        quote! { trellis_bdd::Tag { name: #name, line: #line } }
    });
    quote! { &[#(#entries),*] }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn substitution_replaces_every_parameter() {
        let text = substitute_outline(
            "move <item> from <src> to <src>",
            &strings(&["item", "src"]),
            &strings(&["lamp", "attic"]),
        )
        .unwrap_or_else(|e| panic!("substitution should succeed: {e}"));
        assert_eq!(text, "move lamp from attic to attic");
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let Err(err) = substitute_outline(
            "a cart with <quantity> items",
            &strings(&["count"]),
            &strings(&["3"]),
        ) else {
            panic!("unknown column should be rejected");
        };
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn comparison_operators_are_not_parameters() {
        let text = substitute_outline("totals where a < b > c", &strings(&[]), &strings(&[]))
            .unwrap_or_else(|e| panic!("plain text should pass: {e}"));
        assert_eq!(text, "totals where a < b > c");
    }

    #[test]
    fn step_tokens_embed_docstring_and_table() {
        let step = StepModel {
            keyword: StepKeyword::Given,
            text: "seeded data".into(),
            line: 7,
            docstring: Some("payload".into()),
            table: Some(vec![strings(&["a", "b"]), strings(&["c", "d"])]),
        };
        let rendered = step_tokens(&step).to_string();
        assert!(rendered.contains("\"seeded data\""));
        assert!(rendered.contains("Some (\"payload\")"));
        assert!(rendered.contains("\"c\""));
        assert!(rendered.contains("7u32"));
    }

    #[test]
    fn tag_tokens_sit_one_line_above_the_owner() {
        let rendered = tag_tokens(&strings(&["smoke"]), 12).to_string();
        assert!(rendered.contains("\"smoke\""));
        assert!(rendered.contains("11u32"));
    }
}
