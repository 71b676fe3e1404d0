//! Implementation of the `#[scenario]` attribute.
//!
//! The attribute selects one scenario from a feature file, embeds its steps
//! (and, for outlines, one constant per example row) into the test, and
//! wraps the test body so the scenario runs first. The generated test is an
//! `rstest` test so fixture arguments resolve the usual way.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};

use crate::feature::{
    load_feature, manifest_relative, step_tokens, substitute_outline, tag_tokens, FeatureModel,
    ScenarioModel, StepModel,
};

/// Which scenario of the feature the test binds to.
pub(crate) enum ScenarioSelector {
    /// Zero-based index into the feature's scenarios.
    Index(usize),
    /// Case-sensitive scenario name.
    Name(String),
    /// The feature's first scenario.
    First,
}

pub(crate) struct ScenarioArgs {
    pub(crate) path: syn::LitStr,
    pub(crate) selector: ScenarioSelector,
}

impl Parse for ScenarioArgs {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let mut path: Option<syn::LitStr> = None;
        let mut selector = ScenarioSelector::First;
        let mut saw_selector = false;
        let pairs =
            syn::punctuated::Punctuated::<syn::MetaNameValue, syn::Token![,]>::parse_terminated(
                input,
            )?;
        for pair in pairs {
            let key = pair
                .path
                .get_ident()
                .map(ToString::to_string)
                .unwrap_or_default();
            match key.as_str() {
                "path" => path = Some(expect_str(&pair)?),
                "name" => {
                    if saw_selector {
                        return Err(syn::Error::new_spanned(
                            &pair.path,
                            "specify either `name` or `index`, not both",
                        ));
                    }
                    selector = ScenarioSelector::Name(expect_str(&pair)?.value());
                    saw_selector = true;
                }
                "index" => {
                    if saw_selector {
                        return Err(syn::Error::new_spanned(
                            &pair.path,
                            "specify either `name` or `index`, not both",
                        ));
                    }
                    selector = ScenarioSelector::Index(expect_index(&pair)?);
                    saw_selector = true;
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        &pair.path,
                        format!("unknown scenario argument `{other}`"),
                    ));
                }
            }
        }
        let Some(path) = path else {
            return Err(input.error("missing required `path = \"...\"` argument"));
        };
        Ok(Self { path, selector })
    }
}

fn expect_str(pair: &syn::MetaNameValue) -> syn::Result<syn::LitStr> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Str(lit),
        ..
    }) = &pair.value
    {
        Ok(lit.clone())
    } else {
        Err(syn::Error::new_spanned(
            &pair.value,
            "expected a string literal",
        ))
    }
}

fn expect_index(pair: &syn::MetaNameValue) -> syn::Result<usize> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Int(lit),
        ..
    }) = &pair.value
    {
        lit.base10_parse()
    } else {
        Err(syn::Error::new_spanned(
            &pair.value,
            "expected an integer literal",
        ))
    }
}

pub(crate) fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(attr as ScenarioArgs);
    let func = syn::parse_macro_input!(item as syn::ItemFn);
    match expand_scenario(&args, func) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn select<'a>(
    feature: &'a FeatureModel,
    selector: &ScenarioSelector,
    span: proc_macro2::Span,
) -> syn::Result<&'a ScenarioModel> {
    match selector {
        ScenarioSelector::First => feature
            .scenarios
            .first()
            .ok_or_else(|| syn::Error::new(span, "feature contains no scenarios")),
        ScenarioSelector::Index(index) => feature.scenarios.get(*index).ok_or_else(|| {
            syn::Error::new(
                span,
                format!(
                    "scenario index {index} out of range; feature has {} scenarios",
                    feature.scenarios.len()
                ),
            )
        }),
        ScenarioSelector::Name(name) => feature
            .scenarios
            .iter()
            .find(|scenario| scenario.name == *name)
            .ok_or_else(|| {
                let available: Vec<String> = feature
                    .scenarios
                    .iter()
                    .map(|s| format!("\"{}\"", s.name))
                    .collect();
                syn::Error::new(
                    span,
                    format!(
                        "scenario named \"{name}\" not found; available: {}",
                        available.join(", ")
                    ),
                )
            }),
    }
}

fn expand_scenario(args: &ScenarioArgs, func: syn::ItemFn) -> syn::Result<TokenStream2> {
    let span = args.path.span();
    let full_path = manifest_relative(&args.path.value())?;
    let feature = load_feature(&full_path, span)?;
    let scenario = select(&feature, &args.selector, span)?;
    scenario_test_tokens(&feature, scenario, &args.path.value(), &func)
}

fn substituted_steps(
    steps: &[StepModel],
    headers: &[String],
    row: &[String],
) -> syn::Result<Vec<StepModel>> {
    steps
        .iter()
        .map(|step| {
            Ok(StepModel {
                text: substitute_outline(&step.text, headers, row)?,
                docstring: step
                    .docstring
                    .as_deref()
                    .map(|d| substitute_outline(d, headers, row))
                    .transpose()?,
                ..step.clone()
            })
        })
        .collect()
}

/// Identifier suffix for an outline case, e.g. `test_login[alice-ok]`.
fn case_id(fn_name: &str, row: &[String]) -> String {
    format!("{fn_name}[{}]", row.join("-"))
}

fn steps_binding(
    feature_scenario: &ScenarioModel,
    fn_name: &str,
) -> syn::Result<(TokenStream2, Vec<TokenStream2>)> {
    let Some(outline) = &feature_scenario.outline else {
        let steps: Vec<_> = feature_scenario.steps.iter().map(step_tokens).collect();
        let binding = quote! {
            const __TRELLIS_STEPS: &[trellis_bdd::ScenarioStep] = &[#(#steps),*];
            let __trellis_test_id: &str = #fn_name;
            let __trellis_steps = __TRELLIS_STEPS;
        };
        return Ok((binding, Vec::new()));
    };

    let mut cases = Vec::new();
    let mut case_attrs = Vec::new();
    for (row_index, row) in outline.rows.iter().enumerate() {
        let steps = substituted_steps(&feature_scenario.steps, &outline.headers, row)?;
        let tokens: Vec<_> = steps.iter().map(step_tokens).collect();
        let id = case_id(fn_name, row);
        cases.push(quote! { (#id, &[#(#tokens),*]) });
        let case_name = format_ident!("row_{}", row_index + 1);
        let index = row_index;
        case_attrs.push(quote! { #[case::#case_name(#index)] });
    }
    let binding = quote! {
        const __TRELLIS_CASES: &[(&str, &[trellis_bdd::ScenarioStep])] = &[#(#cases),*];
        let (__trellis_test_id, __trellis_steps) = __TRELLIS_CASES[__trellis_case];
    };
    Ok((binding, case_attrs))
}

fn context_inserts(inputs: &syn::punctuated::Punctuated<syn::FnArg, syn::Token![,]>) -> Vec<TokenStream2> {
    inputs
        .iter()
        .filter_map(|input| {
            let syn::FnArg::Typed(arg) = input else {
                return None;
            };
            let syn::Pat::Ident(pat) = &*arg.pat else {
                return None;
            };
            let ident = &pat.ident;
            let name = ident.to_string();
            Some(quote! { __trellis_ctx.insert(#name, &#ident); })
        })
        .collect()
}

/// Generate the full test function for one scenario.
pub(crate) fn scenario_test_tokens(
    feature: &FeatureModel,
    scenario: &ScenarioModel,
    feature_path: &str,
    func: &syn::ItemFn,
) -> syn::Result<TokenStream2> {
    let attrs = &func.attrs;
    let vis = &func.vis;
    let ident = &func.sig.ident;
    let output = &func.sig.output;
    let inputs = &func.sig.inputs;
    let block = &func.block;
    let fn_name = ident.to_string();

    let (steps_binding, case_attrs) = steps_binding(scenario, &fn_name)?;
    let case_arg = scenario
        .outline
        .as_ref()
        .map(|_| quote! { #[case] __trellis_case: usize, });
    let inserts = context_inserts(inputs);

    let feature_name = &feature.name;
    let feature_line = feature.line;
    let feature_tags = tag_tokens(&feature.tags, feature.line);
    let scenario_name = &scenario.name;
    let scenario_line = scenario.line;
    let scenario_tags = tag_tokens(&scenario.tags, scenario.line);

    Ok(quote! {
        #[rstest::rstest]
        #(#case_attrs)*
        #(#attrs)*
        #vis fn #ident(#case_arg #inputs) #output {
            #steps_binding
            let __trellis_metadata = trellis_bdd::ScenarioMetadata {
                feature_path: #feature_path,
                feature_name: #feature_name,
                feature_line: #feature_line,
                feature_tags: #feature_tags,
                name: #scenario_name,
                line: #scenario_line,
                tags: #scenario_tags,
                test_id: __trellis_test_id,
            };
            let mut __trellis_ctx = trellis_bdd::StepContext::default();
            #(#inserts)*
            trellis_bdd::run_scenario(&__trellis_metadata, __trellis_steps, &mut __trellis_ctx);
            ::std::mem::drop(__trellis_ctx);
            #block
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use trellis_bdd_patterns::StepKeyword;

    fn model(outline: Option<crate::feature::OutlineModel>) -> (FeatureModel, ScenarioModel) {
        let scenario = ScenarioModel {
            name: "Logs in".into(),
            line: 4,
            tags: vec!["auth".into()],
            steps: vec![StepModel {
                keyword: StepKeyword::Given,
                text: "a user named <user>".into(),
                line: 5,
                docstring: None,
                table: None,
            }],
            outline,
        };
        let feature = FeatureModel {
            name: "Login".into(),
            line: 1,
            tags: Vec::new(),
            scenarios: vec![scenario.clone()],
        };
        (feature, scenario)
    }

    fn sample_fn() -> syn::ItemFn {
        syn::parse2(quote! { fn test_logs_in(session: Session) {} })
            .unwrap_or_else(|e| panic!("function should parse: {e}"))
    }

    #[test]
    fn plain_scenario_embeds_a_step_constant() {
        let scenario = ScenarioModel {
            steps: vec![StepModel {
                keyword: StepKeyword::Given,
                text: "a user".into(),
                line: 5,
                docstring: None,
                table: None,
            }],
            outline: None,
            ..model(None).1
        };
        let (feature, _) = model(None);
        let rendered =
            scenario_test_tokens(&feature, &scenario, "tests/features/login.feature", &sample_fn())
                .unwrap_or_else(|e| panic!("expansion should succeed: {e}"))
                .to_string();
        assert!(rendered.contains("__TRELLIS_STEPS"));
        assert!(rendered.contains("rstest :: rstest"));
        assert!(rendered.contains("\"test_logs_in\""));
        assert!(rendered.contains("insert (\"session\""));
        assert!(rendered.contains("run_scenario"));
    }

    #[test]
    fn outline_expands_one_case_per_row() {
        let outline = crate::feature::OutlineModel {
            headers: vec!["user".into()],
            rows: vec![vec!["alice".into()], vec!["bob".into()]],
        };
        let (feature, scenario) = model(Some(outline));
        let rendered =
            scenario_test_tokens(&feature, &scenario, "tests/features/login.feature", &sample_fn())
                .unwrap_or_else(|e| panic!("expansion should succeed: {e}"))
                .to_string();
        assert!(rendered.contains("__TRELLIS_CASES"));
        assert!(rendered.contains("a user named alice"));
        assert!(rendered.contains("a user named bob"));
        assert!(rendered.contains("test_logs_in[alice]"));
        assert!(rendered.contains("case :: row_2"));
        assert!(rendered.contains("__trellis_case : usize"));
    }

    #[test]
    fn unknown_outline_column_fails_expansion() {
        let outline = crate::feature::OutlineModel {
            headers: vec!["account".into()],
            rows: vec![vec!["alice".into()]],
        };
        let (feature, scenario) = model(Some(outline));
        let Err(err) = scenario_test_tokens(
            &feature,
            &scenario,
            "tests/features/login.feature",
            &sample_fn(),
        ) else {
            panic!("unknown column should fail");
        };
        assert!(err.to_string().contains("user"));
    }

    #[test]
    fn selector_parsing_rejects_both_name_and_index() {
        let parsed: syn::Result<ScenarioArgs> = syn::parse2(quote! {
            path = "a.feature", name = "x", index = 1
        });
        let Err(err) = parsed else {
            panic!("conflicting selectors should be rejected");
        };
        assert!(err.to_string().contains("not both"));
    }

    #[test]
    fn selector_parsing_requires_a_path() {
        let parsed: syn::Result<ScenarioArgs> = syn::parse2(quote! { name = "x" });
        let Err(err) = parsed else {
            panic!("missing path should be rejected");
        };
        assert!(err.to_string().contains("path"));
    }
}
