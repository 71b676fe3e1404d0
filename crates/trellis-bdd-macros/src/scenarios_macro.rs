//! Implementation of the `scenarios!` macro.
//!
//! Walks a directory for `.feature` files and emits one fixture-less test
//! per scenario. Test names combine the feature file stem and the scenario
//! name; collisions get a numeric suffix so two features can share scenario
//! names.

use std::collections::HashMap;
use std::path::Path;

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use walkdir::WalkDir;

use crate::feature::{load_feature, manifest_relative};
use crate::scenario::scenario_test_tokens;

pub(crate) fn scenarios(input: TokenStream) -> TokenStream {
    let dir = syn::parse_macro_input!(input as syn::LitStr);
    match expand_scenarios(&dir) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn identifier_fragment(text: &str) -> String {
    let spaced: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let fragment = spaced.to_case(Case::Snake);
    if fragment.is_empty() {
        "scenario".to_string()
    } else {
        fragment
    }
}

fn feature_files(root: &Path, span: proc_macro2::Span) -> syn::Result<Vec<std::path::PathBuf>> {
    if !root.is_dir() {
        return Err(syn::Error::new(
            span,
            format!("feature directory not found: {}", root.display()),
        ));
    }
    let mut files: Vec<_> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "feature")
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(syn::Error::new(
            span,
            format!("no .feature files found under {}", root.display()),
        ));
    }
    Ok(files)
}

fn expand_scenarios(dir: &syn::LitStr) -> syn::Result<TokenStream2> {
    let span = dir.span();
    let root = manifest_relative(&dir.value())?;
    let files = feature_files(&root, span)?;

    let mut tests = Vec::new();
    let mut names: HashMap<String, usize> = HashMap::new();
    for file in files {
        let feature = load_feature(&file, span)?;
        // The generated attribute paths stay relative to the manifest so
        // the expansion is stable across machines.
        let relative = file
            .strip_prefix(manifest_relative("")?)
            .unwrap_or(&file)
            .to_string_lossy()
            .into_owned();
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        for scenario in &feature.scenarios {
            let base = format!(
                "test_{}_{}",
                identifier_fragment(&stem),
                identifier_fragment(&scenario.name)
            );
            let count = names.entry(base.clone()).or_insert(0);
            *count += 1;
            let name = if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            };
            let ident = format_ident!("{}", name);
            let func: syn::ItemFn = syn::parse_quote! { fn #ident() {} };
            tests.push(scenario_test_tokens(&feature, scenario, &relative, &func)?);
        }
    }
    Ok(quote! { #(#tests)* })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_fragment_flattens_free_text() {
        assert_eq!(identifier_fragment("Adds two numbers"), "adds_two_numbers");
        assert_eq!(identifier_fragment("---"), "scenario");
    }
}
