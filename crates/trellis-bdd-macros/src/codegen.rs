//! Code generation for step registration.
//!
//! Each step attribute expands into the original function plus a wrapper
//! with the registry's uniform signature. The wrapper extracts placeholder
//! captures, resolves fixtures from the context, and adapts the function's
//! return value into a `StepOutcome`.

use std::sync::atomic::{AtomicUsize, Ordering};

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use trellis_bdd_patterns::{placeholder_names, StepKeyword};

use crate::args::{classify_args, StepFnArg};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn quote_keyword(keyword: StepKeyword) -> TokenStream2 {
    match keyword {
        StepKeyword::Given => quote! { trellis_bdd::StepKeyword::Given },
        StepKeyword::When => quote! { trellis_bdd::StepKeyword::When },
        StepKeyword::Then => quote! { trellis_bdd::StepKeyword::Then },
        StepKeyword::And => quote! { trellis_bdd::StepKeyword::And },
        StepKeyword::But => quote! { trellis_bdd::StepKeyword::But },
    }
}

pub(crate) fn step_attribute(
    attr: TokenStream,
    item: TokenStream,
    keyword: StepKeyword,
) -> TokenStream {
    let pattern = syn::parse_macro_input!(attr as syn::LitStr);
    let func = syn::parse_macro_input!(item as syn::ItemFn);
    match expand_step(&pattern, func, keyword) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn arg_declaration(arg: &StepFnArg) -> TokenStream2 {
    match arg {
        StepFnArg::Placeholder { pat, ty, index } => {
            let name = pat.to_string();
            quote! {
                let #pat: #ty = trellis_bdd::parse_step_argument::<#ty>(
                    #name,
                    &__trellis_captures[#index],
                )?;
            }
        }
        StepFnArg::Docstring { pat } => quote! {
            let #pat: ::std::string::String = __trellis_docstring
                .ok_or(trellis_bdd::StepError::MissingDocstring)?
                .to_owned();
        },
        StepFnArg::DataTable { pat } => quote! {
            let #pat: ::std::vec::Vec<::std::vec::Vec<::std::string::String>> = __trellis_table
                .ok_or(trellis_bdd::StepError::MissingTable)?
                .iter()
                .map(|row| row.iter().map(|cell| (*cell).to_owned()).collect())
                .collect();
        },
        StepFnArg::Fixture { pat, name, ty } => {
            let name_str = name.to_string();
            if let syn::Type::Reference(reference) = ty {
                let inner = &*reference.elem;
                quote! {
                    let #pat: #ty = __trellis_ctx
                        .get::<#inner>(#name_str)
                        .ok_or(trellis_bdd::StepError::MissingFixture {
                            name: #name_str,
                            ty: stringify!(#inner),
                        })?;
                }
            } else {
                quote! {
                    let #pat: #ty = __trellis_ctx
                        .get::<#ty>(#name_str)
                        .ok_or(trellis_bdd::StepError::MissingFixture {
                            name: #name_str,
                            ty: stringify!(#ty),
                        })?
                        .clone();
                }
            }
        }
    }
}

fn expand_step(
    pattern: &syn::LitStr,
    mut func: syn::ItemFn,
    keyword: StepKeyword,
) -> syn::Result<TokenStream2> {
    let placeholders = placeholder_names(&pattern.value())
        .map_err(|err| syn::Error::new(pattern.span(), err.to_string()))?;
    // Surface brace and placeholder errors at expansion rather than when
    // the registry first compiles the pattern.
    trellis_bdd_patterns::build_regex_source(&pattern.value())
        .map_err(|err| syn::Error::new(pattern.span(), err.to_string()))?;
    let args = classify_args(&mut func, &placeholders)?;

    let ident = &func.sig.ident;
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let wrapper_ident = format_ident!("__trellis_wrapper_{}_{}", ident, id);
    let pattern_ident = format_ident!("__trellis_pattern_{}_{}", ident, id);
    let fixtures_ident = format_ident!("__trellis_fixtures_{}_{}", ident, id);

    let has_placeholder_args = args
        .iter()
        .any(|arg| matches!(arg, StepFnArg::Placeholder { .. }));
    let captures_stmt = has_placeholder_args.then(|| {
        quote! {
            let __trellis_captures = #pattern_ident.extract(__trellis_text)?;
        }
    });
    let declarations: Vec<_> = args.iter().map(arg_declaration).collect();
    let arg_idents: Vec<_> = args
        .iter()
        .map(|arg| match arg {
            StepFnArg::Placeholder { pat, .. }
            | StepFnArg::Docstring { pat }
            | StepFnArg::DataTable { pat }
            | StepFnArg::Fixture { pat, .. } => pat,
        })
        .collect();

    let invoke = if matches!(func.sig.output, syn::ReturnType::Default) {
        quote! {
            #ident(#(#arg_idents),*);
            Ok(trellis_bdd::StepOutcome::from_value(None))
        }
    } else {
        quote! {
            let __trellis_value = #ident(#(#arg_idents),*);
            Ok(trellis_bdd::StepOutcome::from_value(Some(
                ::std::boxed::Box::new(__trellis_value),
            )))
        }
    };

    let fixture_names: Vec<String> = args.iter().filter_map(StepFnArg::fixture_name).collect();
    let fixture_count = fixture_names.len();
    let keyword_tokens = quote_keyword(keyword);

    Ok(quote! {
        #func

        #[allow(non_upper_case_globals)]
        static #pattern_ident: trellis_bdd::StepPattern =
            trellis_bdd::StepPattern::new(#pattern);

        #[allow(clippy::used_underscore_binding, clippy::redundant_closure_for_method_calls)]
        fn #wrapper_ident(
            __trellis_ctx: &mut trellis_bdd::StepContext<'_>,
            __trellis_text: &str,
            __trellis_docstring: ::std::option::Option<&str>,
            __trellis_table: ::std::option::Option<&[&[&str]]>,
        ) -> ::std::result::Result<trellis_bdd::StepOutcome, trellis_bdd::StepError> {
            #captures_stmt
            #(#declarations)*
            #invoke
        }

        #[allow(non_upper_case_globals)]
        static #fixtures_ident: [&'static str; #fixture_count] = [#(#fixture_names),*];

        trellis_bdd::submit! {
            trellis_bdd::Step {
                keyword: #keyword_tokens,
                pattern: &#pattern_ident,
                run: #wrapper_ident,
                fixtures: &#fixtures_ident,
                file: file!(),
                line: line!(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(pattern: &str, func: TokenStream2) -> String {
        let pattern = syn::LitStr::new(pattern, proc_macro2::Span::call_site());
        let func: syn::ItemFn =
            syn::parse2(func).unwrap_or_else(|e| panic!("function should parse: {e}"));
        expand_step(&pattern, func, StepKeyword::Given)
            .unwrap_or_else(|e| panic!("expansion should succeed: {e}"))
            .to_string()
    }

    #[test]
    fn registers_the_step_with_the_inventory() {
        let rendered = expand("a plain step", quote! { fn plain() {} });
        assert!(rendered.contains("trellis_bdd :: submit !"));
        assert!(rendered.contains("StepKeyword :: Given"));
        assert!(rendered.contains("file ! ()"));
    }

    #[test]
    fn placeholder_arguments_parse_from_captures() {
        let rendered = expand("I buy {count:u32} pears", quote! { fn buy(count: u32) {} });
        assert!(rendered.contains("parse_step_argument"));
        assert!(rendered.contains("__trellis_captures [0usize]"));
    }

    #[test]
    fn fixtures_are_listed_for_validation() {
        let rendered = expand("the till is open", quote! { fn open(till: &Till) {} });
        assert!(rendered.contains("[\"till\"]"));
        assert!(rendered.contains("MissingFixture"));
    }

    #[test]
    fn non_unit_return_is_boxed_into_the_outcome() {
        let rendered = expand("a total is computed", quote! { fn total() -> u64 { 4 } });
        assert!(rendered.contains("Box :: new (__trellis_value)"));
    }

    #[test]
    fn invalid_pattern_is_a_compile_error() {
        let pattern = syn::LitStr::new("broken {", proc_macro2::Span::call_site());
        let func: syn::ItemFn = syn::parse2(quote! { fn broken() {} })
            .unwrap_or_else(|e| panic!("function should parse: {e}"));
        let Err(err) = expand_step(&pattern, func, StepKeyword::Given) else {
            panic!("unbalanced brace should be rejected");
        };
        assert!(err.to_string().contains("unbalanced braces"));
    }
}
