//! Procedural macros for the trellis-bdd testing framework.
//!
//! `#[given]`, `#[when]`, and `#[then]` turn a plain function into a step
//! definition registered with the runtime inventory. `#[scenario]` binds a
//! test function to one scenario of a feature file, baking the scenario's
//! steps in at compile time, and `scenarios!` discovers every feature file
//! under a directory and emits one test per scenario.

mod args;
mod codegen;
mod feature;
mod scenario;
mod scenarios_macro;

use proc_macro::TokenStream;
use trellis_bdd_patterns::StepKeyword;

/// Define a `Given` step.
///
/// The attribute takes the step pattern as a string literal. Function
/// arguments whose names match pattern placeholders receive the captured
/// values, an argument named `docstring` receives the step's docstring,
/// `datatable` receives its data table, and every other argument is looked
/// up as a fixture (rename with `#[from(name)]`).
///
/// ```ignore
/// #[given("a basket with {count:u32} apples")]
/// fn basket(count: u32, store: &Store) { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn given(attr: TokenStream, item: TokenStream) -> TokenStream {
    codegen::step_attribute(attr, item, StepKeyword::Given)
}

/// Define a `When` step.
///
/// Accepts the same argument conventions as [`macro@given`]. A non-unit
/// return value is stored in the context and can replace a fixture of the
/// same unique type for later steps.
#[proc_macro_attribute]
pub fn when(attr: TokenStream, item: TokenStream) -> TokenStream {
    codegen::step_attribute(attr, item, StepKeyword::When)
}

/// Define a `Then` step.
///
/// Accepts the same argument conventions as [`macro@given`].
#[proc_macro_attribute]
pub fn then(attr: TokenStream, item: TokenStream) -> TokenStream {
    codegen::step_attribute(attr, item, StepKeyword::Then)
}

/// Bind a test function to a scenario in a feature file.
///
/// The feature path is resolved against `CARGO_MANIFEST_DIR`. Select the
/// scenario by `name = "..."` or `index = N`; without a selector the first
/// scenario is used. Scenario outlines expand to one `rstest` case per
/// example row, with `<column>` placeholders substituted into the step
/// text. Remaining function arguments are treated as rstest fixtures and
/// inserted into the step context by name.
///
/// ```ignore
/// #[scenario(path = "tests/features/checkout.feature", name = "Pay by card")]
/// fn test_pay_by_card(till: Till) {}
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario::scenario(attr, item)
}

/// Generate a test for every scenario in every feature file under a
/// directory.
///
/// The directory is resolved against `CARGO_MANIFEST_DIR` and searched
/// recursively for `.feature` files. Generated tests take no fixtures.
///
/// ```ignore
/// trellis_bdd_macros::scenarios!("tests/features");
/// ```
#[proc_macro]
pub fn scenarios(input: TokenStream) -> TokenStream {
    scenarios_macro::scenarios(input)
}
