//! Argument classification for step functions.
//!
//! A step function's arguments are sorted into four roles: placeholder
//! captures (name matches a pattern placeholder), the docstring, the data
//! table, and fixtures for everything else. A `#[from(name)]` attribute
//! forces the fixture role under a different context name.

use syn::spanned::Spanned;

/// Reserved argument name bound to the step's docstring.
const DOCSTRING_ARG: &str = "docstring";

/// Reserved argument name bound to the step's data table.
const DATATABLE_ARG: &str = "datatable";

/// One classified argument of a step function, in declaration order.
pub(crate) enum StepFnArg {
    /// Captured placeholder value, parsed with `FromStr`.
    Placeholder {
        pat: syn::Ident,
        ty: syn::Type,
        /// Position of the placeholder in the pattern's capture list.
        index: usize,
    },
    /// The step's docstring as an owned `String`.
    Docstring { pat: syn::Ident },
    /// The step's data table as `Vec<Vec<String>>`.
    DataTable { pat: syn::Ident },
    /// Fixture looked up from the step context.
    Fixture {
        pat: syn::Ident,
        /// Name the fixture is registered under in the context.
        name: syn::Ident,
        ty: syn::Type,
    },
}

impl StepFnArg {
    pub(crate) fn fixture_name(&self) -> Option<String> {
        match self {
            Self::Fixture { name, .. } => Some(name.to_string()),
            _ => None,
        }
    }
}

fn take_from_attr(arg: &mut syn::PatType) -> syn::Result<Option<syn::Ident>> {
    let mut renamed = None;
    let mut parse_err = None;
    arg.attrs.retain(|attr| {
        if attr.path().is_ident("from") {
            match attr.parse_args::<syn::Ident>() {
                Ok(ident) => renamed = Some(ident),
                Err(err) => parse_err = Some(err),
            }
            false
        } else {
            true
        }
    });
    if let Some(err) = parse_err {
        return Err(err);
    }
    Ok(renamed)
}

/// Classify every argument of `func` against the pattern's placeholders.
///
/// `placeholders` holds the placeholder names in capture order, as returned
/// by `trellis_bdd_patterns::placeholder_names`.
pub(crate) fn classify_args(
    func: &mut syn::ItemFn,
    placeholders: &[String],
) -> syn::Result<Vec<StepFnArg>> {
    let mut args = Vec::new();
    for input in &mut func.sig.inputs {
        let syn::FnArg::Typed(arg) = input else {
            return Err(syn::Error::new(
                input.span(),
                "step functions cannot take self",
            ));
        };
        let renamed = take_from_attr(arg)?;
        let syn::Pat::Ident(pat_ident) = &*arg.pat else {
            return Err(syn::Error::new(
                arg.pat.span(),
                "step function arguments must be plain identifiers",
            ));
        };
        let pat = pat_ident.ident.clone();
        let ty = (*arg.ty).clone();

        if let Some(name) = renamed {
            args.push(StepFnArg::Fixture { pat, name, ty });
            continue;
        }
        let name = pat.to_string();
        if name == DOCSTRING_ARG {
            args.push(StepFnArg::Docstring { pat });
        } else if name == DATATABLE_ARG {
            args.push(StepFnArg::DataTable { pat });
        } else if let Some(index) = placeholders.iter().position(|p| *p == name) {
            args.push(StepFnArg::Placeholder { pat, ty, index });
        } else {
            let fixture_name = pat.clone();
            args.push(StepFnArg::Fixture {
                pat,
                name: fixture_name,
                ty,
            });
        }
    }
    Ok(args)
}
