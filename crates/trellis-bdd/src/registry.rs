//! Step registration and lookup.
//!
//! Step definitions are collected at link time via `inventory`. Lookup first
//! tries an exact pattern-text match under the requested keyword, then falls
//! back to placeholder matching ranked by pattern specificity. When neither
//! pass finds a definition, exact matches under the other primary keywords
//! are tried before a single specificity-ranked placeholder pass over all
//! remaining keywords, so a definition written for one keyword can be reused
//! from another without a looser pattern shadowing a precise one.

use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex, PoisonError};

use crate::pattern::StepPattern;
use crate::types::{StepFn, StepKeyword, StepText};

/// A single step definition registered with the framework.
#[derive(Debug)]
pub struct Step {
    /// The step keyword the definition was registered under.
    pub keyword: StepKeyword,
    /// Pattern text used to match a Gherkin step.
    pub pattern: &'static StepPattern,
    /// Function pointer executed when the step is invoked.
    pub run: StepFn,
    /// Names of fixtures this step requires from the context.
    pub fixtures: &'static [&'static str],
    /// Source file where the step is defined.
    pub file: &'static str,
    /// Line number within the source file.
    pub line: u32,
}

impl Step {
    /// Source location of the definition, as `file:line`.
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Register a step definition with the global registry.
///
/// # Examples
///
/// ```
/// use trellis_bdd::{step, StepContext, StepError, StepKeyword, StepOutcome};
///
/// fn noop(
///     _ctx: &mut StepContext<'_>,
///     _text: &str,
///     _docstring: Option<&str>,
///     _table: Option<&[&[&str]]>,
/// ) -> Result<StepOutcome, StepError> {
///     Ok(StepOutcome::from_value(None))
/// }
///
/// step!(StepKeyword::Given, "a registered example step", noop, &[]);
/// ```
#[macro_export]
macro_rules! step {
    (@pattern $keyword:expr, $pattern:expr, $handler:path, $fixtures:expr) => {
        const _: () = {
            $crate::submit! {
                $crate::Step {
                    keyword: $keyword,
                    pattern: $pattern,
                    run: $handler,
                    fixtures: $fixtures,
                    file: file!(),
                    line: line!(),
                }
            }
        };
    };

    ($keyword:expr, $pattern:expr, $handler:path, $fixtures:expr) => {
        const _: () = {
            static PATTERN: $crate::StepPattern = $crate::StepPattern::new($pattern);
            $crate::step!(@pattern $keyword, &PATTERN, $handler, $fixtures);
        };
    };
}

inventory::collect!(Step);

type StepKey = (StepKeyword, &'static str);

static STEP_MAP: LazyLock<HashMap<StepKey, &'static Step>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for step in inventory::iter::<Step> {
        step.pattern.compile().unwrap_or_else(|e| {
            panic!(
                "invalid step pattern '{}' at {}: {e}",
                step.pattern.as_str(),
                step.location()
            )
        });
        // Warm the specificity cache so later lookups cannot fail.
        step.pattern.specificity().unwrap_or_else(|e| {
            panic!(
                "invalid step pattern '{}' at {}: {e}",
                step.pattern.as_str(),
                step.location()
            )
        });
        let key = (step.keyword, step.pattern.as_str());
        if let Some(existing) = map.insert(key, step) {
            panic!(
                "duplicate step for '{} {}' defined at {} and {}",
                step.keyword.as_str(),
                step.pattern.as_str(),
                existing.location(),
                step.location()
            );
        }
    }
    map
});

static USED_STEPS: Mutex<Option<HashSet<StepKey>>> = Mutex::new(None);

fn mark_used(step: &'static Step) {
    USED_STEPS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert((step.keyword, step.pattern.as_str()));
}

/// Look up a registered step by keyword and exact pattern text.
#[must_use]
pub fn lookup_step(keyword: StepKeyword, pattern: crate::PatternStr<'_>) -> Option<&'static Step> {
    STEP_MAP.get(&(keyword, pattern.as_str())).copied()
}

fn best_placeholder_match(
    text: StepText<'_>,
    accept: impl Fn(StepKeyword) -> bool,
) -> Option<&'static Step> {
    let mut best: Option<&'static Step> = None;
    for step in inventory::iter::<Step> {
        if !accept(step.keyword) || !matches!(step.pattern.is_match(text.as_str()), Ok(true)) {
            continue;
        }
        let better = match best {
            None => true,
            Some(current) => {
                let challenger = step.pattern.specificity().unwrap_or_default();
                let incumbent = current.pattern.specificity().unwrap_or_default();
                // Strictly greater keeps the earliest registration on ties.
                challenger > incumbent
            }
        };
        if better {
            best = Some(step);
        }
    }
    best
}

fn find_for_keyword(keyword: StepKeyword, text: StepText<'_>) -> Option<&'static Step> {
    lookup_step(keyword, text.as_str().into())
        .or_else(|| best_placeholder_match(text, |candidate| candidate == keyword))
}

/// Cross-keyword reuse: exact pattern text under any other primary keyword
/// outranks every placeholder match, which are then ranked by specificity
/// across all remaining keywords at once.
fn find_reused(keyword: StepKeyword, text: StepText<'_>) -> Option<&'static Step> {
    [StepKeyword::Given, StepKeyword::When, StepKeyword::Then]
        .into_iter()
        .filter(|other| *other != keyword)
        .find_map(|other| lookup_step(other, text.as_str().into()))
        .or_else(|| {
            best_placeholder_match(text, |candidate| {
                candidate != keyword && !candidate.is_conjunction()
            })
        })
}

/// Find the step definition that should run for the given keyword and text.
///
/// Conjunction keywords must be resolved to a primary keyword before lookup
/// (see [`StepKeyword::resolve`]). When no definition exists under the
/// requested keyword, definitions registered under the other primary
/// keywords are considered so a step written once can be reused anywhere.
#[must_use]
pub fn find_step(keyword: StepKeyword, text: StepText<'_>) -> Option<&'static Step> {
    let found = find_for_keyword(keyword, text).or_else(|| find_reused(keyword, text));
    if let Some(step) = found {
        mark_used(step);
        if step.keyword != keyword {
            log::debug!(
                "step '{}' reused across keywords: requested {} but defined as {} at {}",
                text.as_str(),
                keyword.as_str(),
                step.keyword.as_str(),
                step.location()
            );
        }
    }
    found
}

/// Iterate over every registered step definition.
pub fn registered_steps() -> impl Iterator<Item = &'static Step> {
    // Touch the map so pattern and duplicate validation runs eagerly.
    let _ = STEP_MAP.len();
    inventory::iter::<Step>.into_iter()
}

/// Steps that have never been matched by [`find_step`] in this process.
#[must_use]
pub fn unused_steps() -> Vec<&'static Step> {
    let guard = USED_STEPS.lock().unwrap_or_else(PoisonError::into_inner);
    let used = guard.clone().unwrap_or_default();
    drop(guard);
    registered_steps()
        .filter(|step| !used.contains(&(step.keyword, step.pattern.as_str())))
        .collect()
}

/// Groups of registrations sharing a keyword and pattern text.
///
/// The registry map panics on the first duplicate it meets, so this scans
/// the raw inventory instead and lets tooling report every clash in one
/// pass. Groups and their members keep inventory order.
#[must_use]
pub fn duplicate_steps() -> Vec<Vec<&'static Step>> {
    duplicate_groups(inventory::iter::<Step>.into_iter())
}

fn duplicate_groups(
    steps: impl Iterator<Item = &'static Step>,
) -> Vec<Vec<&'static Step>> {
    let mut groups: Vec<(StepKey, Vec<&'static Step>)> = Vec::new();
    for step in steps {
        let key = (step.keyword, step.pattern.as_str());
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, group)) => group.push(step),
            None => groups.push((key, vec![step])),
        }
    }
    groups
        .into_iter()
        .filter_map(|(_, group)| (group.len() > 1).then_some(group))
        .collect()
}

#[cfg(feature = "diagnostics")]
pub mod diagnostics {
    //! Serialisable snapshots of the registry for tooling.

    use serde::Serialize;

    use super::{registered_steps, Step};
    use crate::types::StepKeyword;

    /// A registry entry rendered for diagnostic output.
    #[derive(Debug, Serialize)]
    pub struct StepRecord {
        /// Keyword the step was registered under.
        pub keyword: &'static str,
        /// Pattern text of the definition.
        pub pattern: &'static str,
        /// Fixture names the definition requires.
        pub fixtures: &'static [&'static str],
        /// Source location as `file:line`.
        pub location: String,
    }

    impl From<&'static Step> for StepRecord {
        fn from(step: &'static Step) -> Self {
            Self {
                keyword: step.keyword.as_str(),
                pattern: step.pattern.as_str(),
                fixtures: step.fixtures,
                location: step.location(),
            }
        }
    }

    /// Render every registered step as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if serialisation fails.
    pub fn dump_registry() -> Result<String, serde_json::Error> {
        let mut records: Vec<StepRecord> = registered_steps().map(StepRecord::from).collect();
        records.sort_by(|a, b| {
            keyword_rank(a.keyword)
                .cmp(&keyword_rank(b.keyword))
                .then_with(|| a.pattern.cmp(b.pattern))
        });
        serde_json::to_string_pretty(&records)
    }

    fn keyword_rank(keyword: &str) -> usize {
        [
            StepKeyword::Given.as_str(),
            StepKeyword::When.as_str(),
            StepKeyword::Then.as_str(),
        ]
        .iter()
        .position(|k| *k == keyword)
        .unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StepError, StepOutcome};
    use crate::StepContext;

    fn passing(
        _ctx: &mut StepContext<'_>,
        _text: &str,
        _docstring: Option<&str>,
        _table: Option<&[&[&str]]>,
    ) -> Result<StepOutcome, StepError> {
        Ok(StepOutcome::from_value(None))
    }

    step!(StepKeyword::Given, "a precise registry step", passing, &[]);
    step!(StepKeyword::Given, "a {kind} registry step", passing, &[]);
    step!(StepKeyword::Given, "count {n:u32} registry items", passing, &[]);
    step!(StepKeyword::Given, "count {n} registry items", passing, &[]);
    step!(StepKeyword::When, "a when-only registry step", passing, &[]);
    step!(StepKeyword::Given, "a dormant registry step", passing, &[]);

    #[test]
    fn exact_match_beats_placeholder_pattern() {
        let Some(step) = find_step(StepKeyword::Given, "a precise registry step".into()) else {
            panic!("exact step should be found");
        };
        assert_eq!(step.pattern.as_str(), "a precise registry step");
    }

    #[test]
    fn placeholder_match_covers_unseen_text() {
        let Some(step) = find_step(StepKeyword::Given, "a fuzzy registry step".into()) else {
            panic!("placeholder step should be found");
        };
        assert_eq!(step.pattern.as_str(), "a {kind} registry step");
    }

    #[test]
    fn typed_pattern_wins_specificity_tie() {
        let Some(step) = find_step(StepKeyword::Given, "count 4 registry items".into()) else {
            panic!("typed step should be found");
        };
        assert_eq!(step.pattern.as_str(), "count {n:u32} registry items");
    }

    #[test]
    fn lookup_respects_keywords_before_fallback() {
        assert!(lookup_step(StepKeyword::Then, "a when-only registry step".into()).is_none());
        let Some(step) = find_step(StepKeyword::Then, "a when-only registry step".into()) else {
            panic!("cross-keyword reuse should find the when step");
        };
        assert_eq!(step.keyword, StepKeyword::When);
        assert_eq!(step.pattern.as_str(), "a when-only registry step");
    }

    #[test]
    fn reuse_prefers_exact_text_over_foreign_placeholders() {
        // "a when-only registry step" also matches the Given placeholder
        // pattern; the When definition with identical text must win.
        let Some(step) = find_step(StepKeyword::When, "a when-only registry step".into()) else {
            panic!("the when step should be found");
        };
        assert_eq!(step.keyword, StepKeyword::When);
    }

    #[test]
    fn reuse_ranks_placeholders_across_other_keywords() {
        let Some(step) = find_step(StepKeyword::Then, "a borrowed registry step".into()) else {
            panic!("reuse should find the placeholder step");
        };
        assert_eq!(step.keyword, StepKeyword::Given);
        assert_eq!(step.pattern.as_str(), "a {kind} registry step");
    }

    #[test]
    fn missing_step_returns_none() {
        assert!(find_step(StepKeyword::Given, "no such registry step".into()).is_none());
    }

    #[test]
    fn unused_steps_reports_never_matched_definitions() {
        let Some(_) = find_step(StepKeyword::Given, "a precise registry step".into()) else {
            panic!("exact step should be found");
        };
        let unused = unused_steps();
        assert!(unused
            .iter()
            .any(|step| step.pattern.as_str() == "a dormant registry step"));
        assert!(!unused
            .iter()
            .any(|step| step.pattern.as_str() == "a precise registry step"));
    }

    #[test]
    fn duplicate_groups_collect_shared_patterns() {
        static FIRST: StepPattern = StepPattern::new("a duplicated check");
        static SECOND: StepPattern = StepPattern::new("a duplicated check");
        static LONE: StepPattern = StepPattern::new("a unique check");
        static A: Step = Step {
            keyword: StepKeyword::Given,
            pattern: &FIRST,
            run: passing,
            fixtures: &[],
            file: "tests/a.rs",
            line: 4,
        };
        static B: Step = Step {
            keyword: StepKeyword::Given,
            pattern: &SECOND,
            run: passing,
            fixtures: &[],
            file: "tests/b.rs",
            line: 9,
        };
        static C: Step = Step {
            keyword: StepKeyword::Given,
            pattern: &LONE,
            run: passing,
            fixtures: &[],
            file: "tests/c.rs",
            line: 2,
        };
        let groups = duplicate_groups([&A, &B, &C].into_iter());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0].location(), "tests/a.rs:4");
        assert_eq!(groups[0][1].location(), "tests/b.rs:9");
    }

    #[test]
    fn registry_has_no_duplicate_registrations() {
        assert!(duplicate_steps().is_empty());
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn dump_registry_lists_registered_patterns() {
        let dump = diagnostics::dump_registry()
            .unwrap_or_else(|e| panic!("registry should serialise: {e}"));
        assert!(dump.contains("a precise registry step"));
        assert!(dump.contains("Given"));
    }
}
