//! Step execution context, fixture access, and typed return storage.
//!
//! `StepContext` holds named borrows of the scenario's fixtures alongside
//! an override map fed by step return values. A returned value shadows a
//! fixture only when its type identifies exactly one fixture slot; with two
//! candidates the override would be a guess, so the value is dropped and
//! the fixtures stay as inserted.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A borrowed fixture together with the concrete type it was inserted as.
struct Slot<'a> {
    value: &'a dyn Any,
    ty: TypeId,
}

/// Context passed to step handlers containing references to requested fixtures.
///
/// The `#[scenario]` macro constructs one context per scenario run and
/// inserts every fixture argument of the test function by name.
///
/// # Examples
///
/// ```
/// use trellis_bdd::StepContext;
///
/// let mut ctx = StepContext::default();
/// let tally = 3_u32;
/// ctx.insert("tally", &tally);
///
/// assert_eq!(ctx.get::<u32>("tally"), Some(&3));
/// assert!(ctx.get::<String>("tally").is_none());
/// ```
#[derive(Default)]
pub struct StepContext<'a> {
    fixtures: HashMap<&'static str, Slot<'a>>,
    overrides: HashMap<&'static str, Box<dyn Any>>,
}

impl<'a> StepContext<'a> {
    /// Insert a fixture reference by name.
    pub fn insert<T: Any>(&mut self, name: &'static str, value: &'a T) {
        self.fixtures.insert(
            name,
            Slot {
                value,
                ty: TypeId::of::<T>(),
            },
        );
    }

    /// Retrieve a fixture reference by name and type.
    ///
    /// An override written by [`insert_value`](Self::insert_value) takes
    /// precedence over the fixture it shadows, so a `when` step's return
    /// value feeds later assertions without an ad-hoc fixture.
    #[must_use]
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        match self.overrides.get(name) {
            Some(boxed) => boxed.downcast_ref(),
            None => self.fixtures.get(name)?.value.downcast_ref(),
        }
    }

    /// Whether a fixture with the given name was inserted.
    #[must_use]
    pub fn has_fixture(&self, name: &str) -> bool {
        self.fixtures.contains_key(name)
    }

    /// Names of all fixtures available to steps, sorted for stable output.
    #[must_use]
    pub fn fixture_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.fixtures.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Insert a value produced by a prior step.
    ///
    /// The value shadows a fixture only when exactly one fixture slot holds
    /// its type; otherwise it is dropped.
    pub fn insert_value(&mut self, value: Box<dyn Any>) {
        let ty = value.as_ref().type_id();
        let mut slots = self.fixtures.iter().filter(|(_, slot)| slot.ty == ty);
        let Some((&name, _)) = slots.next() else {
            return;
        };
        if slots.next().is_none() {
            self.overrides.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_requires_matching_type() {
        let mut ctx = StepContext::default();
        let count = 3_u32;
        ctx.insert("count", &count);
        assert_eq!(ctx.get::<u32>("count"), Some(&3));
        assert_eq!(ctx.get::<String>("count"), None);
    }

    #[test]
    fn returned_value_shadows_unique_fixture_of_same_type() {
        let mut ctx = StepContext::default();
        let initial = String::from("before");
        ctx.insert("message", &initial);
        ctx.insert_value(Box::new(String::from("after")));
        assert_eq!(ctx.get::<String>("message").map(String::as_str), Some("after"));
    }

    #[test]
    fn ambiguous_type_leaves_fixtures_untouched() {
        let mut ctx = StepContext::default();
        let first = 1_i64;
        let second = 2_i64;
        ctx.insert("first", &first);
        ctx.insert("second", &second);
        ctx.insert_value(Box::new(9_i64));
        assert_eq!(ctx.get::<i64>("first"), Some(&1));
        assert_eq!(ctx.get::<i64>("second"), Some(&2));
    }

    #[test]
    fn unmatched_value_types_are_dropped() {
        let mut ctx = StepContext::default();
        let flag = true;
        ctx.insert("flag", &flag);
        ctx.insert_value(Box::new(String::from("orphan")));
        assert_eq!(ctx.get::<bool>("flag"), Some(&true));
        assert!(ctx.get::<String>("flag").is_none());
    }

    #[test]
    fn fixture_names_are_sorted() {
        let mut ctx = StepContext::default();
        let flag = true;
        let count = 1_u32;
        ctx.insert("flag", &flag);
        ctx.insert("count", &count);
        assert!(ctx.has_fixture("flag"));
        assert!(!ctx.has_fixture("absent"));
        assert_eq!(ctx.fixture_names(), ["count", "flag"]);
    }
}
