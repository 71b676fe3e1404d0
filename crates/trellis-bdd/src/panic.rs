//! Panic payload formatting helpers.
//!
//! Extracts a human-readable message from a panic payload, preferring string
//! payloads and falling back to `Debug` formatting for anything else.

use std::any::Any;

/// Formats a panic payload into a readable message.
///
/// Pass the payload through `as_ref()`: a `&Box<dyn Any + Send>` would
/// unsize-coerce the box itself into the trait object and every downcast
/// would miss.
///
/// # Examples
///
/// ```
/// use trellis_bdd::panic_message;
/// use std::any::Any;
///
/// let payload: Box<dyn Any + Send> = Box::new("boom");
/// assert_eq!(panic_message(payload.as_ref()), "boom");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| format!("{payload:?}"))
}
