//! Runtime configuration sourced from the environment.
//!
//! Two knobs are exposed: `TRELLIS_BDD_JSON` names a file that receives the
//! cucumber JSON report, and `TRELLIS_BDD_FAIL_ON_SKIPPED` controls whether
//! skipped scenarios fail the run when they lack the `allow_skipped` tag.
//! Both can be overridden in-process, which tests use to avoid touching the
//! real environment.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

const OVERRIDE_UNSET: u8 = 0;
const OVERRIDE_FALSE: u8 = 1;
const OVERRIDE_TRUE: u8 = 2;

static FAIL_ON_SKIPPED_OVERRIDE: AtomicU8 = AtomicU8::new(OVERRIDE_UNSET);

/// `Some(inner)` overrides the environment; `inner` of `None` disables
/// reporting entirely.
static REPORT_PATH_OVERRIDE: Mutex<Option<Option<PathBuf>>> = Mutex::new(None);

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "Yes" | "on" | "ON" | "On" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" | "NO" | "No" | "off" | "OFF" | "Off" => {
            Some(false)
        }
        _ => None,
    }
}

fn env_fail_on_skipped() -> Option<bool> {
    std::env::var("TRELLIS_BDD_FAIL_ON_SKIPPED")
        .ok()
        .as_deref()
        .and_then(parse_env_bool)
}

fn override_state() -> Option<bool> {
    match FAIL_ON_SKIPPED_OVERRIDE.load(Ordering::Relaxed) {
        OVERRIDE_FALSE => Some(false),
        OVERRIDE_TRUE => Some(true),
        _ => None,
    }
}

/// Determine whether skipped scenarios should panic.
#[must_use]
pub fn fail_on_skipped() -> bool {
    override_state()
        .or_else(env_fail_on_skipped)
        .unwrap_or(false)
}

/// Override the `fail_on_skipped` flag for the current process.
///
/// Tests may call [`clear_fail_on_skipped_override`] to restore environment
/// driven behaviour after toggling the override.
pub fn set_fail_on_skipped(enabled: bool) {
    let value = if enabled {
        OVERRIDE_TRUE
    } else {
        OVERRIDE_FALSE
    };
    FAIL_ON_SKIPPED_OVERRIDE.store(value, Ordering::Relaxed);
}

/// Remove any in-process override for the `fail_on_skipped` flag.
pub fn clear_fail_on_skipped_override() {
    FAIL_ON_SKIPPED_OVERRIDE.store(OVERRIDE_UNSET, Ordering::Relaxed);
}

/// Path the cucumber JSON report should be written to, if any.
///
/// The in-process override takes precedence over `TRELLIS_BDD_JSON`; an
/// empty environment value disables reporting.
#[must_use]
pub fn report_path() -> Option<PathBuf> {
    let overridden = REPORT_PATH_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(path) = overridden {
        return path;
    }
    std::env::var_os("TRELLIS_BDD_JSON")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

/// Override the report path for the current process.
///
/// Passing `None` disables reporting regardless of the environment.
pub fn set_report_path(path: Option<PathBuf>) {
    *REPORT_PATH_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(path);
}

/// Remove any in-process override for the report path.
pub fn clear_report_path_override() {
    *REPORT_PATH_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn fail_on_skipped_defaults_to_false() {
        clear_fail_on_skipped_override();
        std::env::remove_var("TRELLIS_BDD_FAIL_ON_SKIPPED");
        assert!(!fail_on_skipped());
    }

    #[test]
    #[serial]
    fn override_wins_over_environment() {
        std::env::set_var("TRELLIS_BDD_FAIL_ON_SKIPPED", "1");
        set_fail_on_skipped(false);
        assert!(!fail_on_skipped());
        clear_fail_on_skipped_override();
        assert!(fail_on_skipped());
        std::env::remove_var("TRELLIS_BDD_FAIL_ON_SKIPPED");
        clear_fail_on_skipped_override();
    }

    #[test]
    #[serial]
    fn report_path_reads_environment() {
        clear_report_path_override();
        std::env::set_var("TRELLIS_BDD_JSON", "target/report.json");
        assert_eq!(report_path(), Some(PathBuf::from("target/report.json")));
        std::env::set_var("TRELLIS_BDD_JSON", "");
        assert_eq!(report_path(), None);
        std::env::remove_var("TRELLIS_BDD_JSON");
    }

    #[test]
    #[serial]
    fn report_path_override_disables_reporting() {
        std::env::set_var("TRELLIS_BDD_JSON", "target/report.json");
        set_report_path(None);
        assert_eq!(report_path(), None);
        set_report_path(Some(PathBuf::from("other.json")));
        assert_eq!(report_path(), Some(PathBuf::from("other.json")));
        clear_report_path_override();
        std::env::remove_var("TRELLIS_BDD_JSON");
    }

    #[test]
    fn parse_env_bool_understands_common_values() {
        for truthy in ["1", "true", "Yes", "on", "ON"] {
            assert_eq!(parse_env_bool(truthy), Some(true), "{truthy} is truthy");
        }
        for falsy in ["0", "false", "No", "off", "OFF"] {
            assert_eq!(parse_env_bool(falsy), Some(false), "{falsy} is falsy");
        }
        assert_eq!(parse_env_bool("maybe"), None);
    }
}
