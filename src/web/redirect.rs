//! Where navigation goes next.

use super::{CONSOLE_PATH, LANDING_PATH, PROTECTED_PREFIX};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    NoCode,
    Exchanged,
    ExchangeFailed,
}

impl CallbackOutcome {
    #[must_use]
    pub const fn from_flags(has_code: bool, exchanged: bool) -> Self {
        match (has_code, exchanged) {
            (false, _) => Self::NoCode,
            (true, true) => Self::Exchanged,
            (true, false) => Self::ExchangeFailed,
        }
    }
}

/// Callback redirect targets, one row per outcome.
const CALLBACK_REDIRECTS: [(CallbackOutcome, &str); 3] = [
    (CallbackOutcome::NoCode, LANDING_PATH),
    (CallbackOutcome::Exchanged, CONSOLE_PATH),
    (CallbackOutcome::ExchangeFailed, LANDING_PATH),
];

#[must_use]
pub fn callback_target(outcome: CallbackOutcome) -> &'static str {
    CALLBACK_REDIRECTS
        .iter()
        .find(|(row, _)| *row == outcome)
        .map_or(LANDING_PATH, |(_, target)| *target)
}

#[must_use]
pub fn is_protected(path: &str) -> bool {
    path == PROTECTED_PREFIX
        || path
            .strip_prefix(PROTECTED_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Guard decision for a navigation. `None` lets the request through.
#[must_use]
pub fn guard_target(path: &str, authenticated: bool) -> Option<&'static str> {
    if !authenticated && is_protected(path) {
        return Some(LANDING_PATH);
    }
    if authenticated && path == LANDING_PATH {
        return Some(CONSOLE_PATH);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_table() {
        assert_eq!(
            callback_target(CallbackOutcome::from_flags(false, false)),
            "/"
        );
        assert_eq!(callback_target(CallbackOutcome::from_flags(false, true)), "/");
        assert_eq!(
            callback_target(CallbackOutcome::from_flags(true, true)),
            "/console"
        );
        assert_eq!(
            callback_target(CallbackOutcome::from_flags(true, false)),
            "/"
        );
    }

    #[test]
    fn protected_prefix_matches_whole_segments() {
        assert!(is_protected("/console"));
        assert!(is_protected("/console/"));
        assert!(is_protected("/console/sheetmanager"));
        assert!(!is_protected("/consoles"));
        assert!(!is_protected("/"));
        assert!(!is_protected("/auth/callback"));
    }

    #[test]
    fn guard_decisions() {
        assert_eq!(guard_target("/console", false), Some("/"));
        assert_eq!(guard_target("/console/email", false), Some("/"));
        assert_eq!(guard_target("/", true), Some("/console"));
        assert_eq!(guard_target("/", false), None);
        assert_eq!(guard_target("/console", true), None);
        assert_eq!(guard_target("/auth/callback", true), None);
    }
}
