//! Usage: Anti-CSRF `state` nonce generation and single-use verification.

use crate::shared::security::{constant_time_eq, random_hex};

pub(crate) const STATE_COOKIE: &str = "spotify_auth_state";
pub(crate) const STATE_LEN: usize = 16;

pub(crate) fn generate_state() -> String {
    random_hex(STATE_LEN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateCheck {
    Match,
    /// No `state` query parameter (or an empty one).
    MissingReceived,
    /// No state cookie.
    MissingStored,
    Mismatch,
}

impl StateCheck {
    pub(crate) fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::MissingReceived => "missing_received",
            Self::MissingStored => "missing_stored",
            Self::Mismatch => "mismatch",
        }
    }
}

/// A missing stored value never matches, not even a missing received one.
pub(crate) fn verify_state(received: Option<&str>, stored: Option<&str>) -> StateCheck {
    let Some(received) = received.filter(|v| !v.is_empty()) else {
        return StateCheck::MissingReceived;
    };
    let Some(stored) = stored.filter(|v| !v.is_empty()) else {
        return StateCheck::MissingStored;
    };
    if constant_time_eq(received.as_bytes(), stored.as_bytes()) {
        StateCheck::Match
    } else {
        StateCheck::Mismatch
    }
}
