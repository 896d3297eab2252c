//! Session Identifier Validator
//!
//! Standard ids look like `s-20250101120000`: the prefix `s-` followed by a
//! UTC timestamp `YYYYMMDDHHMMSS`. Anything else is non-standard and gets
//! replaced by a freshly generated id.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;

use super::store::SessionContextStore;

const SESSION_PREFIX: &str = "s-";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn standard_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^s-\d{14}$").ok())
        .as_ref()
}

/// Outcome of validating a caller-supplied session id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// The id the caller must use from now on
    pub id: String,
    /// No id was supplied; one was generated
    pub created: bool,
    /// A non-standard id was replaced
    pub standardized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_session_id: Option<String>,
}

impl SessionInfo {
    pub fn is_new(&self) -> bool {
        self.created || self.standardized
    }
}

pub struct SessionIdValidator {
    store: Arc<SessionContextStore>,
    retain_aliases: bool,
    /// Timestamp of the most recently issued id
    last_issued: Mutex<Option<DateTime<Utc>>>,
}

impl SessionIdValidator {
    pub fn new(store: Arc<SessionContextStore>, retain_aliases: bool) -> Self {
        Self {
            store,
            retain_aliases,
            last_issued: Mutex::new(None),
        }
    }

    pub fn is_standard(candidate: &str) -> bool {
        match standard_pattern() {
            Some(pattern) => pattern.is_match(candidate),
            None => {
                candidate.len() == SESSION_PREFIX.len() + 14
                    && candidate.starts_with(SESSION_PREFIX)
                    && candidate[SESSION_PREFIX.len()..].bytes().all(|b| b.is_ascii_digit())
            }
        }
    }

    /// Validate `candidate`, generating or standardizing as needed.
    ///
    /// Blank input counts as absent. Anything else must match the standard
    /// format exactly, surrounding whitespace included.
    pub fn validate(&self, candidate: Option<&str>) -> SessionInfo {
        let candidate = candidate.filter(|c| !c.trim().is_empty());

        let Some(candidate) = candidate else {
            let id = self.generate();
            tracing::debug!(session_id = %id, "[SessionValidator] Created session id");
            return SessionInfo {
                id,
                created: true,
                standardized: false,
                original_session_id: None,
            };
        };

        if Self::is_standard(candidate) {
            return SessionInfo {
                id: candidate.to_string(),
                created: false,
                standardized: false,
                original_session_id: None,
            };
        }

        let retained = if self.retain_aliases {
            self.store.alias_for(candidate)
        } else {
            None
        };
        let id = match retained {
            Some(id) => id,
            None => {
                let id = self.generate();
                if self.retain_aliases {
                    self.store.record_alias(candidate, &id);
                }
                id
            }
        };
        tracing::info!(
            original = %candidate,
            session_id = %id,
            "[SessionValidator] Standardized non-standard session id"
        );
        SessionInfo {
            id,
            created: false,
            standardized: true,
            original_session_id: Some(candidate.to_string()),
        }
    }

    /// Whether first-contact instructions are still due for this session.
    pub fn should_inject_instructions(&self, info: &SessionInfo) -> bool {
        info.is_new() && !self.store.has_been_instructed(&info.id)
    }

    /// Generate a new standard id, strictly later than every id issued before.
    pub fn generate(&self) -> String {
        let mut last = self
            .last_issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Second precision: compare on whole seconds.
        let now = Utc::now();
        let now = now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos()));
        let next = match *last {
            Some(previous) if now <= previous => previous + Duration::seconds(1),
            _ => now,
        };
        *last = Some(next);
        format!("{}{}", SESSION_PREFIX, next.format(TIMESTAMP_FORMAT))
    }
}
