//! Error kinds the core recognises.
//!
//! Only initialisation and settings-mismatch problems propagate to a
//! caller (spec.md §7). Decode errors, handler exceptions, privilege
//! fails and WHOIS timeouts are contained within the dispatcher and
//! surfaced only as `tracing` events, never as a `CoreError`.

use std::fmt;

/// Errors that propagate out of plugin construction or settings loading.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A plugin failed to initialise (malformed resource, denied permission).
    #[error("plugin '{plugin}' failed to initialise: {reason}")]
    Init { plugin: String, reason: String },

    /// A settings section referenced a key the plugin's settings struct
    /// does not recognise, or was missing one it required.
    #[error("settings issue in section '{section}': {issue}")]
    Settings {
        section: String,
        issue: SettingsIssue,
    },
}

/// A single missing-or-invalid key reported by `read_settings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsIssue {
    /// A key the plugin's settings struct expects was absent from the file.
    Missing { key: String },
    /// A key was present but could not be parsed into the expected type.
    Invalid { key: String, value: String },
}

impl fmt::Display for SettingsIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsIssue::Missing { key } => write!(f, "missing key '{key}'"),
            SettingsIssue::Invalid { key, value } => {
                write!(f, "invalid value '{value}' for key '{key}'")
            }
        }
    }
}
