//! Error types used by the frac harness.
//!
//! [`FracError`] covers the *fatal* failures: configuration mistakes on the
//! CLI surface, unknown plugins, node type mismatches at the plugin boundary,
//! and process spawn failures. Expected races against a dying target
//! (process already exited, pipe already closed) are **not** errors — the
//! node operations swallow them and no-op, so they never appear here.
//!
//! The type provides `as_label`/`as_message` helpers for logs, mirroring the
//! rest of the runtime's reporting conventions.

use thiserror::Error;

/// # Fatal errors produced by the frac harness.
///
/// Every variant is terminal for the operation that produced it: the CLI
/// reports the message and exits nonzero, library callers propagate with `?`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FracError {
    /// A required value for the chosen event kind was not supplied.
    #[error("--{flag} is required for a {event} event")]
    MissingValue {
        /// The missing CLI flag (without dashes).
        flag: &'static str,
        /// The event kind that needs it.
        event: &'static str,
    },

    /// The event kind is not part of the trigger vocabulary.
    #[error("unknown event type: {name:?} (expected delay, bytes, or token)")]
    UnknownEvent {
        /// The unrecognized event name.
        name: String,
    },

    /// No plugin is registered under the requested name.
    #[error("unknown plugin {name:?} (available: {available:?})")]
    PluginNotFound {
        /// The requested plugin name.
        name: String,
        /// Names of the plugins that are registered.
        available: Vec<String>,
    },

    /// A plugin was handed a node of a different backend's concrete type.
    #[error("plugin {plugin:?} cannot build hooks for node {actual:?}: expected a {expected}")]
    NodeTypeMismatch {
        /// The plugin that rejected the node.
        plugin: &'static str,
        /// The concrete node type the plugin expects.
        expected: &'static str,
        /// Name of the node that was offered instead.
        actual: String,
    },

    /// A command line could not be parsed into an argv.
    #[error("invalid command line: {reason}")]
    InvalidCommand {
        /// What was wrong with it.
        reason: String,
    },

    /// The child process could not be spawned.
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        /// The command line that failed to start.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

impl FracError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use frac::FracError;
    ///
    /// let err = FracError::UnknownEvent { name: "jitter".into() };
    /// assert_eq!(err.as_label(), "unknown_event");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FracError::MissingValue { .. } => "missing_value",
            FracError::UnknownEvent { .. } => "unknown_event",
            FracError::PluginNotFound { .. } => "plugin_not_found",
            FracError::NodeTypeMismatch { .. } => "node_type_mismatch",
            FracError::InvalidCommand { .. } => "invalid_command",
            FracError::Spawn { .. } => "spawn_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable_snake_case() {
        let cases: Vec<(FracError, &str)> = vec![
            (
                FracError::MissingValue {
                    flag: "ms",
                    event: "delay",
                },
                "missing_value",
            ),
            (
                FracError::UnknownEvent {
                    name: "jitter".into(),
                },
                "unknown_event",
            ),
            (
                FracError::PluginNotFound {
                    name: "k8s".into(),
                    available: vec!["local".into()],
                },
                "plugin_not_found",
            ),
            (
                FracError::InvalidCommand {
                    reason: "empty command".into(),
                },
                "invalid_command",
            ),
        ];
        for (err, label) in cases {
            assert_eq!(err.as_label(), label);
            assert!(!err.as_message().is_empty());
        }
    }

    #[test]
    fn test_messages_carry_the_details() {
        let err = FracError::MissingValue {
            flag: "token",
            event: "token",
        };
        assert_eq!(err.as_message(), "--token is required for a token event");
    }
}
