use std::path::PathBuf;

/// Unified error type covering every failure mode of the keyfence input core.
///
/// Variants fall into two groups. The first four (`InvalidPosition`,
/// `NoTarget`, `NoMatches`, `BlockedByHigherPriority`) are *expected*
/// outcomes: the handler that detects them resolves them locally and tells
/// the user through the speech channel. Everything else is either a setup
/// error surfaced to the host at build/load time, or a `HandlerFault` that
/// the router catches at the guard boundary.
#[derive(Debug, thiserror::Error)]
pub enum KeyfenceError {
    // === Expected, user-facing outcomes ===
    /// A cursor or index fell outside the list it points into.
    #[error("Position {index} is out of range for {count} items.")]
    InvalidPosition {
        /// The rejected index.
        index: usize,
        /// Number of items the index was checked against.
        count: usize,
    },

    /// An action needs a selected or targetable entity and there is none.
    #[error("Nothing to {action}.")]
    NoTarget {
        /// The action that lacked a target (e.g. "select", "expand").
        action: String,
    },

    /// Typeahead search found no candidate for the typed text.
    #[error("No matches for {query}.")]
    NoMatches {
        /// The failed search text.
        query: String,
    },

    /// An open request was dropped because a higher-priority surface owns input.
    #[error("Cannot open {requested} while {blocking} is active.")]
    BlockedByHigherPriority {
        /// Surface that asked to open.
        requested: String,
        /// Active surface of a higher tier that blocked it.
        blocking: String,
    },

    // === Faults ===
    /// A handler failed unexpectedly (returned a non-expected error or panicked).
    #[error("Handler fault in guard {guard}: {detail}")]
    HandlerFault {
        /// Name of the guard whose handler failed.
        guard: String,
        /// Diagnostic detail (error message or panic payload).
        detail: String,
    },

    // === Setup errors ===
    /// A surface id is not present in the session registry.
    #[error("Unknown surface {id}. Register it in the session before routing to it.")]
    UnknownSurface {
        /// The missing surface id.
        id: String,
    },

    /// A surface id was registered or routed twice.
    #[error("Surface {id} is already registered.")]
    DuplicateSurface {
        /// The duplicated surface id.
        id: String,
    },

    /// The guard table violates an ordering or uniqueness rule.
    #[error("Invalid guard table: {reason}")]
    InvalidGuardTable {
        /// Which rule was violated.
        reason: String,
    },

    /// A key chord string could not be parsed.
    #[error("Invalid key \"{input}\": {reason}")]
    InvalidKey {
        /// The rejected text.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A configuration value is invalid.
    #[error("Invalid config: {field} = \"{value}\": {reason}")]
    InvalidConfig {
        /// Which config field.
        field: String,
        /// The invalid value.
        value: String,
        /// Why it is invalid.
        reason: String,
    },

    /// A configuration file could not be parsed.
    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        /// Path that was read.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A recorded key script could not be encoded or decoded.
    #[error("Key script error: {0}")]
    Replay(#[from] serde_json::Error),

    /// Wraps `std::io::Error` for config and script files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyfenceError {
    /// Whether this is an expected outcome that a handler resolves locally.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::InvalidPosition { .. }
                | Self::NoTarget { .. }
                | Self::NoMatches { .. }
                | Self::BlockedByHigherPriority { .. }
        )
    }

    /// Short text to speak for this error, if it is user-facing.
    ///
    /// Faults and setup errors return `None`; the router announces those
    /// with the configured generic message instead.
    #[must_use]
    pub fn announcement(&self) -> Option<String> {
        self.is_expected().then(|| self.to_string())
    }

    /// Build a `NoTarget` error.
    #[must_use]
    pub fn no_target(action: impl Into<String>) -> Self {
        Self::NoTarget {
            action: action.into(),
        }
    }

    /// Build a `HandlerFault` error.
    #[must_use]
    pub fn fault(guard: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::HandlerFault {
            guard: guard.into(),
            detail: detail.into(),
        }
    }
}

/// Convenience alias used throughout the keyfence crates.
pub type KeyfenceResult<T> = Result<T, KeyfenceError>;
