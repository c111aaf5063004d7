//! Tracing conventions and optional subscriber setup for keyfence.
//!
//! Every keyfence span and event uses the [`TARGET_PREFIX`] target family so
//! hosts can filter them:
//!
//! ```text
//! KEYFENCE_LOG=keyfence=debug
//! ```
//!
//! [`init_subscriber`] is a convenience for hosts that do not configure
//! `tracing-subscriber` themselves.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Target prefix used by all keyfence tracing spans and events.
pub const TARGET_PREFIX: &str = "keyfence";

/// Standard tracing span names.
pub mod span_names {
    /// One key event walking the guard table.
    pub const DISPATCH: &str = "keyfence::dispatch";
    /// One guard handler invocation.
    pub const GUARD: &str = "keyfence::guard";
    /// Opening a surface.
    pub const OPEN: &str = "keyfence::open";
    /// Closing a surface.
    pub const CLOSE: &str = "keyfence::close";
}

/// Standard structured field names used in tracing events.
pub mod field_names {
    pub const GUARD: &str = "guard";
    pub const TIER: &str = "tier";
    pub const SURFACE: &str = "surface";
    pub const KEY: &str = "key";
    pub const CONSUMED: &str = "consumed";
}

/// Verbosity requested by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Only errors.
    Quiet,
    /// Warnings and above.
    Normal,
    /// Debug output for keyfence targets.
    Verbose,
}

impl Verbosity {
    /// Map to a default `tracing::Level`.
    #[must_use]
    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Parse a log level string (case-insensitive).
///
/// Recognized values: `trace`, `debug`, `info`, `warn`, `error`.
#[must_use]
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Level from `KEYFENCE_LOG_LEVEL`, falling back to `default`.
#[must_use]
pub fn level_from_env(default: Level) -> Level {
    std::env::var("KEYFENCE_LOG_LEVEL")
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(default)
}

/// Install a global stderr subscriber.
///
/// Filter priority: `KEYFENCE_LOG` > `RUST_LOG` > `verbosity`.
/// Returns `false` if a global subscriber was already installed.
pub fn init_subscriber(verbosity: Verbosity) -> bool {
    let filter = build_env_filter(verbosity);
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    if let Ok(directives) = std::env::var("KEYFENCE_LOG")
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = verbosity.default_level();
    let directive = if verbosity == Verbosity::Verbose {
        format!("{level},{TARGET_PREFIX}=debug")
    } else {
        level.to_string()
    };

    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}
