//! Debug logging switch.
//!
//! `PLUGIN_CI_DEBUG=1` (or `true`) raises the default log level to DEBUG,
//! which makes every external command visible with secrets redacted.
//! A `RUST_LOG` value, when set, replaces that default entirely.

use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Environment variable enabling debug logging.
pub const PLUGIN_CI_DEBUG: &str = "PLUGIN_CI_DEBUG";

static DEBUG_CONFIG: OnceLock<DebugConfig> = OnceLock::new();

/// Debug configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugConfig {
    pub debug_mode: bool,
}

impl DebugConfig {
    /// Loads configuration from the environment.
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(PLUGIN_CI_DEBUG).ok().as_deref())
    }

    /// Interprets a `PLUGIN_CI_DEBUG` value.
    pub fn from_value(value: Option<&str>) -> Self {
        Self {
            debug_mode: value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }

    /// Default level for the log filter.
    pub fn default_level(&self) -> Level {
        if self.debug_mode {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

/// Gets the process-wide debug configuration, read once from the environment.
pub fn get_config() -> &'static DebugConfig {
    DEBUG_CONFIG.get_or_init(DebugConfig::from_env)
}

/// Returns true if debug mode is enabled.
pub fn is_debug() -> bool {
    get_config().debug_mode
}

/// Builds the log filter from `RUST_LOG`-style `directives`, falling back
/// to `default_level` when none are given.
pub fn env_filter(default_level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Installs the global tracing subscriber.
pub fn init_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(
            get_config().default_level(),
            directives.as_deref(),
        ))
        .with_writer(std::io::stderr)
        .init();
}
