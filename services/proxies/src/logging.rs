//! Standardized emoji logging for the proxies
//!
//! Keeps emoji usage consistent across the liquidity, roll and migration
//! components so multi-step operations read well in a single log stream.

use tracing_subscriber::EnvFilter;

/// Tags prefixed to proxy log lines
pub struct LogEmoji;

impl LogEmoji {
    pub const SUCCESS: &'static str = "✅";
    pub const EXECUTE: &'static str = "⚡";
    pub const POOL: &'static str = "🏊";
    pub const FLASH: &'static str = "💸";
    pub const BRIDGE: &'static str = "🌉";
    pub const ROLL: &'static str = "🔁";
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_tagged {
    ($level:ident, $tag:ident, $($arg:tt)*) => {
        tracing::$level!("{} {}", $crate::logging::LogEmoji::$tag, format!($($arg)*))
    };
}

/// Operation completed with its invariants checked
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => { $crate::__log_tagged!(info, SUCCESS, $($arg)*) };
}

/// Entry into a public proxy operation
#[macro_export]
macro_rules! log_execution {
    ($($arg:tt)*) => { $crate::__log_tagged!(info, EXECUTE, $($arg)*) };
}

#[macro_export]
macro_rules! log_pool {
    ($($arg:tt)*) => { $crate::__log_tagged!(debug, POOL, $($arg)*) };
}

#[macro_export]
macro_rules! log_flash {
    ($($arg:tt)*) => { $crate::__log_tagged!(debug, FLASH, $($arg)*) };
}

#[macro_export]
macro_rules! log_bridge {
    ($($arg:tt)*) => { $crate::__log_tagged!(info, BRIDGE, $($arg)*) };
}

#[macro_export]
macro_rules! log_roll {
    ($($arg:tt)*) => { $crate::__log_tagged!(info, ROLL, $($arg)*) };
}

/// Install a global subscriber honouring `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Test subscriber writing through the test harness's captured output
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
