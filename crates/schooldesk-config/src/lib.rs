//! # SchoolDesk Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`cors`]: allowed browser origins
//! - [`library`]: loan, renewal and fine policy per member type
//! - [`logging`]: log directory and OpenTelemetry export
//! - [`server`]: HTTP bind address
//!
//! Every type exposes `from_env()` and falls back to defaults for missing or
//! unparsable variables. `from_vars` takes a lookup closure so the parsing can
//! be exercised without touching the process environment.
//!
//! # Example
//!
//! ```ignore
//! use schooldesk_config::{CorsConfig, LibraryPolicy, ServerConfig};
//!
//! let policy = LibraryPolicy::from_env();
//! let server = ServerConfig::from_env();
//! ```

pub mod cors;
pub mod library;
pub mod logging;
pub mod server;

pub use cors::CorsConfig;
pub use library::{LibraryPolicy, LoanRules};
pub use logging::LoggingConfig;
pub use server::ServerConfig;

/// Reads `key` through `lookup` and parses it, keeping `default` on any failure.
pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
