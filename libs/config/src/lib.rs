//! # Tenor Configuration
//!
//! Protocol constants and the layered [`ProtocolConfig`] consumed by the
//! AMM, the in-memory market and the proxies.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tenor_config::{protocol, ProtocolConfig};
//!
//! let config = ProtocolConfig::load(Some(std::path::Path::new("config/tenor.toml")))?;
//! assert!(config.proxy.rounding_epsilon as u128 <= protocol::ROUNDING_EPSILON * 10);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod protocol;
pub mod settings;

pub use protocol::*;
pub use settings::{
    CurveSettings, FeeRatio, FlashSettings, ProtocolConfig, ProxySettings, SolverSettings,
};
