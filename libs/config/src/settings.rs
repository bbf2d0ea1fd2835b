//! Layered protocol configuration
//!
//! Loads from an optional TOML file, then `TENOR_`-prefixed environment
//! variables (`__` separates nesting levels, e.g.
//! `TENOR_SOLVER__MAX_ITERATIONS=500`). Every field has a default, so an
//! empty source set yields the protocol constants.

use crate::protocol::{self, curve, solver};
use anyhow::{ensure, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Complete protocol configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub curve: CurveSettings,
    pub solver: SolverSettings,
    pub proxy: ProxySettings,
    pub flash: FlashSettings,
}

/// Fee factor expressed as an exact ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeRatio {
    pub numerator: u64,
    pub denominator: u64,
}

impl FeeRatio {
    pub const fn new((numerator, denominator): (u64, u64)) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// Bonding curve parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CurveSettings {
    /// Seconds in one unit of the time stretch (`k = 1 / time_stretch_seconds`)
    pub time_stretch_seconds: u64,
    /// `g1`, applied when the trader pays base
    pub fee_base_in: FeeRatio,
    /// `g2`, applied when the trader pays claims
    pub fee_claim_in: FeeRatio,
    /// Base units shaved off outputs and added to inputs
    pub precision_guard: u64,
}

impl Default for CurveSettings {
    fn default() -> Self {
        Self {
            time_stretch_seconds: curve::SECONDS_PER_CURVE_PERIOD,
            fee_base_in: FeeRatio::new(curve::FEE_BASE_IN),
            fee_claim_in: FeeRatio::new(curve::FEE_CLAIM_IN),
            precision_guard: protocol::PRECISION_GUARD,
        }
    }
}

/// Liquidity solver bounds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Relative convergence band `ε`
    pub tolerance: Decimal,
    /// Iteration cap before the best candidate is returned
    pub max_iterations: u32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: solver::SOLVER_TOLERANCE,
            max_iterations: solver::SOLVER_MAX_ITERATIONS,
        }
    }
}

/// Orchestration settings shared by the proxies
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Residue a proxy may keep after a call, in base units
    pub rounding_epsilon: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            rounding_epsilon: protocol::ROUNDING_EPSILON as u64,
        }
    }
}

/// Claim flash-mint settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlashSettings {
    /// Fee charged on flash-minted claims, in basis points
    pub fee_bps: u32,
}

impl Default for FlashSettings {
    fn default() -> Self {
        Self {
            fee_bps: protocol::FLASH_FEE_BPS,
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading protocol config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TENOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build protocol configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Failed to deserialize protocol configuration")?;

        parsed.validate()?;
        debug!(?parsed, "Protocol config loaded");
        Ok(parsed)
    }

    /// Reject settings the curve or solver cannot work with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.curve.time_stretch_seconds > 0,
            "curve.time_stretch_seconds must be positive"
        );
        ensure!(
            self.curve.fee_base_in.denominator > 0 && self.curve.fee_claim_in.denominator > 0,
            "curve fee denominators must be positive"
        );
        ensure!(
            self.solver.tolerance > Decimal::ZERO,
            "solver.tolerance must be positive"
        );
        ensure!(
            self.solver.max_iterations > 0,
            "solver.max_iterations must be positive"
        );
        ensure!(self.flash.fee_bps < 10_000, "flash.fee_bps must be below 100%");
        Ok(())
    }
}
