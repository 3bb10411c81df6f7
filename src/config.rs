/*!
 * Synchronization Configuration
 *
 * Runtime configuration for parking strategy selection.
 *
 * The process-wide default is resolved once from the environment:
 * - `BUTEX_STRATEGY`: `futex`, `condvar`, `spin` or `auto`
 * - `BUTEX_SPIN_MICROS`: spin budget in microseconds before parking
 * - `BUTEX_MAX_SPINS`: maximum spin iterations before parking
 */

use crate::errors::ConfigError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

const ENV_STRATEGY: &str = "BUTEX_STRATEGY";
const ENV_SPIN_MICROS: &str = "BUTEX_SPIN_MICROS";
const ENV_MAX_SPINS: &str = "BUTEX_MAX_SPINS";

static GLOBAL_CONFIG: OnceLock<SyncConfig> = OnceLock::new();

/// Strategy type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    /// Futex-style parking keyed on the waiter record (fastest on Linux)
    Futex,
    /// Per-waiter mutex + condvar (cross-platform, reliable)
    Condvar,
    /// Adaptive spin before parking (low-latency, high-CPU for short waits)
    SpinWait,
    /// Auto-select based on platform
    Auto,
}

impl StrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::Futex => "futex",
            StrategyType::Condvar => "condvar",
            StrategyType::SpinWait => "spin",
            StrategyType::Auto => "auto",
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "futex" => Ok(StrategyType::Futex),
            "condvar" => Ok(StrategyType::Condvar),
            "spin" | "spinwait" => Ok(StrategyType::SpinWait),
            "auto" => Ok(StrategyType::Auto),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Synchronization configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Preferred strategy
    pub strategy: StrategyType,
    /// Spin duration before parking (for SpinWait)
    pub spin_duration: Duration,
    /// Maximum spin iterations before parking
    pub max_spins: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyType::Auto,
            spin_duration: Duration::from_micros(10),
            max_spins: 100,
        }
    }
}

impl SyncConfig {
    /// Configuration optimized for low-latency (< 1ms wait expected)
    pub const fn low_latency() -> Self {
        Self {
            strategy: StrategyType::SpinWait,
            spin_duration: Duration::from_micros(50),
            max_spins: 500,
        }
    }

    /// Configuration optimized for long waits (> 1ms expected)
    pub const fn long_wait() -> Self {
        Self {
            strategy: StrategyType::Auto,
            spin_duration: Duration::from_micros(1),
            max_spins: 10,
        }
    }

    /// Configuration pinned to a single strategy, other knobs at their defaults
    pub fn with_strategy(strategy: StrategyType) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Select best strategy for current platform
    pub fn select_strategy(&self) -> StrategyType {
        match self.strategy {
            StrategyType::Auto => {
                // Prefer futex on Linux, condvar elsewhere
                #[cfg(target_os = "linux")]
                {
                    StrategyType::Futex
                }
                #[cfg(not(target_os = "linux"))]
                {
                    StrategyType::Condvar
                }
            }
            other => other,
        }
    }

    /// Build a configuration from `BUTEX_*` environment variables.
    ///
    /// Unset variables keep their default value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_STRATEGY) {
            config.strategy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_SPIN_MICROS) {
            let micros = parse_number::<u64>(ENV_SPIN_MICROS, &raw)?;
            config.spin_duration = Duration::from_micros(micros);
        }
        if let Some(raw) = lookup(ENV_MAX_SPINS) {
            config.max_spins = parse_number::<u32>(ENV_MAX_SPINS, &raw)?;
        }

        Ok(config)
    }

    /// Process-wide default used by `Butex::create` and `ButexMemory::construct`.
    ///
    /// Resolved once; malformed environment values fall back to `default()`.
    pub fn global() -> SyncConfig {
        *GLOBAL_CONFIG.get_or_init(|| {
            Self::from_env().unwrap_or_else(|err| {
                warn!("Ignoring butex environment configuration: {}", err);
                Self::default()
            })
        })
    }
}

fn parse_number<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}
