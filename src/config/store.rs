use crate::config::try_get_env;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

pub const NAME_STORE_TIMEOUT: &str = "STORE_TIMEOUT_MS";
pub const NAME_LOTTERY_TICK: &str = "LOTTERY_TICK_SECONDS";

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONFLICT_RETRIES: u32 = 8;
const DEFAULT_TICK_SECONDS: u64 = 30;

#[derive(Deserialize)]
pub struct StoreSettingsModel {
    pub timeout_ms: Option<u64>,
    pub conflict_retries: Option<u32>,
}

impl StoreSettingsModel {
    pub fn to_settings(self) -> StoreSettings {
        let timeout_ms = self.timeout_ms.unwrap_or_else(|| {
            warn!("Using default store timeout");
            DEFAULT_TIMEOUT_MS
        });
        StoreSettings {
            timeout: Duration::from_millis(timeout_ms),
            conflict_retries: self.conflict_retries.unwrap_or(DEFAULT_CONFLICT_RETRIES),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreSettings {
    /// Upper bound for every single store call.
    pub timeout: Duration,
    /// Re-reads allowed after a lost compare-and-swap.
    pub conflict_retries: u32,
}

impl StoreSettings {
    pub fn new(timeout: Duration, conflict_retries: u32) -> Self {
        Self {
            timeout,
            conflict_retries,
        }
    }

    pub fn from_env() -> Self {
        let timeout_ms = try_get_env(NAME_STORE_TIMEOUT)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self::new(Duration::from_millis(timeout_ms), DEFAULT_CONFLICT_RETRIES)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
            DEFAULT_CONFLICT_RETRIES,
        )
    }
}

#[derive(Deserialize)]
pub struct LotterySettingsModel {
    pub tick_seconds: Option<u64>,
    pub enabled: Option<bool>,
}

impl LotterySettingsModel {
    pub fn to_settings(self) -> LotterySettings {
        let tick_seconds = self.tick_seconds.unwrap_or_else(|| {
            warn!("Using default lottery tick");
            DEFAULT_TICK_SECONDS
        });
        LotterySettings {
            tick: Duration::from_secs(tick_seconds.max(1)),
            enabled: self.enabled.unwrap_or(true),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LotterySettings {
    pub tick: Duration,
    /// Whether the binary runs scheduled draws.
    pub enabled: bool,
}

impl LotterySettings {
    pub fn from_env() -> Self {
        let tick_seconds = try_get_env(NAME_LOTTERY_TICK)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TICK_SECONDS);
        Self {
            tick: Duration::from_secs(tick_seconds.max(1)),
            enabled: true,
        }
    }
}

impl Default for LotterySettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(DEFAULT_TICK_SECONDS),
            enabled: true,
        }
    }
}
