//! Configuration for the bidding core.
//!
//! Layered like the teacher's `RustCommerceSettings` (`src/settings.rs`):
//! one sub-struct per concern, each with a `Default` impl carrying the
//! spec's stated defaults (spec.md §6 Configuration options). Loaded from a
//! TOML file with a handful of `RC_AUCTION__*` environment overrides for the
//! knobs operators tune most often.

use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auction: AuctionConfig,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            auction: AuctionConfig::default(),
            server: ServerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let mut cfg: Config = toml::from_str(&contents)?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RC_AUCTION__DATABASE__URL") {
            self.database.url = url;
        }
        if let Ok(v) = std::env::var("RC_AUCTION__AUCTION__OCC_MAX_RETRIES") {
            if let Ok(v) = v.parse() {
                self.auction.occ_max_retries = v;
            }
        }
        if let Ok(v) = std::env::var("RC_AUCTION__SERVER__BIND_ADDR") {
            self.server.bind_addr = v;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auction.occ_max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "auction.occ_max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.auction.max_extensions < 0 {
            return Err(ConfigError::Invalid {
                field: "auction.max_extensions",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Auction Store connection bounds (spec.md §5: bounded pool, released
/// before broadcasting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/vehicle_auction".to_string(),
            max_connections: 20,
        }
    }
}

/// Bid Engine / Lifecycle Scheduler / Extender tuning (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Minimum amount by which a bid must exceed the current floor.
    pub min_bid_increment: rust_decimal::Decimal,
    /// Protective cap rejecting implausible amounts.
    pub max_bid_amount: rust_decimal::Decimal,
    /// Bounded OCC retry budget before `Contention` is returned.
    pub occ_max_retries: u32,
    #[serde(with = "duration_millis")]
    pub scheduler_tick: Duration,
    pub broadcaster_buffer: usize,
    #[serde(with = "duration_secs")]
    pub extension_step: Duration,
    #[serde(with = "duration_secs")]
    pub snipe_threshold: Duration,
    pub max_extensions: i32,
    /// Cancellation-token budget for an ingress submission (spec.md §5):
    /// `submit` aborts with `Cancelled` rather than committing once this
    /// much wall time has passed since the request arrived.
    #[serde(with = "duration_millis")]
    pub bid_submit_timeout: Duration,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            min_bid_increment: rust_decimal::Decimal::ONE,
            max_bid_amount: rust_decimal::Decimal::new(100_000_000_00, 2),
            occ_max_retries: 5,
            scheduler_tick: Duration::from_millis(500),
            broadcaster_buffer: 32,
            extension_step: Duration::from_secs(120),
            snipe_threshold: Duration::from_secs(120),
            max_extensions: 10,
            bid_submit_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_filter: String,
    pub json_logs: bool,
    pub metrics_bind_addr: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: "info,auction_core=debug".to_string(),
            json_logs: false,
            metrics_bind_addr: "0.0.0.0:9090".to_string(),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = AuctionConfig::default();
        assert_eq!(cfg.occ_max_retries, 5);
        assert_eq!(cfg.max_extensions, 10);
        assert_eq!(cfg.extension_step, Duration::from_secs(120));
        assert_eq!(cfg.snipe_threshold, Duration::from_secs(120));
        assert_eq!(cfg.broadcaster_buffer, 32);
        assert_eq!(cfg.bid_submit_timeout, Duration::from_secs(5));
    }
}
