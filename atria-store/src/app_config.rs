use serde::Deserialize;
use std::env;

use atria_catalog::pricing::PricingConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub business_rules: BusinessRules,
    pub pricing: PricingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Provision a demo hotel catalog on boot.
    #[serde(default)]
    pub seed_demo: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// How long a hold keeps inventory off the market, in seconds.
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_seconds: i64,

    /// Expiry sweep cadence. Keep well under a minute so an abandoned hold
    /// cannot create phantom unavailability for long.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// Allowed drift between the hold-time quote and the re-derived total
    /// at booking time. Zero means strict.
    #[serde(default)]
    pub price_tolerance_cents: i32,

    /// Cancelling at least this many days before check-in refunds in full.
    #[serde(default = "default_free_cancel_days")]
    pub free_cancel_days: i64,

    /// Refund percentage inside the cancellation window.
    #[serde(default = "default_late_refund_percent")]
    pub late_refund_percent: i32,
}

fn default_hold_ttl() -> i64 {
    900
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_free_cancel_days() -> i64 {
    7
}

fn default_late_refund_percent() -> i32 {
    50
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Layer the environment-specific file on top (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Finally environment variables, e.g. ATRIA__SERVER__PORT=8081
            .add_source(config::Environment::with_prefix("ATRIA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
