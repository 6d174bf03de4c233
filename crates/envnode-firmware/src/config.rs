use core::str::FromStr;

use envnode_core::{NodeConfig, RelayDefaults};
use log::warn;

/// Parse a value baked in by the build script.
fn baked<T: FromStr>(name: &str, raw: Option<&'static str>) -> Option<T> {
    let raw = raw?;
    let parsed = raw.parse().ok();
    if parsed.is_none() {
        warn!("Ignoring malformed {}={}", name, raw);
    }
    parsed
}

/// Node configuration with any `.env` overrides applied.
///
/// Threshold overrides that do not form a valid pair are dropped as a whole.
pub fn node_config() -> NodeConfig {
    let defaults = NodeConfig::default();

    let relay = RelayDefaults {
        high_threshold: baked("ENVNODE_TEMP_HIGH", option_env!("ENVNODE_TEMP_HIGH"))
            .unwrap_or(defaults.relay.high_threshold),
        low_threshold: baked("ENVNODE_TEMP_LOW", option_env!("ENVNODE_TEMP_LOW"))
            .unwrap_or(defaults.relay.low_threshold),
        ..defaults.relay
    };
    let relay = match relay.thresholds() {
        Ok(_) => relay,
        Err(e) => {
            warn!("Baked-in thresholds rejected ({}), using built-in defaults", e);
            defaults.relay
        }
    };

    NodeConfig {
        acquisition_interval_ms: baked("ENVNODE_INTERVAL_MS", option_env!("ENVNODE_INTERVAL_MS"))
            .unwrap_or(defaults.acquisition_interval_ms),
        relay,
    }
}
