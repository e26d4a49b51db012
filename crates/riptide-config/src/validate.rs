//! Validation helpers for preference documents.

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Preferences, ProxyKind};

/// Reject preference documents the engine cannot apply.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the first offending field.
pub fn validate_preferences(prefs: &Preferences) -> ConfigResult<()> {
    let network = &prefs.network;
    if network.port_range_first == 0 {
        return Err(invalid(
            "network",
            "port_range_first",
            network.port_range_first,
            "must be non-zero",
        ));
    }
    if network.port_range_second < network.port_range_first {
        return Err(invalid(
            "network",
            "port_range_second",
            network.port_range_second,
            "must not precede port_range_first",
        ));
    }
    let threshold = prefs.policy.custom_battery_control_value;
    if threshold > 100 {
        return Err(invalid(
            "policy",
            "custom_battery_control_value",
            threshold,
            "must be a percentage",
        ));
    }

    if prefs.proxy.kind != ProxyKind::None && prefs.proxy.port == 0 {
        return Err(invalid("proxy", "port", prefs.proxy.port, "must be non-zero"));
    }

    if prefs.streaming.port == 0 {
        return Err(invalid(
            "streaming",
            "port",
            prefs.streaming.port,
            "must be non-zero",
        ));
    }
    Ok(())
}

fn invalid(
    section: &'static str,
    field: &'static str,
    value: impl ToString,
    reason: &'static str,
) -> ConfigError {
    ConfigError::InvalidField {
        section,
        field,
        value: Some(value.to_string()),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> ConfigResult<()> {
        validate_preferences(&Preferences::default())
    }

    #[test]
    fn rejects_reversed_port_range() {
        let mut prefs = Preferences::default();
        prefs.network.port_range_first = 7_000;
        prefs.network.port_range_second = 6_000;
        assert!(matches!(
            validate_preferences(&prefs),
            Err(ConfigError::InvalidField {
                field: "port_range_second",
                ..
            })
        ));
    }

    #[test]
    fn rejects_threshold_above_hundred() {
        let mut prefs = Preferences::default();
        prefs.policy.custom_battery_control_value = 101;
        assert!(matches!(
            validate_preferences(&prefs),
            Err(ConfigError::InvalidField {
                section: "policy",
                ..
            })
        ));
    }

    #[test]
    fn proxy_port_required_only_when_proxy_enabled() {
        let mut prefs = Preferences::default();
        prefs.proxy.port = 0;
        assert!(validate_preferences(&prefs).is_ok());
        prefs.proxy.kind = ProxyKind::Socks5;
        assert!(validate_preferences(&prefs).is_err());
        prefs.proxy.port = 1_080;
        assert!(validate_preferences(&prefs).is_ok());
    }
}
