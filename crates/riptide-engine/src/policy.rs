//! Power and connectivity policy.
//!
//! # Design
//! - Inputs are captured fresh from preferences and the device on every
//!   evaluation; nothing is cached between evaluations.
//! - Conditions are OR-combined. Custom battery control replaces the standard
//!   low-battery check rather than adding to it.
//! - Device signal subscriptions are explicit values re-synced from
//!   preferences, so re-subscribing is idempotent.

use std::collections::BTreeSet;

use riptide_config::Preferences;

/// Platform power and connectivity probes.
pub trait DeviceState: Send + Sync {
    /// Whether the active network is roaming.
    fn is_roaming(&self) -> bool;

    /// Whether the active network is metered.
    fn is_metered(&self) -> bool;

    /// Whether the device is charging.
    fn is_charging(&self) -> bool;

    /// Battery charge, 0 to 100.
    fn battery_percent(&self) -> u8;

    /// Whether the platform reports the battery as low.
    fn is_battery_low(&self) -> bool;
}

/// Device broadcasts the policy may listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeviceSignal {
    /// Network type or roaming changed.
    Connectivity,
    /// Charger connected or disconnected.
    Charging,
    /// Platform low-battery threshold crossed.
    BatteryLow,
    /// Battery level changed.
    BatteryLevel,
}

/// Snapshot of everything the pause decision reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PolicyInputs {
    /// Pause while roaming.
    pub roaming_disallowed: bool,
    /// Device is roaming.
    pub roaming: bool,
    /// Transfer on unmetered networks only.
    pub unmetered_only: bool,
    /// Active network is metered.
    pub metered: bool,
    /// Transfer only while charging.
    pub only_charging: bool,
    /// Device is charging.
    pub charging: bool,
    /// Standard low-battery control enabled.
    pub battery_control: bool,
    /// Platform reports low battery.
    pub battery_low: bool,
    /// Custom threshold control enabled.
    pub custom_battery_control: bool,
    /// Battery charge.
    pub battery_percent: u8,
    /// Custom threshold.
    pub battery_threshold: u8,
}

impl PolicyInputs {
    /// Read preferences and probe the device.
    #[must_use]
    pub fn capture(prefs: &Preferences, device: &dyn DeviceState) -> Self {
        let policy = &prefs.policy;
        Self {
            roaming_disallowed: !policy.enable_roaming,
            roaming: device.is_roaming(),
            unmetered_only: policy.unmetered_connections_only,
            metered: device.is_metered(),
            only_charging: policy.download_only_when_charging,
            charging: device.is_charging(),
            battery_control: policy.battery_control,
            battery_low: device.is_battery_low(),
            custom_battery_control: policy.custom_battery_control,
            battery_percent: device.battery_percent(),
            battery_threshold: policy.custom_battery_control_value,
        }
    }

    /// Whether transfers should be paused.
    #[must_use]
    pub const fn should_pause(&self) -> bool {
        let battery = if self.custom_battery_control {
            self.battery_percent <= self.battery_threshold
        } else {
            self.battery_control && self.battery_low
        };
        (self.roaming_disallowed && self.roaming)
            || (self.unmetered_only && self.metered)
            || (self.only_charging && !self.charging)
            || battery
    }
}

/// Device signals currently subscribed to.
#[derive(Debug, Default)]
pub struct PolicySubscriptions {
    active: BTreeSet<DeviceSignal>,
}

impl PolicySubscriptions {
    /// Empty subscription set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals `prefs` asks for.
    #[must_use]
    pub fn wanted(prefs: &Preferences) -> BTreeSet<DeviceSignal> {
        let policy = &prefs.policy;
        let mut wanted = BTreeSet::new();
        if !policy.enable_roaming || policy.unmetered_connections_only {
            wanted.insert(DeviceSignal::Connectivity);
        }
        if policy.download_only_when_charging {
            wanted.insert(DeviceSignal::Charging);
        }
        if policy.custom_battery_control {
            wanted.insert(DeviceSignal::BatteryLevel);
        } else if policy.battery_control {
            wanted.insert(DeviceSignal::BatteryLow);
        }
        wanted
    }

    /// Bring the set in line with `prefs`.
    ///
    /// Returns `true` when the battery level subscription was just started. It
    /// has no sticky replay, so the caller evaluates the policy by hand.
    pub fn sync(&mut self, prefs: &Preferences) -> bool {
        let wanted = Self::wanted(prefs);
        let started_level = wanted.contains(&DeviceSignal::BatteryLevel)
            && !self.active.contains(&DeviceSignal::BatteryLevel);
        self.active = wanted;
        started_level
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Whether `signal` is subscribed.
    #[must_use]
    pub fn is_subscribed(&self, signal: DeviceSignal) -> bool {
        self.active.contains(&signal)
    }
}
