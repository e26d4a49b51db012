mod common;

use std::sync::atomic::Ordering;

use anyhow::Result;
use common::Harness;
use riptide_config::{ConfigStore, SettingKey};
use riptide_engine::DeviceSignal;
use riptide_test_support::SessionCall;

fn reschedules(harness: &Harness) -> (usize, usize) {
    (
        harness.calls_matching(|call| *call == SessionCall::PauseAll),
        harness.calls_matching(|call| *call == SessionCall::ResumeAll),
    )
}

#[tokio::test]
async fn device_signals_reschedule_only_when_subscribed() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    harness.session.clear_calls();

    harness.engine.on_device_state_changed(DeviceSignal::Connectivity);
    harness.engine.on_device_state_changed(DeviceSignal::Charging);
    harness.settle().await;
    assert_eq!(reschedules(&harness), (0, 0));

    harness
        .config
        .update(SettingKey::UnmeteredConnectionsOnly, &|prefs| {
            prefs.policy.unmetered_connections_only = true;
        })?;
    harness.settle().await;
    assert_eq!(reschedules(&harness), (0, 1));

    harness.session.clear_calls();
    harness.device.metered.store(true, Ordering::SeqCst);
    harness.engine.on_device_state_changed(DeviceSignal::Connectivity);
    harness.settle().await;
    assert_eq!(reschedules(&harness), (1, 0));
    Ok(())
}

#[tokio::test]
async fn custom_battery_threshold_replaces_low_battery_check() -> Result<()> {
    let harness = Harness::with_preferences(|prefs, _| {
        prefs.policy.battery_control = true;
        prefs.policy.custom_battery_control = true;
        prefs.policy.custom_battery_control_value = 15;
    })?;
    harness.device.low.store(true, Ordering::SeqCst);
    harness.device.percent.store(50, Ordering::SeqCst);
    assert!(!harness.engine.should_pause_for_policy());

    harness.device.percent.store(15, Ordering::SeqCst);
    assert!(harness.engine.should_pause_for_policy());
    Ok(())
}

#[tokio::test]
async fn enabling_custom_battery_control_evaluates_once() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    harness.session.clear_calls();

    harness.config.update(SettingKey::CustomBatteryControl, &|prefs| {
        prefs.policy.custom_battery_control = true;
    })?;
    harness.settle().await;
    assert_eq!(reschedules(&harness), (0, 1));

    harness.session.clear_calls();
    harness
        .config
        .update(SettingKey::CustomBatteryControlValue, &|prefs| {
            prefs.policy.custom_battery_control_value = 100;
        })?;
    harness.settle().await;
    assert_eq!(reschedules(&harness), (1, 0));

    harness.session.clear_calls();
    harness.device.percent.store(100, Ordering::SeqCst);
    harness.engine.on_device_state_changed(DeviceSignal::BatteryLevel);
    harness.settle().await;
    assert_eq!(reschedules(&harness), (1, 0));
    Ok(())
}

#[tokio::test]
async fn disallowing_roaming_pauses_a_roaming_device() -> Result<()> {
    let harness = Harness::new()?;
    harness.device.roaming.store(true, Ordering::SeqCst);
    harness.start().await?;
    assert_eq!(reschedules(&harness), (0, 1));
    harness.session.clear_calls();

    harness.config.update(SettingKey::EnableRoaming, &|prefs| {
        prefs.policy.enable_roaming = false;
    })?;
    harness.settle().await;

    assert_eq!(reschedules(&harness), (1, 0));
    assert!(harness.engine.should_pause_for_policy());
    Ok(())
}

#[tokio::test]
async fn start_pauses_when_not_charging() -> Result<()> {
    let harness = Harness::with_preferences(|prefs, _| {
        prefs.policy.download_only_when_charging = true;
    })?;
    harness.device.charging.store(false, Ordering::SeqCst);

    harness.start().await?;

    assert_eq!(reschedules(&harness), (1, 0));
    assert!(harness.engine.metrics().snapshot().policy_pauses >= 1);
    Ok(())
}
