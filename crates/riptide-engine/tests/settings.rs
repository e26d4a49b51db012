mod common;

use std::sync::atomic::Ordering;

use anyhow::Result;
use common::{Harness, eventually};
use riptide_config::{ConfigStore, ProxyKind, SettingKey};
use riptide_engine::Notice;
use riptide_test_support::SessionCall;
use riptide_torrent_core::{PortRange, ProxyType, Session};

#[tokio::test]
async fn speed_limit_change_reaches_session() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    harness.session.clear_calls();

    harness.config.update(SettingKey::MaxDownloadSpeed, &|prefs| {
        prefs.limits.max_download_speed = 4_096;
    })?;
    harness.settle().await;

    assert_eq!(harness.session.settings().download_rate_limit, 4_096);
    assert_eq!(harness.session.calls(), vec![SessionCall::SetSettings]);
    assert!(harness.engine.metrics().snapshot().settings_applied >= 1);
    Ok(())
}

#[tokio::test]
async fn changes_while_stopped_are_applied_at_start() -> Result<()> {
    let harness = Harness::new()?;
    harness.config.update(SettingKey::MaxUploadSpeed, &|prefs| {
        prefs.limits.max_upload_speed = 777;
    })?;
    harness.settle().await;
    assert!(harness.session.calls().is_empty());

    harness.start().await?;
    assert_eq!(harness.session.settings().upload_rate_limit, 777);
    Ok(())
}

#[tokio::test]
async fn ip_filter_follows_its_keys() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    assert!(harness.session.calls().contains(&SessionCall::DisableIpFilter));
    harness.session.clear_calls();
    let filter = harness.scratch.path().join("blocklist.p2p");

    harness.config.update(SettingKey::IpFilteringFile, &|prefs| {
        prefs.network.ip_filtering_file = Some(filter.clone());
    })?;
    harness.config.update(SettingKey::EnableIpFiltering, &|prefs| {
        prefs.network.enable_ip_filtering = true;
    })?;
    harness.settle().await;
    assert!(
        harness
            .session
            .calls()
            .contains(&SessionCall::EnableIpFilter(filter.clone()))
    );

    harness.session.clear_calls();
    harness.config.update(SettingKey::EnableIpFiltering, &|prefs| {
        prefs.network.enable_ip_filtering = false;
    })?;
    harness.settle().await;
    assert_eq!(harness.session.calls(), vec![SessionCall::DisableIpFilter]);
    Ok(())
}

#[tokio::test]
async fn proxy_fields_wait_for_apply() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;

    harness.config.update(SettingKey::ProxyType, &|prefs| {
        prefs.proxy.kind = ProxyKind::Http;
        prefs.proxy.address = "proxy.lan".into();
        prefs.proxy.port = 3_128;
        prefs.proxy.proxy_changed = true;
    })?;
    harness.settle().await;
    assert_eq!(harness.session.settings().proxy.kind, ProxyType::None);

    harness.config.update(SettingKey::ApplyProxy, &|prefs| {
        prefs.proxy.apply_proxy = true;
    })?;
    harness.settle().await;

    let pushed = harness.session.settings().proxy;
    assert_eq!(pushed.kind, ProxyType::Http);
    assert_eq!(pushed.address, "proxy.lan");
    assert_eq!(pushed.port, 3_128);
    let proxy = harness.config.snapshot().proxy;
    assert!(!proxy.apply_proxy);
    assert!(!proxy.proxy_changed);
    let applied = harness
        .notices()
        .iter()
        .filter(|notice| **notice == Notice::ProxyApplied)
        .count();
    assert_eq!(applied, 1);
    Ok(())
}

#[tokio::test]
async fn streaming_restarts_on_port_change() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;

    harness.config.update(SettingKey::StreamingPort, &|prefs| {
        prefs.streaming.port = 9_900;
    })?;
    harness.settle().await;

    let starts = harness.streaming.starts();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[1], ("127.0.0.1".to_string(), 9_900));

    harness.config.update(SettingKey::EnableStreaming, &|prefs| {
        prefs.streaming.enable_streaming = false;
    })?;
    harness.settle().await;
    assert_eq!(harness.streaming.starts().len(), 2);
    Ok(())
}

#[tokio::test]
async fn back_to_back_streaming_changes_restart_one_at_a_time() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    harness.streaming.bind_delay_ms.store(30, Ordering::SeqCst);

    harness.config.update(SettingKey::StreamingHostname, &|prefs| {
        prefs.streaming.hostname = "0.0.0.0".into();
    })?;
    harness.config.update(SettingKey::StreamingPort, &|prefs| {
        prefs.streaming.port = 9_901;
    })?;
    let expected = Some(("0.0.0.0".to_string(), 9_901));
    eventually("streaming rebound to the new address", || {
        harness.streaming.starts().last().cloned() == expected
    })
    .await?;
    harness.settle().await;

    assert_eq!(harness.streaming.overlapping_starts.load(Ordering::SeqCst), 0);
    assert_eq!(harness.streaming.starts_while_running.load(Ordering::SeqCst), 0);
    assert_eq!(harness.streaming.starts().last().cloned(), expected);
    Ok(())
}

#[tokio::test]
async fn port_range_change_rebinds() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;

    harness.config.update(SettingKey::PortRangeSecond, &|prefs| {
        prefs.network.port_range_first = 51_000;
        prefs.network.port_range_second = 51_005;
    })?;
    harness.settle().await;

    assert_eq!(
        harness.session.port_range(),
        Some(PortRange::new(51_000, 51_005))
    );
    Ok(())
}

#[tokio::test]
async fn switching_to_random_port_persists_the_draw() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;

    harness.config.update(SettingKey::UseRandomPort, &|prefs| {
        prefs.network.use_random_port = true;
    })?;
    harness.settle().await;

    let network = harness.config.snapshot().network;
    assert!(network.port_range_first >= 37_000);
    assert_eq!(
        harness.session.port_range(),
        Some(PortRange::new(
            network.port_range_first,
            network.port_range_second
        ))
    );
    Ok(())
}

#[tokio::test]
async fn unknown_token_is_ignored() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    harness.session.clear_calls();

    harness.config.notify_changed("definitely_not_a_key");
    harness.settle().await;

    assert!(harness.session.calls().is_empty());
    assert_eq!(harness.engine.metrics().snapshot().background_tasks_failed, 0);
    Ok(())
}
