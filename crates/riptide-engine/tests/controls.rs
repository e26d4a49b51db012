mod common;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use common::{Harness, stored};
use riptide_engine::SpeedLimits;
use riptide_test_support::{FakeTask, SessionCall, TaskCall, TorrentFixture};
use riptide_torrent_core::{ChangeableParams, TorrentStateCode};

fn urls(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|url| (*url).to_string()).collect()
}

#[tokio::test]
async fn absent_torrent_is_a_no_op() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    let id = TorrentFixture::single("ghost.bin", 1).info_hash()?;

    harness.engine.pause_resume_torrent(id.clone());
    harness.engine.force_recheck_torrents(vec![id.clone()]);
    harness.engine.change_params(id.clone(), ChangeableParams::move_to("/elsewhere"));
    harness.engine.add_trackers(&id, urls(&["udp://a.example:1"]));
    harness.settle().await;

    assert!(harness.engine.make_magnet(&id, false).is_none());
    assert!(harness.engine.torrent_metainfo(&id).is_none());
    assert!(harness.engine.pieces(&id).is_empty());
    assert!(harness.engine.bencode(&id).is_none());
    assert!(harness.engine.speed_limits(&id).is_none());
    assert!(harness.engine.make_tracker_info_list(&id).is_empty());
    assert!(harness.engine.make_peer_info_list(&id).is_empty());
    assert!(harness.engine.make_advanced_info_sync(&id).is_none());
    assert!(harness.engine.make_info_sync(&id).is_none());
    assert_eq!(harness.engine.metrics().snapshot().background_tasks_failed, 0);
    Ok(())
}

#[tokio::test]
async fn manual_pause_toggles() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    let id = TorrentFixture::single("toggle.bin", 1).info_hash()?;
    let task = harness
        .session
        .insert_task(FakeTask::new(id.clone(), "toggle.bin"));

    harness.engine.pause_resume_torrent(id.clone());
    harness.settle().await;
    harness.engine.pause_resume_torrent(id.clone());
    harness.settle().await;
    harness.engine.force_recheck_torrents(vec![id.clone()]);
    harness.settle().await;
    harness.engine.force_announce_torrents(vec![id]);
    harness.settle().await;

    assert_eq!(
        task.calls(),
        vec![
            TaskCall::PauseManually,
            TaskCall::ResumeManually,
            TaskCall::ForceRecheck,
            TaskCall::Announce,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn tracker_lists_are_edited_in_place() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    let id = TorrentFixture::single("trackers.bin", 1).info_hash()?;
    harness.session.insert_task(
        FakeTask::new(id.clone(), "trackers.bin")
            .with_trackers(&["udp://one.example:1", "udp://two.example:2"]),
    );

    harness
        .engine
        .add_trackers(&id, urls(&["http://three.example/announce"]));
    harness
        .engine
        .delete_trackers(&id, &urls(&["udp://one.example:1", "udp://unknown.example:9"]));

    let listed: Vec<String> = harness
        .engine
        .make_tracker_info_list(&id)
        .into_iter()
        .map(|tracker| tracker.url)
        .collect();
    assert_eq!(
        listed,
        vec![
            "http://three.example/announce".to_string(),
            "udp://two.example:2".to_string(),
        ]
    );

    harness
        .engine
        .replace_trackers(&id, urls(&["udp://only.example:3"]));
    assert_eq!(harness.engine.make_tracker_info_list(&id).len(), 1);
    Ok(())
}

#[tokio::test]
async fn finished_check_reflects_task_states() -> Result<()> {
    let harness = Harness::new()?;
    assert!(harness.engine.is_torrents_finished());

    harness.start().await?;
    let id = TorrentFixture::single("busy.bin", 1).info_hash()?;
    let task = harness.session.insert_task(
        FakeTask::new(id, "busy.bin").with_state(TorrentStateCode::Seeding),
    );
    assert!(harness.engine.is_torrents_finished());

    task.set_changing_params(true);
    assert!(!harness.engine.is_torrents_finished());

    task.set_changing_params(false);
    task.set_state(TorrentStateCode::Checking);
    assert!(!harness.engine.is_torrents_finished());
    Ok(())
}

#[tokio::test]
async fn info_queries_combine_repository_and_live_status() -> Result<()> {
    let harness = Harness::new()?;
    let live = TorrentFixture::single("live.bin", 1_000);
    let stale = TorrentFixture::single("stale.bin", 1_000);
    for fixture in [&live, &stale] {
        harness
            .repository
            .insert(stored(fixture, harness.scratch.path())?);
    }
    assert!(harness.engine.make_session_stats().is_none());
    let offline = harness
        .engine
        .make_info_sync(&live.info_hash()?)
        .context("stored torrent missing")?;
    assert!(offline.status.is_none());

    harness.start().await?;
    harness.session.insert_task(
        FakeTask::new(live.info_hash()?, "live.bin").with_metadata(live.to_bytes()?),
    );

    let infos = harness.engine.make_info_list_sync();
    assert_eq!(infos.len(), 2);
    let with_status = infos.iter().filter(|info| info.status.is_some()).count();
    assert_eq!(with_status, 1);

    let advanced = harness
        .engine
        .make_advanced_info_sync(&live.info_hash()?)
        .context("advanced info missing")?;
    assert_eq!(advanced.torrent_id, live.info_hash()?);
    assert_eq!(harness.engine.pieces(&live.info_hash()?).len(), 1);
    assert!(
        harness
            .engine
            .make_magnet(&live.info_hash()?, false)
            .context("magnet missing")?
            .contains("dn=live.bin")
    );
    assert_eq!(
        harness.engine.bencode(&live.info_hash()?),
        Some(live.to_bytes()?)
    );
    assert!(!harness.engine.is_sequential_download(&live.info_hash()?));

    let stats = harness
        .engine
        .make_session_stats()
        .context("stats missing while running")?;
    assert_eq!(stats.listen_port, Some(6_881));
    Ok(())
}

#[tokio::test]
async fn per_torrent_speed_limits_round_trip() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    let id = TorrentFixture::single("capped.bin", 1).info_hash()?;
    harness.session.insert_task(FakeTask::new(id.clone(), "capped.bin"));

    harness.engine.set_download_speed_limit(&id, Some(1_000));
    harness.engine.set_upload_speed_limit(&id, Some(250));
    assert_eq!(
        harness.engine.speed_limits(&id),
        Some(SpeedLimits {
            download: Some(1_000),
            upload: Some(250),
        })
    );

    harness.engine.set_download_speed_limit(&id, None);
    assert_eq!(
        harness.engine.speed_limits(&id).and_then(|limits| limits.download),
        None
    );
    Ok(())
}

#[tokio::test]
async fn bulk_operations_need_a_running_session() -> Result<()> {
    let harness = Harness::new()?;
    let id = TorrentFixture::single("bulk.bin", 1).info_hash()?;

    harness.engine.delete_torrents(vec![id.clone()], true);
    harness.engine.pause_all();
    harness.engine.resume_all();
    harness.engine.load_torrents();
    harness.engine.executor().wait_idle().await;
    assert!(harness.session.calls().is_empty());

    harness.start().await?;
    harness.session.clear_calls();
    harness.engine.delete_torrents(vec![id.clone()], true);
    harness.engine.pause_all();
    harness.engine.resume_all();
    harness.engine.load_torrents();
    harness.settle().await;

    let calls = harness.session.calls();
    assert_eq!(calls.len(), 4, "unexpected calls: {calls:?}");
    for expected in [
        SessionCall::DeleteTorrent {
            id,
            with_files: true,
        },
        SessionCall::PauseAllManually,
        SessionCall::ResumeAllManually,
        SessionCall::RestoreTorrents,
    ] {
        assert!(calls.contains(&expected), "missing {expected:?}");
    }
    Ok(())
}

#[tokio::test]
async fn change_params_reaches_the_task() -> Result<()> {
    let harness = Harness::new()?;
    harness.start().await?;
    let id = TorrentFixture::single("rename.bin", 1).info_hash()?;
    let task = harness
        .session
        .insert_task(FakeTask::new(id.clone(), "rename.bin"));
    let target = harness.scratch.path().join("moved");

    harness
        .engine
        .change_params(id, ChangeableParams::move_to(&target));
    harness.settle().await;

    assert_eq!(task.download_path(), target);
    Ok(())
}

#[tokio::test]
async fn task_controls_need_a_running_session() -> Result<()> {
    let harness = Harness::new()?;
    let id = TorrentFixture::single("parked.bin", 1).info_hash()?;
    let task = harness
        .session
        .insert_task(FakeTask::new(id.clone(), "parked.bin"));

    harness.engine.pause_resume_torrent(id.clone());
    harness.engine.force_recheck_torrents(vec![id.clone()]);
    harness.engine.force_announce_torrents(vec![id.clone()]);
    harness
        .engine
        .change_params(id, ChangeableParams::move_to(harness.scratch.path()));
    harness.settle().await;

    assert!(task.calls().is_empty());
    assert_eq!(harness.engine.metrics().snapshot().background_tasks_failed, 0);
    Ok(())
}
