use std::time::Duration;

use super::*;
use crate::models::SourceKind;
use crate::services::{AdSource, StoreClickTracker, StoreSource};
use crate::storage::{LocalStore, MemoryStore};
use crate::testing::{RecordingSurface, UnreachableSource, stored_ad};

const TICK: Duration = Duration::from_secs(8);

fn build(store: Arc<dyn KeyValueStore>, surface: RecordingSurface) -> AdRotator {
    let config = Config::default();
    let sources: Vec<Box<dyn AdSource>> = vec![
        Box::new(UnreachableSource),
        Box::new(StoreSource::new(store.clone(), "ad_")),
    ];
    AdRotator::new(
        config,
        store.clone(),
        SourceLoader::new(sources),
        Box::new(StoreClickTracker::new(store)),
        Box::new(surface),
    )
}

fn two_ad_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries([
        ("ad_1", stored_ad("first", 0)),
        ("ad_2", stored_ad("second", 3)),
    ]))
}

async fn store_contents(store: &MemoryStore) -> Vec<(String, Option<String>)> {
    let mut contents = Vec::new();
    for key in store.keys().await.unwrap() {
        let value = store.get(&key).await.unwrap();
        contents.push((key, value));
    }
    contents
}

#[tokio::test]
async fn test_load_two_stored_ads_with_remote_down() {
    let surface = RecordingSurface::new();
    let mut rotator = build(two_ad_store(), surface.clone());

    let outcome = rotator.load().await;

    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            count: 2,
            fallback: false
        }
    );
    assert_eq!(rotator.current_index(), 0);
    assert_eq!(surface.rendered_ids(), vec!["ad_1"]);
}

#[tokio::test]
async fn test_empty_sources_show_default_ad() {
    let surface = RecordingSurface::new();
    let mut rotator = build(Arc::new(MemoryStore::new()), surface.clone());

    let outcome = rotator.load().await;

    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            count: 1,
            fallback: true
        }
    );
    assert_eq!(rotator.ads().len(), 1);
    assert_eq!(rotator.ads()[0].id, DEFAULT_AD_ID);
    assert_eq!(surface.rendered_ids(), vec![DEFAULT_AD_ID]);
}

#[tokio::test]
async fn test_expired_stored_ads_are_not_shown() {
    let store = Arc::new(MemoryStore::with_entries([
        ("ad_1", stored_ad("current", 0)),
        (
            "ad_2",
            r#"{"title": "old", "image": "old.jpg", "expiry": "2001-01-01"}"#.to_string(),
        ),
    ]));
    let mut rotator = build(store, RecordingSurface::new());

    rotator.load().await;

    assert_eq!(rotator.snapshot().ad_ids, vec!["ad_1"]);
}

#[tokio::test]
async fn test_load_is_ignored_while_another_is_in_flight() {
    let mut rotator = build(two_ad_store(), RecordingSurface::new());

    let held = rotator.load_slot().try_acquire().unwrap();
    assert_eq!(rotator.load().await, LoadOutcome::Skipped);
    assert!(rotator.ads().is_empty());

    drop(held);
    assert!(matches!(rotator.load().await, LoadOutcome::Loaded { count: 2, .. }));
}

#[tokio::test]
async fn test_reload_clamps_index_when_list_shrinks() {
    let store = two_ad_store();
    let mut rotator = build(store.clone(), RecordingSurface::new());
    rotator.load().await;
    rotator.next_ad().await;
    assert_eq!(rotator.current_index(), 1);

    store.remove("ad_2").await.unwrap();
    rotator.load().await;

    assert_eq!(rotator.current_index(), 0);
    assert_eq!(rotator.current_ad().unwrap().id, "ad_1");
}

#[tokio::test]
async fn test_missing_region_renders_nothing() {
    let surface = RecordingSurface::missing();
    let mut rotator = build(two_ad_store(), surface.clone());

    rotator.load().await;

    assert_eq!(rotator.ads().len(), 2);
    assert!(!rotator.render_current().await);
    assert!(surface.rendered_ids().is_empty());
}

#[tokio::test]
async fn test_next_ad_wraps_around() {
    let surface = RecordingSurface::new();
    let mut rotator = build(two_ad_store(), surface.clone());
    rotator.load().await;

    rotator.next_ad().await;
    assert_eq!(rotator.current_index(), 1);
    rotator.next_ad().await;
    assert_eq!(rotator.current_index(), 0);

    assert_eq!(surface.rendered_ids(), vec!["ad_1", "ad_2", "ad_1"]);
}

#[tokio::test]
async fn test_next_ad_single_record_rerenders_in_place() {
    let store = Arc::new(MemoryStore::with_entries([("ad_1", stored_ad("only", 0))]));
    let surface = RecordingSurface::new();
    let mut rotator = build(store, surface.clone());
    rotator.load().await;

    rotator.next_ad().await;
    rotator.next_ad().await;

    assert_eq!(rotator.current_index(), 0);
    assert_eq!(surface.rendered_ids(), vec!["ad_1", "ad_1", "ad_1"]);
}

#[tokio::test]
async fn test_next_ad_on_empty_list_is_noop() {
    let surface = RecordingSurface::new();
    let mut rotator = build(two_ad_store(), surface.clone());

    rotator.next_ad().await;

    assert_eq!(rotator.current_index(), 0);
    assert!(surface.rendered_ids().is_empty());
}

#[tokio::test]
async fn test_pause_resume_keeps_index() {
    let mut rotator = build(two_ad_store(), RecordingSurface::new());
    rotator.load().await;
    rotator.next_ad().await;
    rotator.start_rotation();

    rotator.pause();
    assert_eq!(rotator.state(), RotationState::Paused);
    rotator.resume();
    rotator.pause();
    rotator.resume();

    assert_eq!(rotator.state(), RotationState::Running);
    assert_eq!(rotator.current_index(), 1);
}

#[tokio::test]
async fn test_click_on_default_ad_never_touches_store() {
    let store = Arc::new(MemoryStore::with_entries([(
        DEFAULT_AD_ID,
        stored_ad("shadow", 5),
    )]));
    let before = store_contents(&store).await;
    let mut rotator = build(store.clone(), RecordingSurface::new());

    assert!(rotator.record_click(DEFAULT_AD_ID).await.is_none());

    assert_eq!(store_contents(&store).await, before);
}

#[tokio::test]
async fn test_click_increments_store_and_active_list() {
    let store = two_ad_store();
    let mut rotator = build(store.clone(), RecordingSurface::new());
    rotator.load().await;

    let outcome = rotator.record_click("ad_2").await;

    assert_eq!(outcome, Some(ClickOutcome::Recorded { clicks: Some(4) }));
    let saved: AdRecord =
        serde_json::from_str(&store.get("ad_2").await.unwrap().unwrap()).unwrap();
    assert_eq!(saved.clicks, 4);
    assert!(saved.last_click.is_some());
    assert_eq!(rotator.ads()[1].clicks, 4);
}

#[tokio::test]
async fn test_click_on_unknown_or_corrupt_record_is_swallowed() {
    let store = Arc::new(MemoryStore::with_entries([("ad_bad", "{oops")]));
    let mut rotator = build(store.clone(), RecordingSurface::new());

    assert_eq!(
        rotator.record_click("ad_missing").await,
        Some(ClickOutcome::Missing)
    );
    assert!(rotator.record_click("ad_bad").await.is_none());
    assert_eq!(store.get("ad_bad").await.unwrap().as_deref(), Some("{oops"));
}

#[tokio::test]
async fn test_add_then_stats() {
    let store = two_ad_store();
    let surface = RecordingSurface::new();
    let mut rotator = build(store.clone(), surface.clone());
    rotator.load().await;
    let before = rotator.stats().await.unwrap();

    let id = rotator
        .add(NewAd {
            title: "Test ad".into(),
            desc: "Checking the system".into(),
            image: "https://via.placeholder.com/150".into(),
            phone: "989220730628".into(),
            ad_type: "test".into(),
            expiry: None,
        })
        .await
        .unwrap();

    let after = rotator.stats().await.unwrap();
    assert_eq!(after.total_ads, before.total_ads + 1);
    assert_eq!(after.active_ads_count, 3);
    assert!(id.starts_with("ad_"));
    assert!(store.contains(&id).await.unwrap());
    assert_eq!(rotator.ads().last().unwrap().id, id);
    // Re-rendered the current card
    assert_eq!(surface.rendered_ids(), vec!["ad_1", "ad_1"]);
}

#[tokio::test]
async fn test_add_generates_unique_ids() {
    let mut rotator = build(Arc::new(MemoryStore::new()), RecordingSurface::new());
    let new_ad = NewAd {
        title: "t".into(),
        image: "i".into(),
        ..NewAd::default()
    };

    let first = rotator.add(new_ad.clone()).await.unwrap();
    let second = rotator.add(new_ad).await.unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_add_rejects_invalid_record() {
    let store = Arc::new(MemoryStore::new());
    let mut rotator = build(store.clone(), RecordingSurface::new());

    let result = rotator
        .add(NewAd {
            title: "No image".into(),
            ..NewAd::default()
        })
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(store.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_current_clamps_index() {
    let store = two_ad_store();
    let surface = RecordingSurface::new();
    let mut rotator = build(store.clone(), surface.clone());
    rotator.load().await;
    rotator.next_ad().await;

    assert!(rotator.remove("ad_2").await.unwrap());

    assert_eq!(rotator.current_index(), 0);
    assert!(!store.contains("ad_2").await.unwrap());
    assert_eq!(surface.last().unwrap().ad_id, "ad_1");
}

#[tokio::test]
async fn test_remove_earlier_record_keeps_current_ad() {
    let store = Arc::new(MemoryStore::with_entries([
        ("ad_1", stored_ad("a", 0)),
        ("ad_2", stored_ad("b", 0)),
        ("ad_3", stored_ad("c", 0)),
    ]));
    let mut rotator = build(store, RecordingSurface::new());
    rotator.load().await;
    rotator.next_ad().await;
    rotator.next_ad().await;

    rotator.remove("ad_1").await.unwrap();

    assert_eq!(rotator.current_ad().unwrap().id, "ad_3");
}

#[tokio::test]
async fn test_remove_unknown_id() {
    let mut rotator = build(two_ad_store(), RecordingSurface::new());
    rotator.load().await;

    assert!(!rotator.remove("ad_404").await.unwrap());
    assert_eq!(rotator.ads().len(), 2);
}

#[tokio::test]
async fn test_stats_scans_prefixed_records_only() {
    let store = Arc::new(MemoryStore::with_entries([
        ("ad_1", stored_ad("a", 2)),
        ("ad_2", stored_ad("b", 5)),
        ("ad_3", "{corrupt".to_string()),
        ("theme", r#"{"clicks": 100}"#.to_string()),
    ]));
    let mut rotator = build(store, RecordingSurface::new());
    rotator.load().await;

    let stats = rotator.stats().await.unwrap();

    assert_eq!(
        stats,
        AdStats {
            total_ads: 2,
            total_clicks: 7,
            active_ads_count: 2,
        }
    );
}

#[tokio::test]
async fn test_unreadable_record_does_not_hide_siblings() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = Arc::new(LocalStore::new(tmp.path()));
    store.set("ad_1", &stored_ad("kept", 2)).await.unwrap();
    std::fs::write(tmp.path().join("ad_2.json"), [0xff, 0xfe, 0x00]).unwrap();
    let mut rotator = build(store, RecordingSurface::new());

    rotator.load().await;
    let stats = rotator.stats().await.unwrap();

    assert_eq!(rotator.snapshot().ad_ids, vec!["ad_1"]);
    assert_eq!(stats.total_ads, 1);
    assert_eq!(stats.total_clicks, 2);
}

#[tokio::test]
async fn test_null_clicks_record_is_counted() {
    let store = Arc::new(MemoryStore::with_entries([
        ("ad_1", stored_ad("a", 4)),
        ("ad_2", r#"{"title": "b", "image": "b.jpg", "clicks": null}"#.to_string()),
    ]));
    let mut rotator = build(store, RecordingSurface::new());
    rotator.load().await;

    let stats = rotator.stats().await.unwrap();

    assert_eq!(stats.total_ads, 2);
    assert_eq!(stats.total_clicks, 4);
    assert_eq!(stats.active_ads_count, 2);
}

// --- Task loop ---

#[tokio::test(start_paused = true)]
async fn test_scheduled_ticks_rotate_and_wrap() {
    let surface = RecordingSurface::new();
    let (_events_tx, events_rx) = mpsc::channel(8);
    let (handle, task) = build(two_ad_store(), surface.clone()).spawn(events_rx);

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.ad_ids.len(), 2);
    assert_eq!(snapshot.current_id(), Some("ad_1"));
    assert_eq!(snapshot.state, RotationState::Running);

    tokio::time::advance(TICK).await;
    assert_eq!(handle.snapshot().await.unwrap().current_index, 1);

    tokio::time::advance(TICK).await;
    assert_eq!(handle.snapshot().await.unwrap().current_index, 0);

    assert_eq!(surface.rendered_ids(), vec!["ad_1", "ad_2", "ad_1"]);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_hover_pauses_and_leave_restarts_period() {
    let (events_tx, events_rx) = mpsc::channel(8);
    let (handle, _task) = build(two_ad_store(), RecordingSurface::new()).spawn(events_rx);
    handle.snapshot().await.unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    events_tx.send(DisplayEvent::PointerEnter).await.unwrap();
    let paused = handle.snapshot().await.unwrap();
    assert_eq!(paused.state, RotationState::Paused);

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(handle.snapshot().await.unwrap().current_index, 0);

    events_tx.send(DisplayEvent::PointerLeave).await.unwrap();
    handle.snapshot().await.unwrap();

    // A fresh full period is needed after leaving.
    tokio::time::advance(Duration::from_secs(7)).await;
    assert_eq!(handle.snapshot().await.unwrap().current_index, 0);
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(handle.snapshot().await.unwrap().current_index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_activate_event_records_click() {
    let store = two_ad_store();
    let (events_tx, events_rx) = mpsc::channel(8);
    let (handle, _task) = build(store.clone(), RecordingSurface::new()).spawn(events_rx);
    handle.snapshot().await.unwrap();

    events_tx
        .send(DisplayEvent::Activate {
            ad_id: "ad_1".into(),
        })
        .await
        .unwrap();
    let stats = handle.stats().await.unwrap();

    assert_eq!(stats.total_clicks, 4);
}

#[tokio::test]
async fn test_handle_refresh_picks_up_new_records() {
    let store = two_ad_store();
    let (_events_tx, events_rx) = mpsc::channel(8);
    let (handle, _task) = build(store.clone(), RecordingSurface::new()).spawn(events_rx);
    handle.snapshot().await.unwrap();

    store.set("ad_3", &stored_ad("third", 0)).await.unwrap();
    let outcome = handle.refresh().await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            count: 3,
            fallback: false
        }
    );
    assert_eq!(handle.snapshot().await.unwrap().ad_ids.len(), 3);
}

#[tokio::test]
async fn test_handle_admin_operations() {
    let store = Arc::new(MemoryStore::new());
    let (_events_tx, events_rx) = mpsc::channel(8);
    let (handle, _task) = build(store.clone(), RecordingSurface::new()).spawn(events_rx);

    let id = handle
        .add(NewAd {
            title: "Fresh".into(),
            image: "fresh.jpg".into(),
            ..NewAd::default()
        })
        .await
        .unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.ad_ids, vec![DEFAULT_AD_ID.to_string(), id.clone()]);

    assert!(handle.remove(&id).await.unwrap());
    assert_eq!(handle.stats().await.unwrap().total_ads, 0);
}

#[tokio::test]
async fn test_from_config_prefers_store_over_missing_bundle() {
    let store = two_ad_store();
    let mut config = Config::default();
    config.sources.priority = vec![SourceKind::Store, SourceKind::Bundled];
    config.sources.bundled_path = "does-not-exist.json".into();

    let surface = RecordingSurface::new();
    let mut rotator = AdRotator::from_config(config, store, Box::new(surface.clone())).unwrap();
    rotator.load().await;

    assert_eq!(rotator.snapshot().ad_ids, vec!["ad_1", "ad_2"]);
    assert_eq!(surface.rendered_ids(), vec!["ad_1"]);
}
