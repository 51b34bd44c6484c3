//! Acquisition pipeline integration tests

mod helpers;

use helpers::{track, tracks, FakeCatalog, FakePreviews};
use spinback_common::api::{resolve_player_name, TrackCatalog};
use spinback_common::events::{EventBus, SpinbackEvent};
use spinback_common::models::UserProfile;
use spinback_common::TimeRange;
use spinback_gq::pipeline::{initial_batch_size, pool_ceiling, EnhanceThrottle, QUICK_ENHANCE_COUNT};
use spinback_gq::services::PreviewLookup;
use spinback_gq::{AcquisitionPipeline, TrackPool};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn throttle() -> EnhanceThrottle {
    EnhanceThrottle {
        batch_size: 2,
        batch_delay: Duration::from_millis(5),
    }
}

fn pipeline(
    catalog: Arc<FakeCatalog>,
    previews: Arc<FakePreviews>,
    events: EventBus,
) -> AcquisitionPipeline {
    AcquisitionPipeline::new(
        catalog,
        previews,
        TrackPool::new(pool_ceiling()),
        events,
        throttle(),
    )
}

#[tokio::test]
async fn prepare_loads_quarter_and_enhances_first_three() {
    let medium = tracks("m", 10, false);
    let catalog = Arc::new(FakeCatalog::default().with_range(TimeRange::MediumTerm, medium.clone()));
    let previews = Arc::new(FakePreviews::for_tracks(&medium));
    let p = pipeline(catalog.clone(), previews.clone(), EventBus::default());

    let playable = p.prepare().await;

    assert_eq!(catalog.requests(), vec![(TimeRange::MediumTerm, 7)]);
    assert_eq!(p.pool().len().await, initial_batch_size());
    assert_eq!(playable, QUICK_ENHANCE_COUNT);
    assert_eq!(previews.calls(), QUICK_ENHANCE_COUNT);
    assert_eq!(previews.warm_calls.load(Ordering::SeqCst), 1);
    assert!(p.pool().is_startable().await);

    let snapshot = p.pool().snapshot().await;
    assert!(snapshot[..3].iter().all(|t| t.has_preview()));
    assert!(snapshot[3..].iter().all(|t| !t.has_preview()));
}

#[tokio::test]
async fn quick_enhancement_skips_tracks_with_previews() {
    let mut medium = tracks("m", 3, false);
    medium[1].preview_url = Some("http://catalog/m1".to_string());
    let catalog = Arc::new(FakeCatalog::default().with_range(TimeRange::MediumTerm, medium.clone()));
    let previews = Arc::new(FakePreviews::for_tracks(&medium));
    let p = pipeline(catalog, previews.clone(), EventBus::default());

    p.prepare().await;

    assert_eq!(previews.calls(), 2);
    let snapshot = p.pool().snapshot().await;
    assert_eq!(snapshot[1].preview_url.as_deref(), Some("http://catalog/m1"));
}

#[tokio::test]
async fn background_batch_splits_ranges_and_dedups_first_seen() {
    let medium = tracks("m", 7, true);
    let mut short = vec![track("m0", "Remastered", "Other", Some("http://other"))];
    short.extend(tracks("s", 9, true));
    let long = tracks("l", 9, true);

    let catalog = Arc::new(
        FakeCatalog::default()
            .with_range(TimeRange::MediumTerm, medium)
            .with_range(TimeRange::ShortTerm, short)
            .with_range(TimeRange::LongTerm, long),
    );
    let p = pipeline(catalog.clone(), Arc::new(FakePreviews::default()), EventBus::default());

    p.load_initial_batch().await;
    let added = p.load_background_batch(17).await;

    let requests = catalog.requests();
    assert!(requests.contains(&(TimeRange::ShortTerm, 9)));
    assert!(requests.contains(&(TimeRange::LongTerm, 8)));

    // 9 short (one duplicate of m0) + 8 long
    assert_eq!(added, 16);
    let snapshot = p.pool().snapshot().await;
    assert_eq!(snapshot.len(), 23);
    let m0: Vec<_> = snapshot.iter().filter(|t| t.id == "m0").collect();
    assert_eq!(m0.len(), 1);
    assert_eq!(m0[0].name, "Title m0");
}

#[tokio::test]
async fn merge_is_capped_at_ceiling() {
    let catalog = Arc::new(
        FakeCatalog::default()
            .with_range(TimeRange::ShortTerm, tracks("s", 40, true))
            .with_range(TimeRange::LongTerm, tracks("l", 40, true)),
    );
    let p = pipeline(catalog, Arc::new(FakePreviews::default()), EventBus::default());

    p.load_background_batch(60).await;

    assert_eq!(p.pool().len().await, pool_ceiling());
}

#[tokio::test]
async fn catalog_failures_degrade_to_fewer_tracks() {
    let catalog = Arc::new(
        FakeCatalog::default()
            .failing(TimeRange::MediumTerm)
            .failing(TimeRange::LongTerm)
            .with_range(TimeRange::ShortTerm, tracks("s", 5, true)),
    );
    let p = pipeline(catalog, Arc::new(FakePreviews::default()), EventBus::default());

    assert_eq!(p.prepare().await, 0);
    assert!(p.pool().is_empty().await);

    let added = p.load_background_batch(10).await;
    assert_eq!(added, 5);
}

#[tokio::test]
async fn enhance_remaining_fills_by_id_and_tolerates_failures() {
    let medium = tracks("m", 7, false);
    let catalog = Arc::new(FakeCatalog::default().with_range(TimeRange::MediumTerm, medium.clone()));
    let mut previews = FakePreviews::for_tracks(&medium);
    previews.failing_titles.insert("Title m5".to_string());
    previews.urls.remove("Title m6");
    let previews = Arc::new(previews);
    let p = pipeline(catalog, previews.clone(), EventBus::default());

    p.load_initial_batch().await;
    p.enhance_remaining().await;

    let snapshot = p.pool().snapshot().await;
    assert!(snapshot[..3].iter().all(|t| !t.has_preview()));
    for t in &snapshot[3..5] {
        assert_eq!(t.preview_url, Some(format!("http://found/{}", t.id)));
    }
    assert!(!snapshot[5].has_preview());
    assert!(!snapshot[6].has_preview());

    // Chunks of two: [m3, m4] resolve in one batch; [m5, m6] fails at m5 and
    // is retried per track
    assert_eq!(previews.batch_calls.load(Ordering::SeqCst), 2);
    assert_eq!(previews.calls(), 5);
}

#[tokio::test]
async fn enhance_remaining_uses_batch_lookups() {
    let medium = tracks("m", 7, false);
    let catalog = Arc::new(FakeCatalog::default().with_range(TimeRange::MediumTerm, medium.clone()));
    let previews = Arc::new(FakePreviews::for_tracks(&medium));
    let p = pipeline(catalog, previews.clone(), EventBus::default());

    p.load_initial_batch().await;
    p.enhance_remaining().await;

    // Four tracks past the quick head, two per batch
    assert_eq!(previews.batch_calls.load(Ordering::SeqCst), 2);
    assert_eq!(previews.calls(), 4);
    assert_eq!(p.pool().playable_count().await, 4);
}

#[test]
fn pipeline_futures_are_send() {
    fn assert_send<T: Send>(_: T) {}

    let catalog = Arc::new(FakeCatalog::default());
    let p = Arc::new(pipeline(catalog, Arc::new(FakePreviews::default()), EventBus::default()));
    assert_send(p.prepare());
    assert_send(p.enhance_remaining());
    assert_send(p.load_background_batch(4));
}

#[tokio::test]
async fn closed_pool_stops_enhancement() {
    let medium = tracks("m", 7, false);
    let catalog = Arc::new(FakeCatalog::default().with_range(TimeRange::MediumTerm, medium.clone()));
    let previews = Arc::new(FakePreviews::for_tracks(&medium));
    let p = pipeline(catalog, previews.clone(), EventBus::default());

    p.load_initial_batch().await;
    p.pool().close().await;
    p.enhance_remaining().await;

    assert_eq!(previews.calls(), 0);
    assert_eq!(p.pool().playable_count().await, 0);
}

#[tokio::test]
async fn background_run_fills_pool_and_reports_progress() {
    let medium = tracks("m", 10, false);
    let short = tracks("s", 20, false);
    let long = tracks("l", 20, false);
    let mut all = medium.clone();
    all.extend(short.clone());
    all.extend(long.clone());

    let catalog = Arc::new(
        FakeCatalog::default()
            .with_range(TimeRange::MediumTerm, medium)
            .with_range(TimeRange::ShortTerm, short)
            .with_range(TimeRange::LongTerm, long),
    );
    let events = EventBus::default();
    let mut rx = events.subscribe();
    let p = Arc::new(pipeline(catalog, Arc::new(FakePreviews::for_tracks(&all)), events));

    p.prepare().await;
    Arc::clone(&p).spawn_background().await.unwrap();

    assert_eq!(p.pool().len().await, pool_ceiling());
    assert_eq!(p.pool().playable_count().await, pool_ceiling());

    let mut last = None;
    while let Ok(event) = rx.try_recv() {
        if let SpinbackEvent::PoolUpdated { total, playable, .. } = event {
            last = Some((total, playable));
        }
    }
    assert_eq!(last, Some((pool_ceiling(), pool_ceiling())));
}

#[tokio::test]
async fn warm_failure_is_not_fatal() {
    let medium = tracks("m", 3, true);
    let catalog = Arc::new(FakeCatalog::default().with_range(TimeRange::MediumTerm, medium));
    let previews = Arc::new(FakePreviews {
        warm_fails: true,
        ..Default::default()
    });
    assert!(previews.warm().await.is_err());

    let p = pipeline(catalog, previews, EventBus::default());
    assert_eq!(p.prepare().await, 3);
}

#[tokio::test]
async fn player_name_from_profile_or_fallback() {
    let with_profile = FakeCatalog {
        profile: Some(UserProfile {
            id: "user-1".to_string(),
            display_name: Some("Dana".to_string()),
        }),
        ..Default::default()
    };
    assert_eq!(resolve_player_name(&with_profile, "Player").await, "Dana");

    let anonymous = FakeCatalog::default();
    assert!(anonymous.current_user().await.is_err());
    assert_eq!(resolve_player_name(&anonymous, "Player").await, "Player");
}
