//! Listing view behaviour against a real store.

mod common;

use std::sync::Arc;

use common::{admin_session, titles, Harness, UnreachableStore, RELAY_TIMEOUT};
use snwacademy::views::listing::{FETCH_ERROR_MESSAGE, SHOW_ALL_LABEL, SHOW_LESS_LABEL};
use snwacademy::{FormationForm, FormationStore, FormationsCache, ListingView, LoadState};

#[tokio::test]
async fn test_preview_then_show_all() {
    let harness = Harness::new();
    harness.seed(&["A", "B", "C", "D"]).await;

    let mut view = ListingView::mount(&harness.cache, 3).await;
    assert_eq!(view.state(), LoadState::Ready);
    assert_eq!(titles(&view.visible()), ["A", "B", "C"]);
    assert!(view.has_toggle());
    assert!(view.render().into_string().contains(SHOW_ALL_LABEL));

    assert!(view.toggle_show_all());
    assert_eq!(titles(&view.visible()), ["A", "B", "C", "D"]);
    assert!(view.render().into_string().contains(SHOW_LESS_LABEL));

    assert!(!view.toggle_show_all());
    assert_eq!(view.visible().len(), 3);
}

#[tokio::test]
async fn test_no_toggle_at_or_below_preview_count() {
    let harness = Harness::new();
    harness.seed(&["A", "B", "C"]).await;

    let mut view = ListingView::mount(&harness.cache, 3).await;
    assert!(!view.has_toggle());
    assert!(!view.toggle_show_all());
    assert_eq!(titles(&view.visible()), ["A", "B", "C"]);

    let html = view.render().into_string();
    assert!(!html.contains(SHOW_ALL_LABEL));
    assert!(!html.contains("<button"));
}

#[tokio::test]
async fn test_empty_catalog() {
    let harness = Harness::new();
    let view = ListingView::mount(&harness.cache, 3).await;

    assert_eq!(view.state(), LoadState::Ready);
    assert!(view.formations().is_empty());
    assert!(view
        .render()
        .into_string()
        .contains(snwacademy::views::listing::EMPTY_MESSAGE));
}

#[tokio::test]
async fn test_refetches_after_insert() {
    let harness = Harness::new();
    harness.seed(&["A", "B", "C"]).await;
    let mut view = ListingView::mount(&harness.cache, 3).await;
    assert!(!view.has_toggle());

    harness.seed(&["D"]).await;
    tokio::time::timeout(RELAY_TIMEOUT, view.changed())
        .await
        .expect("listing was not refreshed");

    assert_eq!(titles(&view.formations()), ["A", "B", "C", "D"]);
    assert!(view.has_toggle());
}

#[tokio::test]
async fn test_refetches_after_delete() {
    let harness = Harness::new();
    let rows = harness.seed(&["A", "B"]).await;
    let mut view = ListingView::mount(&harness.cache, 3).await;

    let session = admin_session(&harness.guard).await;
    harness.store.delete(&session, &rows[0].id).await.unwrap();
    tokio::time::timeout(RELAY_TIMEOUT, view.changed())
        .await
        .expect("listing was not refreshed");

    assert_eq!(titles(&view.formations()), ["B"]);
    assert!(view.formations().iter().all(|f| f.id != rows[0].id));
}

#[tokio::test]
async fn test_fetch_failure_renders_static_message() {
    let cache = FormationsCache::new(Arc::new(UnreachableStore::new()));
    let view = ListingView::mount(&cache, 3).await;

    assert_eq!(view.state(), LoadState::Failed);
    assert!(view.formations().is_empty());
    assert!(!view.has_toggle());
    assert!(view.error().unwrap().contains("connection refused"));

    let html = view.render().into_string();
    assert!(html.contains(FETCH_ERROR_MESSAGE));
    assert!(!html.contains("connection refused"));
}

#[tokio::test]
async fn test_dropped_view_releases_subscription() {
    let harness = Harness::new();
    let view = ListingView::mount(&harness.cache, 3).await;
    assert_eq!(harness.cache.attached(), 1);
    assert_eq!(harness.store.feed().subscriber_count(), 1);

    drop(view);
    assert_eq!(harness.cache.attached(), 0);
    assert!(!harness.cache.relay_running());

    // Nothing refreshes the cache once no view is attached.
    harness.seed(&["A"]).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(harness.cache.catalog().items().is_empty());
}

#[tokio::test]
async fn test_views_share_one_store_subscription() {
    let harness = Harness::new();
    let first = ListingView::mount(&harness.cache, 3).await;
    let second = ListingView::mount(&harness.cache, 3).await;
    let footer = snwacademy::FooterLinksView::mount(&harness.cache).await;

    assert_eq!(harness.cache.attached(), 3);
    assert_eq!(harness.store.feed().subscriber_count(), 1);

    drop((first, second, footer));
    assert_eq!(harness.cache.attached(), 0);
}

#[tokio::test]
async fn test_stats_strip_shows_present_fields_only() {
    let harness = Harness::new();
    let session = admin_session(&harness.guard).await;
    let form = FormationForm {
        duration: "12".to_string(),
        students: "  ".to_string(),
        ..FormationForm::new("Aide-Soignant", "Soins de base")
    };
    harness
        .store
        .insert(&session, form.validate().unwrap())
        .await
        .unwrap();

    let view = ListingView::mount(&harness.cache, 3).await;
    let html = view.render().into_string();
    assert!(html.contains("12 mois"));
    assert!(!html.contains("places"));
    assert!(!html.contains(" modules<"));
}
