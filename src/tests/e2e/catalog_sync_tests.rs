use crate::modules::catalog::adapters::outbound::catalog_source::SourceError;
use crate::modules::catalog::core::cursor::{CursorState, SyncMode};
use crate::modules::catalog::core::entity::EntityType;
use crate::modules::catalog::core::rows::{NormalizedRow, composite_key};
use crate::modules::catalog::core::sku::Sku;
use crate::modules::catalog::core::summary::{FailureKind, RunStatus, SyncSummary};
use crate::modules::catalog::use_cases::run_catalog_sync::command::RunCatalogSync;
use crate::modules::catalog::use_cases::run_catalog_sync::errors::SyncError;
use crate::shared::core::primitives::{Money, Reported};
use crate::tests::fixtures::app::{InMemoryApp, in_memory_app};
use crate::tests::fixtures::records::{
    category_record, inventory_record, item_record, location_record, touched, variation_record,
    vendor_info_record,
};
use chrono::Utc;
use rstest::{fixture, rstest};
use serde_json::json;
use std::time::Duration;

#[fixture]
async fn before_each() -> InMemoryApp {
    let app = in_memory_app();
    let source = &app.source;
    source
        .set_records(EntityType::Locations, vec![location_record("LOC-1", "Main")])
        .await;
    source
        .set_records(EntityType::Categories, vec![category_record("CAT-1", "Snacks")])
        .await;
    source
        .set_records(
            EntityType::Items,
            vec![
                item_record("A123", "Trail Mix", Some("CAT-1")),
                item_record("B456", "Granola", Some("CAT-1")),
                item_record("C789", "Dried Mango", None),
            ],
        )
        .await;
    source
        .set_records(
            EntityType::Variations,
            vec![
                variation_record("VAR-A", "A123", 1000, Some("A1B2C3D")),
                variation_record("VAR-B", "B456", 500, Some("TM-RED")),
            ],
        )
        .await;
    source
        .set_records(
            EntityType::Inventory,
            vec![inventory_record("VAR-A", "LOC-1", "4")],
        )
        .await;
    source
        .set_records(
            EntityType::VendorInfo,
            vec![vendor_info_record("VVI-1", "VAR-A", "VEN-1", Some(350))],
        )
        .await;
    app
}

async fn run(app: &InMemoryApp, command: RunCatalogSync) -> Result<SyncSummary, SyncError> {
    app.state.sync_runner.run(command).await
}

#[rstest]
#[tokio::test]
async fn it_should_converge_to_the_same_state_when_rerun(#[future] before_each: InMemoryApp) {
    let app = before_each.await;

    let first = run(&app, RunCatalogSync::full()).await.unwrap();
    assert_eq!(first.status, RunStatus::Succeeded);
    assert_eq!(first.total_writes().inserted, 9);
    let after_first = app.store.snapshot().await;

    let second = run(&app, RunCatalogSync::full()).await.unwrap();
    let writes = second.total_writes();
    assert_eq!(writes.inserted, 0);
    assert_eq!(writes.updated, 0);
    assert_eq!(writes.unchanged, 9);
    assert_eq!(second.total_archived(), 0);
    assert_eq!(app.store.snapshot().await, after_first);
}

#[rstest]
#[tokio::test]
async fn it_should_only_fetch_changes_after_the_first_run(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    run(&app, RunCatalogSync::full()).await.unwrap();

    app.source
        .set_records(
            EntityType::Variations,
            vec![
                touched(variation_record("VAR-A", "A123", 1250, Some("A1B2C3D")), Utc::now()),
                variation_record("VAR-B", "B456", 500, Some("TM-RED")),
            ],
        )
        .await;

    let summary = run(&app, RunCatalogSync::incremental()).await.unwrap();
    let items = summary.entity(EntityType::Items).unwrap();
    assert_eq!(items.mode, SyncMode::Incremental);
    assert_eq!(items.fetched, 0);
    let variations = summary.entity(EntityType::Variations).unwrap();
    assert_eq!(variations.fetched, 1);
    assert_eq!(variations.writes.updated, 1);
    assert_eq!(summary.entity(EntityType::Locations).unwrap().mode, SyncMode::Full);

    assert_eq!(app.store.rows(EntityType::Variations).await.len(), 2);
    match app.store.get(EntityType::Variations, "VAR-A").await {
        Some(NormalizedRow::Variation(v)) => {
            assert_eq!(v.price, Reported::Known(Money::new(1250, "USD")))
        }
        other => panic!("expected variation, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn it_should_archive_an_item_deleted_upstream(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    run(&app, RunCatalogSync::full()).await.unwrap();

    let mut deleted = item_record("B456", "Granola", Some("CAT-1"));
    deleted["is_deleted"] = json!(true);
    app.source
        .set_records(
            EntityType::Items,
            vec![
                item_record("A123", "Trail Mix", Some("CAT-1")),
                touched(deleted, Utc::now()),
                item_record("C789", "Dried Mango", None),
            ],
        )
        .await;

    let summary = run(&app, RunCatalogSync::incremental()).await.unwrap();
    assert_eq!(summary.entity(EntityType::Items).unwrap().writes.updated, 1);
    let b456 = app.store.get(EntityType::Items, "B456").await.unwrap();
    assert!(b456.is_archived());
    assert!(!app.store.get(EntityType::Items, "A123").await.unwrap().is_archived());
}

#[rstest]
#[tokio::test]
async fn it_should_archive_rows_a_full_run_no_longer_sees(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    run(&app, RunCatalogSync::full()).await.unwrap();

    app.source
        .set_records(
            EntityType::Items,
            vec![
                item_record("A123", "Trail Mix", Some("CAT-1")),
                item_record("C789", "Dried Mango", None),
            ],
        )
        .await;

    let summary = run(&app, RunCatalogSync::full()).await.unwrap();
    assert_eq!(summary.entity(EntityType::Items).unwrap().archived, 1);
    assert!(app.store.get(EntityType::Items, "B456").await.unwrap().is_archived());
    assert_eq!(app.store.rows(EntityType::Items).await.len(), 3);
}

#[rstest]
#[tokio::test]
async fn it_should_not_archive_rows_it_could_not_read(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    run(&app, RunCatalogSync::full()).await.unwrap();

    let mut unreadable_item = item_record("B456", "Granola", Some("CAT-1"));
    unreadable_item["item_data"] = json!("not an object");
    let mut unreadable_variation = variation_record("VAR-B", "B456", 500, Some("TM-RED"));
    unreadable_variation["item_variation_data"]["price_money"]["amount"] = json!("five dollars");
    app.source
        .set_records(
            EntityType::Items,
            vec![
                item_record("A123", "Trail Mix", Some("CAT-1")),
                unreadable_item,
                item_record("C789", "Dried Mango", None),
            ],
        )
        .await;
    app.source
        .set_records(
            EntityType::Variations,
            vec![
                variation_record("VAR-A", "A123", 1000, Some("A1B2C3D")),
                unreadable_variation,
            ],
        )
        .await;

    let summary = run(&app, RunCatalogSync::full()).await.unwrap();
    assert_eq!(summary.status, RunStatus::Succeeded);
    for entity in [EntityType::Items, EntityType::Variations] {
        let stage = summary.entity(entity).unwrap();
        assert_eq!(stage.skipped, 1, "{entity} skipped");
        assert_eq!(stage.archived, 0, "{entity} archived");
    }
    assert!(!app.store.get(EntityType::Items, "B456").await.unwrap().is_archived());
    assert!(!app.store.get(EntityType::Variations, "VAR-B").await.unwrap().is_archived());
}

#[rstest]
#[tokio::test]
async fn it_should_recover_from_a_failed_page_on_rerun(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    // locations, categories, items page 1, then items page 2 fails
    app.store.fail_on_page_call(4);

    let failed = run(&app, RunCatalogSync::full()).await.unwrap();
    assert_eq!(failed.status, RunStatus::Failed);
    assert!(!failed.cursor_advanced);
    let failure = failed.failure.clone().unwrap();
    assert_eq!(failure.kind, FailureKind::UpsertFailed);
    assert_eq!(failure.entity, Some(EntityType::Items));
    assert_eq!(failure.page, Some(2));
    assert_eq!(failure.resume_page_token.as_deref(), Some("2"));
    assert_eq!(app.store.rows(EntityType::Items).await.len(), 2);
    assert!(app.store.rows(EntityType::Variations).await.is_empty());
    assert_eq!(app.sync_state.cursor(EntityType::Items).await, CursorState::Fresh);

    let rerun = run(&app, RunCatalogSync::full()).await.unwrap();
    assert_eq!(rerun.status, RunStatus::Succeeded);
    let items = rerun.entity(EntityType::Items).unwrap();
    assert_eq!(items.writes.unchanged, 2);
    assert_eq!(items.writes.inserted, 1);
    assert_eq!(app.store.rows(EntityType::Items).await.len(), 3);
    assert_eq!(app.store.rows(EntityType::Variations).await.len(), 2);
    assert!(matches!(
        app.sync_state.cursor(EntityType::Items).await,
        CursorState::Primed(_)
    ));
}

#[rstest]
#[tokio::test]
async fn it_should_refuse_a_second_concurrent_run(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    app.source.set_delay_ms(20);

    let (first, second) = tokio::join!(
        run(&app, RunCatalogSync::full()),
        run(&app, RunCatalogSync::full().only(&[EntityType::Items])),
    );

    let summary = first.unwrap();
    assert_eq!(summary.status, RunStatus::Succeeded);
    match second {
        Err(SyncError::SyncAlreadyRunning { entity, run_id }) => {
            assert_eq!(entity, EntityType::Items);
            assert_eq!(run_id, summary.run_id);
        }
        other => panic!("expected SyncAlreadyRunning, got {other:?}"),
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn it_should_wait_out_a_rate_limit_and_finish(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    app.source
        .fail_page(
            EntityType::Items,
            None,
            SourceError::RateLimited {
                retry_after: Some(Duration::from_secs(7)),
            },
            1,
        )
        .await;

    let started = tokio::time::Instant::now();
    let summary = run(&app, RunCatalogSync::full()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(7));
    assert_eq!(summary.status, RunStatus::Succeeded);
    assert_eq!(app.source.requests_for(EntityType::Items).await.len(), 3);
}

#[rstest]
#[tokio::test]
async fn it_should_count_rows_whose_parent_is_unknown(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    app.source
        .set_records(
            EntityType::Variations,
            vec![
                variation_record("VAR-A", "A123", 1000, Some("A1B2C3D")),
                variation_record("VAR-Z", "GHOST", 900, None),
            ],
        )
        .await;
    app.source
        .set_records(
            EntityType::Inventory,
            vec![
                inventory_record("VAR-A", "LOC-1", "4"),
                inventory_record("VAR-Z", "LOC-1", "2.5"),
            ],
        )
        .await;

    let summary = run(&app, RunCatalogSync::full()).await.unwrap();
    assert_eq!(summary.status, RunStatus::Succeeded);
    assert_eq!(summary.entity(EntityType::Variations).unwrap().writes.orphaned, 1);
    assert_eq!(summary.entity(EntityType::Inventory).unwrap().writes.orphaned, 1);
    assert!(app.store.get(EntityType::Variations, "VAR-Z").await.is_none());
    assert!(
        app.store
            .get(EntityType::Inventory, &composite_key("VAR-A", "LOC-1"))
            .await
            .is_some()
    );
}

#[rstest]
#[tokio::test]
async fn it_should_tell_generated_skus_from_assigned_ones(#[future] before_each: InMemoryApp) {
    let app = before_each.await;
    run(&app, RunCatalogSync::full().only(&[EntityType::Items, EntityType::Variations]))
        .await
        .unwrap();

    let sku_of = |row: Option<NormalizedRow>| match row {
        Some(NormalizedRow::Variation(v)) => v.sku,
        other => panic!("expected variation, got {other:?}"),
    };
    assert_eq!(
        sku_of(app.store.get(EntityType::Variations, "VAR-A").await),
        Sku::Generated("A1B2C3D".into())
    );
    assert_eq!(
        sku_of(app.store.get(EntityType::Variations, "VAR-B").await),
        Sku::Assigned("TM-RED".into())
    );
}
