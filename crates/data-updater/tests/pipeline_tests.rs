//! End-to-end processing of staged files over in-memory backends

mod common;

use common::*;
use data_updater::config::StorageLayout;
use data_updater::table::memory::{MemoryTableRegistry, RegistryCall};
use data_updater::table::Item;
use data_updater::Outcome;
use data_updater_common::error::CodecError;
use data_updater_common::UpdaterError;
use std::time::Duration;

const PRICES_TABLE: &str = "data_updater_prices";

fn batch_sizes(calls: &[RegistryCall]) -> Vec<usize> {
    calls
        .iter()
        .filter_map(|c| match c {
            RegistryCall::BatchWrite { items, .. } => Some(*items),
            _ => None,
        })
        .collect()
}

fn count(calls: &[RegistryCall], pred: impl Fn(&RegistryCall) -> bool) -> usize {
    calls.iter().filter(|c| pred(c)).count()
}

#[tokio::test]
async fn test_non_csv_file_touches_nothing() {
    let env = TestEnvironment::new();
    let object = env.stage("report.TXT", "not;a;csv");

    let outcome = env.updater().process(&object).await.unwrap();

    assert_eq!(outcome, Outcome::Skipped);
    assert!(env.store.calls().is_empty());
    assert!(env.table_calls().is_empty());
}

#[tokio::test]
async fn test_unknown_file_is_archived_without_table_operations() {
    let env = TestEnvironment::new();
    let object = env.stage("orders.csv", "order_id;total\no-1;10");

    let outcome = env.updater().process(&object).await.unwrap();

    let archive_key = "orders/2024/03/01/09/05/orders.csv";
    assert_eq!(
        outcome,
        Outcome::Archived {
            destination: archive_key.to_string()
        }
    );
    assert!(env.table_calls().is_empty());
    assert_eq!(
        env.relocations(),
        vec![(FINAL_BUCKET.to_string(), archive_key.to_string())]
    );
    assert_eq!(env.final_object(archive_key).as_deref(), Some("order_id;total\no-1;10"));
    assert!(env.store.keys(STAGE_BUCKET).is_empty());
}

#[tokio::test]
async fn test_new_table_is_created_and_bulk_loaded() {
    let env = TestEnvironment::new();
    let content = prices_file(3);
    let object = env.stage("prices.csv", &content);

    let outcome = env.updater().process(&object).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Loaded {
            table: PRICES_TABLE.to_string(),
            rows: 3,
            destination: "prices.csv".to_string(),
        }
    );

    assert_eq!(
        env.table_calls(),
        vec![
            RegistryCall::ListTables,
            RegistryCall::CreateTable {
                table: PRICES_TABLE.to_string(),
                key_attribute: "product_id".to_string(),
            },
            RegistryCall::WaitUntilQueryable {
                table: PRICES_TABLE.to_string(),
            },
            RegistryCall::BatchWrite {
                table: PRICES_TABLE.to_string(),
                items: 3,
            },
        ]
    );

    let items = env.registry.items(PRICES_TABLE);
    assert_eq!(items.len(), 3);
    assert_eq!(items[1].get("name").map(String::as_str), Some("item 1"));
    assert_eq!(items[1].get("price").map(String::as_str), Some("2.99"));

    assert_eq!(
        env.relocations(),
        vec![(FINAL_BUCKET.to_string(), "prices.csv".to_string())]
    );
    assert_eq!(env.final_object("prices.csv"), Some(content));
    assert!(env.store.keys(STAGE_BUCKET).is_empty());
}

#[tokio::test]
async fn test_existing_table_is_updated_exported_and_archived() {
    let registry = MemoryTableRegistry::new().with_table(PRICES_TABLE, "product_id");
    let previous: Item = [
        ("product_id", "p-100"),
        ("name", "legacy"),
        ("price", "0.50"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    registry.seed_item(PRICES_TABLE, previous);

    let env = TestEnvironment::with_registry(registry);
    let object = env.stage("prices.csv", &prices_file(4));

    let outcome = env.updater().process(&object).await.unwrap();

    let archive_key = "prices/2024/03/01/09/05/prices.csv";
    assert_eq!(
        outcome,
        Outcome::Updated {
            table: PRICES_TABLE.to_string(),
            rows: 4,
            destination: archive_key.to_string(),
            exported: true,
        }
    );

    let calls = env.table_calls();
    assert_eq!(count(&calls, |c| matches!(c, RegistryCall::UpdateItem { .. })), 4);
    assert_eq!(count(&calls, |c| matches!(c, RegistryCall::CreateTable { .. })), 0);
    assert!(batch_sizes(&calls).is_empty());
    assert_eq!(count(&calls, |c| matches!(c, RegistryCall::Scan { .. })), 1);

    assert_eq!(
        env.final_object("prices.csv").as_deref(),
        Some(
            "product_id;name;price\n\
             p-000;item 0;1.99\n\
             p-001;item 1;2.99\n\
             p-002;item 2;3.99\n\
             p-003;item 3;4.99\n\
             p-100;legacy;0.50"
        )
    );
    assert_eq!(
        env.relocations(),
        vec![(FINAL_BUCKET.to_string(), archive_key.to_string())]
    );
    assert_eq!(env.final_object(archive_key), Some(prices_file(4)));
}

#[tokio::test]
async fn test_update_without_export() {
    let registry = MemoryTableRegistry::new().with_table(PRICES_TABLE, "product_id");
    let mut env = TestEnvironment::with_registry(registry);
    env.config.export_on_update = false;
    let object = env.stage("prices.csv", &prices_file(2));

    let outcome = env.updater().process(&object).await.unwrap();

    assert!(matches!(outcome, Outcome::Updated { exported: false, .. }));
    assert_eq!(count(&env.table_calls(), |c| matches!(c, RegistryCall::Scan { .. })), 0);
    assert_eq!(env.final_object("prices.csv"), None);
}

#[tokio::test]
async fn test_bulk_load_is_chunked() {
    let env = TestEnvironment::new().chunk_size(25);
    let object = env.stage("prices.csv", &prices_file(60));

    env.updater().process(&object).await.unwrap();

    assert_eq!(batch_sizes(&env.table_calls()), vec![25, 25, 10]);
    assert_eq!(env.registry.items(PRICES_TABLE).len(), 60);
}

#[tokio::test]
async fn test_short_row_fails_before_any_table_write() {
    let env = TestEnvironment::new();
    let object = env.stage(
        "prices.csv",
        "product_id;name;price\np-1;one;1.00\np-2;two\np-3;three;3.00",
    );

    let err = env.updater().process(&object).await.unwrap_err();

    assert!(matches!(
        err,
        UpdaterError::Codec(CodecError::RowTooShort {
            line: 3,
            expected: 3,
            actual: 2
        })
    ));
    assert_eq!(env.table_calls(), vec![RegistryCall::ListTables]);
    assert!(env.relocations().is_empty());
    assert_eq!(env.store.keys(STAGE_BUCKET), vec!["prices.csv".to_string()]);
}

#[tokio::test]
async fn test_blank_line_fails_before_any_table_write() {
    let env = TestEnvironment::new();
    let object = env.stage(
        "prices.csv",
        "product_id;name;price\np-1;one;1.00\n\np-2;two;2.00\n",
    );

    let err = env.updater().process(&object).await.unwrap_err();

    assert!(matches!(
        err,
        UpdaterError::Codec(CodecError::RowTooShort {
            line: 3,
            expected: 3,
            actual: 1
        })
    ));
    assert_eq!(env.table_calls(), vec![RegistryCall::ListTables]);
    assert!(env.relocations().is_empty());
}

#[tokio::test]
async fn test_unknown_key_column_fails_before_create() {
    let env = TestEnvironment::new();
    let object = env.stage("prices.csv", "sku;name;price\np-1;one;1.00");

    let err = env.updater().process(&object).await.unwrap_err();

    assert!(matches!(
        err,
        UpdaterError::Codec(CodecError::UnknownColumn(ref column)) if column == "product_id"
    ));
    assert!(env.table_writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_table_wait_is_bounded() {
    let mut env = TestEnvironment::with_registry(MemoryTableRegistry::new().never_queryable());
    env.config.table_wait_timeout_secs = 60;
    let object = env.stage("prices.csv", &prices_file(2));

    let err = env.updater().process(&object).await.unwrap_err();

    match err {
        UpdaterError::TableWaitTimeout { table, waited } => {
            assert_eq!(table, PRICES_TABLE);
            assert_eq!(waited, Duration::from_secs(60));
        },
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(batch_sizes(&env.table_calls()).is_empty());
    assert!(env.relocations().is_empty());
}

#[tokio::test]
async fn test_failed_batch_stops_before_relocation() {
    let env = TestEnvironment::with_registry(MemoryTableRegistry::new().fail_batch_at(1))
        .chunk_size(10);
    let object = env.stage("prices.csv", &prices_file(25));

    let err = env.updater().process(&object).await.unwrap_err();

    assert!(matches!(
        err,
        UpdaterError::BulkLoad {
            written: 10,
            failed: 15,
            ..
        }
    ));
    assert_eq!(env.registry.items(PRICES_TABLE).len(), 10);
    assert!(env.relocations().is_empty());
    assert_eq!(env.store.keys(STAGE_BUCKET), vec!["prices.csv".to_string()]);
}

#[tokio::test]
async fn test_composite_key_record_layout() {
    let env = TestEnvironment::new().layout(StorageLayout::Record);
    let object = env.stage(
        "stock.csv",
        "product_id;warehouse;qty;updated\np-1;north;12;2024-02-28\np-1;south;4;2024-02-29",
    );

    let outcome = env.updater().process(&object).await.unwrap();

    assert!(matches!(outcome, Outcome::Loaded { rows: 2, .. }));
    assert!(env.table_calls().contains(&RegistryCall::CreateTable {
        table: "data_updater_stock".to_string(),
        key_attribute: "warehouse;product_id".to_string(),
    }));

    let items = env.registry.items("data_updater_stock");
    assert_eq!(items.len(), 2);
    assert_eq!(
        items[0].get("warehouse;product_id").map(String::as_str),
        Some("north;p-1")
    );
    assert_eq!(
        items[0].get("record_value").map(String::as_str),
        Some("12;2024-02-28")
    );
}

#[tokio::test]
async fn test_missing_rules_document_is_a_config_fetch_error() {
    let env = TestEnvironment::new();
    let object = env.stage("prices.csv", &prices_file(1));

    let mut broken = env.config.clone();
    broken.config_file_name = "missing.json".to_string();
    let updater = data_updater::DataUpdater::new(broken, env.store.clone(), env.registry.clone());

    let err = updater.process(&object).await.unwrap_err();

    assert!(matches!(err, UpdaterError::ConfigFetch { ref key, .. } if key == "missing.json"));
    assert!(env.table_calls().is_empty());
}
