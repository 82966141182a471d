#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{at, item, Harness, Item, Note, Tally};
use quarry_core::errors::ExErrorKind;
use quarry_core::{col, QuerySpec, Row, Value};
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

#[tokio::test]
async fn test_items_scenario() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let apples = repo.insert(item("Apples", 6)).await.unwrap();
    assert_ne!(apples.id, 0);
    assert_eq!(repo.count(&QuerySpec::new()).await.unwrap(), 1);

    assert_eq!(repo.delete(apples.id).await.unwrap(), 1);
    assert_eq!(repo.count(&QuerySpec::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_insert_then_find() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let original = item("Pears", 3);
    let inserted = repo.insert(original.clone()).await.unwrap();
    let found = repo.find(inserted.id).await.unwrap().expect("row exists");

    assert_eq!(found, Item { id: inserted.id, ..original });
}

#[tokio::test]
async fn test_find_missing_is_none() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    assert_eq!(repo.find(404).await.unwrap(), None);
}

#[tokio::test]
async fn test_update_zero_rows_is_success() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let ghost = Item { id: 77, ..item("Ghost", 1) };
    assert_eq!(repo.update(&ghost).await.unwrap(), 0);

    let err = repo.update_existing(&ghost).await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert!(err.request_id().is_some());
}

#[tokio::test]
async fn test_update_changes_fields_not_identity() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let mut plums = repo.insert(item("Plums", 2)).await.unwrap();
    plums.quantity = 9;
    assert_eq!(repo.update(&plums).await.unwrap(), 1);
    assert_eq!(repo.find(plums.id).await.unwrap(), Some(plums));
}

#[tokio::test]
async fn test_save_inserts_then_updates() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let mut kiwi = repo.save(item("Kiwi", 1)).await.unwrap();
    assert_ne!(kiwi.id, 0);

    kiwi.quantity = 5;
    let kiwi = repo.save(kiwi).await.unwrap();
    assert_eq!(repo.count(&QuerySpec::new()).await.unwrap(), 1);
    assert_eq!(repo.find(kiwi.id).await.unwrap().unwrap().quantity, 5);

    // manual identity that does not exist yet is inserted as given
    let manual = repo.save(Item { id: 500, ..item("Figs", 4) }).await.unwrap();
    assert_eq!(manual.id, 500);
    assert!(repo.find(500).await.unwrap().is_some());
}

#[tokio::test]
async fn test_create_table_is_idempotent() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    repo.insert(item("Limes", 1)).await.unwrap();

    repo.create_table().await.unwrap();
    assert_eq!(repo.count(&QuerySpec::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_drop_table_then_query_fails_with_malformed_sql() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    repo.drop_table().await.unwrap();
    repo.drop_table().await.unwrap();

    let err = repo.all().await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MalformedSql);
    assert_eq!(err.op(), Some("find_all"));
    assert!(err.statement().is_some());
}

#[tokio::test]
async fn test_ordering_breaks_ties_by_declared_order() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let mut rows = vec![
        Item { created_at: at(100), ..item("b", 1) },
        Item { created_at: at(200), ..item("z", 1) },
        Item { created_at: at(200), ..item("a", 1) },
        Item { created_at: at(100), ..item("a2", 1) },
    ];
    rows = repo.insert_all(rows).await.unwrap();
    assert!(rows.iter().all(|r| r.id != 0));

    let spec = QuerySpec::new().order_desc("created_at").order_asc("name");
    let names: Vec<String> = repo
        .find_all(&spec)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["a", "z", "a2", "b"]);
}

#[tokio::test]
async fn test_predicates_use_field_names() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    repo.insert_all(vec![item("one", 1), item("two", 2), item("three", 3)])
        .await
        .unwrap();

    // `quantity` is stored in column `qty`
    let spec = QuerySpec::matching(col("quantity").ge(2)).order_asc("quantity");
    let found = repo.find_all(&spec).await.unwrap();
    assert_eq!(found.iter().map(|i| i.quantity).collect::<Vec<_>>(), vec![2, 3]);

    let first = repo.find_first(&spec).await.unwrap().unwrap();
    assert_eq!(first.name, "two");
    assert_eq!(repo.find_by(&spec).await.unwrap(), Some(first));

    assert!(repo.exists(&QuerySpec::matching(col("name").eq("three"))).await.unwrap());
    assert!(!repo.exists(&QuerySpec::matching(col("name").eq("four"))).await.unwrap());

    let paged = QuerySpec::new().order_asc("quantity").limit(1).offset(1);
    assert_eq!(repo.count(&paged).await.unwrap(), 1);
    assert_eq!(repo.find_all(&paged).await.unwrap()[0].name, "two");
}

#[tokio::test]
async fn test_empty_in_list_fails_without_touching_storage() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    let empty: Vec<i64> = Vec::new();
    let err = repo
        .find_all(&QuerySpec::matching(col("id").is_in(empty)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidOperation);
}

#[tokio::test]
async fn test_insert_all_rolls_back_on_failure() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let err = repo
        .insert_all(vec![item("dup", 1), item("fresh", 1), item("dup", 2)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::DuplicateEntry);
    assert_eq!(repo.count(&QuerySpec::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_where_and_update_where() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    repo.insert_all(vec![item("a", 1), item("b", 5), item("c", 10)])
        .await
        .unwrap();

    let mut assignments = Row::new();
    assignments.insert("quantity", Value::Integer(0));
    assignments.insert("id", Value::Integer(999));
    let updated = repo
        .update_where(&QuerySpec::matching(col("quantity").lt(6)), assignments)
        .await
        .unwrap();
    assert_eq!(updated, 2);
    assert!(repo.find(999).await.unwrap().is_none());

    let removed = repo
        .delete_where(&QuerySpec::matching(col("quantity").eq(0)))
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(repo.delete_all().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_where_rejects_unknown_field() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    let mut assignments = Row::new();
    assignments.insert("colour", Value::Text("red".into()));
    let err = repo
        .update_where(&QuerySpec::new(), assignments)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidData);
}

#[tokio::test]
async fn test_undecodable_row_fails_whole_call() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    repo.insert(item("ok", 1)).await.unwrap();
    harness
        .executor
        .run(|engine| {
            engine.execute(
                "INSERT INTO \"items\" (\"name\", \"qty\", \"created_at\") VALUES ('bad', 'lots', 0)",
                &[],
            )
        })
        .await
        .unwrap();

    let err = repo.all().await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::TypeMismatch);
    assert_eq!(err.column(), Some("qty"));
}

#[tokio::test]
async fn test_text_identity_must_be_assigned() {
    let harness = Harness::in_memory();
    let notes = harness.repository::<Note>();
    notes.create_table().await.unwrap();

    let err = notes
        .insert(Note {
            key: Uuid::nil(),
            body: "x".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidOperation);

    let key = Uuid::new_v4();
    let note = notes
        .insert(Note {
            key,
            body: "hello".into(),
        })
        .await
        .unwrap();
    assert_eq!(note.key, key);
    assert_eq!(notes.find(key).await.unwrap(), Some(note));
}

#[tokio::test]
async fn test_mutations_notify_after_commit() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    let mut rx = harness.notifier.publisher(repo.table());

    let pears = repo.insert(item("Pears", 1)).await.unwrap();
    assert!(rx.try_recv().is_ok());

    repo.delete(pears.id).await.unwrap();
    assert!(rx.try_recv().is_ok());

    // reads never signal
    repo.all().await.unwrap();
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_failed_mutation_does_not_notify() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;
    repo.insert(item("solo", 1)).await.unwrap();
    let mut rx = harness.notifier.publisher(repo.table());

    assert!(repo.insert(item("solo", 2)).await.is_err());
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_identity_overflow_rolls_back_insert() {
    let harness = Harness::in_memory();
    let tallies = harness.repository::<Tally>();
    tallies.create_table().await.unwrap();
    tallies
        .insert(Tally {
            id: i32::MAX,
            label: "last".into(),
        })
        .await
        .unwrap();
    let mut rx = harness.notifier.publisher(tallies.table());

    // next row id is i32::MAX + 1
    let err = tallies
        .insert(Tally {
            id: 0,
            label: "one too many".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidData);

    assert_eq!(tallies.count(&QuerySpec::new()).await.unwrap(), 1);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_concurrent_inserts_are_serialized() {
    let harness = Harness::in_memory();
    let repo = harness.items().await;

    let tasks: Vec<_> = (0..25)
        .map(|n| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.insert(item(&format!("item-{n}"), n)).await })
        })
        .collect();
    let results = futures::future::join_all(tasks).await;

    let mut ids: Vec<i64> = results.into_iter().map(|r| r.unwrap().unwrap().id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 25);
    assert_eq!(repo.count(&QuerySpec::new()).await.unwrap(), 25);
}
