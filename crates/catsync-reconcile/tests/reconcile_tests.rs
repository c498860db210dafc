//! Reconciler behavior against the in-memory catalog client: convergence,
//! idempotence, annotation-scoped ownership and failure isolation.

use std::collections::HashMap;
use std::sync::Arc;

use catsync_catalog::{
    managed_annotations, AttributeValue, BoundValue, CatalogEntry, CatalogType,
    CatalogTypeAttribute, CatalogTypeSchema, MemoryCatalogClient, ANNOTATION_SYNC_ID,
};
use catsync_output::{DesiredType, EntryModel};
use catsync_reconcile::{
    EntryReconciler, NullReporter, ProgressEvent, RecordingReporter, TypeReconciler,
};

const SYNC_ID: &str = "org/catalog";

fn model(external_id: &str, name: &str) -> EntryModel {
    EntryModel {
        external_id: external_id.to_string(),
        name: name.to_string(),
        rank: 0,
        aliases: vec![],
        attribute_values: HashMap::new(),
    }
}

fn managed_entry(external_id: &str, name: &str) -> CatalogEntry {
    CatalogEntry {
        id: String::new(),
        external_id: external_id.to_string(),
        name: name.to_string(),
        rank: 0,
        aliases: vec![],
        attribute_values: HashMap::new(),
        annotations: managed_annotations(SYNC_ID),
    }
}

fn managed_type(type_name: &str) -> CatalogType {
    CatalogType {
        id: String::new(),
        type_name: type_name.to_string(),
        name: type_name.to_string(),
        description: String::new(),
        schema: CatalogTypeSchema::default(),
        annotations: managed_annotations(SYNC_ID),
    }
}

fn desired_type(type_name: &str) -> DesiredType {
    DesiredType {
        type_name: type_name.to_string(),
        name: type_name.to_string(),
        description: format!("{type_name} entries"),
        attributes: vec![CatalogTypeAttribute {
            id: "description".to_string(),
            name: "Description".to_string(),
            data_type: "string".to_string(),
            array: false,
            required: false,
        }],
    }
}

fn seeded_client() -> (Arc<MemoryCatalogClient>, CatalogType) {
    let client = Arc::new(MemoryCatalogClient::new());
    let mut catalog_type = managed_type("service");
    catalog_type.id = client.seed_type(catalog_type.clone());
    (client, catalog_type)
}

#[tokio::test]
async fn test_entry_reconcile_minimal_plan() {
    let (client, catalog_type) = seeded_client();
    client.seed_entry(&catalog_type.id, managed_entry("1", "old"));
    client.seed_entry(&catalog_type.id, managed_entry("3", "gone"));

    let desired = vec![model("1", "A"), model("2", "B")];
    let outcome = EntryReconciler::new()
        .reconcile(
            client.clone(),
            &catalog_type,
            desired,
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.updated, 1);

    let counts = client.counts();
    assert_eq!(counts.entry_destroys, 1);
    assert_eq!(counts.entry_creates, 1);
    assert_eq!(counts.entry_updates, 1);
}

#[tokio::test]
async fn test_entry_reconcile_converges_remote_set() {
    let (client, catalog_type) = seeded_client();
    client.seed_entry(&catalog_type.id, managed_entry("1", "old"));

    let mut desired = model("1", "Alpha");
    desired.attribute_values.insert(
        "description".to_string(),
        BoundValue::scalar(AttributeValue::string("first")),
    );
    let desired = vec![desired, model("2", "Beta")];

    EntryReconciler::new()
        .reconcile(
            client.clone(),
            &catalog_type,
            desired.clone(),
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();

    let mut remote = client.entries(&catalog_type.id);
    remote.sort_by(|a, b| a.external_id.cmp(&b.external_id));

    assert_eq!(remote.len(), 2);
    for (entry, model) in remote.iter().zip(desired.iter()) {
        assert_eq!(entry.external_id, model.external_id);
        assert_eq!(entry.name, model.name);
        assert_eq!(entry.attribute_values, model.attribute_values);
        assert_eq!(entry.annotations[ANNOTATION_SYNC_ID], SYNC_ID);
    }
}

#[tokio::test]
async fn test_entry_reconcile_is_idempotent() {
    let (client, catalog_type) = seeded_client();
    client.seed_entry(&catalog_type.id, managed_entry("1", "old"));

    let desired = vec![model("1", "A"), model("2", "B")];
    let reconciler = EntryReconciler::new();

    reconciler
        .reconcile(
            client.clone(),
            &catalog_type,
            desired.clone(),
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();
    client.reset_counts();

    let outcome = reconciler
        .reconcile(
            client.clone(),
            &catalog_type,
            desired,
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();

    // Second run must be a no-op.
    assert_eq!(outcome.planned, 0);
    assert_eq!(outcome.unchanged, 2);
    assert_eq!(client.counts().entry_writes(), 0);
}

#[tokio::test]
async fn test_entries_without_our_sync_id_are_untouched() {
    let (client, catalog_type) = seeded_client();
    let mut foreign = managed_entry("theirs", "Theirs");
    foreign.annotations = HashMap::from([(
        ANNOTATION_SYNC_ID.to_string(),
        "someone-else".to_string(),
    )]);
    client.seed_entry(&catalog_type.id, foreign);
    let mut unmanaged = managed_entry("manual", "Manual");
    unmanaged.annotations.clear();
    client.seed_entry(&catalog_type.id, unmanaged);

    let outcome = EntryReconciler::new()
        .reconcile(
            client.clone(),
            &catalog_type,
            vec![],
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();

    assert_eq!(outcome.planned, 0);
    assert_eq!(client.entries(&catalog_type.id).len(), 2);
}

#[tokio::test]
async fn test_per_item_failures_do_not_abort_phase() {
    let (client, catalog_type) = seeded_client();
    client.fail_writes_for("2");

    let desired = vec![model("1", "A"), model("2", "B"), model("3", "C")];
    let outcome = EntryReconciler::new()
        .reconcile(
            client.clone(),
            &catalog_type,
            desired,
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();

    assert_eq!(outcome.created, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].external_id, "2");

    let remote = client.entries(&catalog_type.id);
    assert_eq!(remote.len(), 2);
}

#[tokio::test]
async fn test_reporter_receives_phase_totals() {
    let (client, catalog_type) = seeded_client();
    client.seed_entry(&catalog_type.id, managed_entry("1", "old"));
    client.seed_entry(&catalog_type.id, managed_entry("3", "gone"));

    let reporter = Arc::new(RecordingReporter::new());
    EntryReconciler::new()
        .reconcile(
            client.clone(),
            &catalog_type,
            vec![model("1", "A"), model("2", "B")],
            SYNC_ID,
            reporter.clone(),
        )
        .await
        .unwrap();

    assert_eq!(
        reporter.phase_totals(),
        vec![
            ProgressEvent::DeleteStart(1),
            ProgressEvent::CreateStart(1),
            ProgressEvent::UpdateStart(1),
        ]
    );

    let progress_events = reporter
        .events()
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                ProgressEvent::DeleteProgress
                    | ProgressEvent::CreateProgress
                    | ProgressEvent::UpdateProgress
            )
        })
        .count();
    assert_eq!(progress_events, 3);
}

#[tokio::test]
async fn test_dry_run_issues_no_writes() {
    let (client, catalog_type) = seeded_client();
    client.seed_entry(&catalog_type.id, managed_entry("3", "gone"));

    let outcome = EntryReconciler::new()
        .with_dry_run(true)
        .reconcile(
            client.clone(),
            &catalog_type,
            vec![model("1", "A")],
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();

    assert_eq!(outcome.deleted, 1);
    assert_eq!(outcome.created, 1);
    assert_eq!(client.counts().entry_writes(), 0);
    assert_eq!(client.entries(&catalog_type.id).len(), 1);
}

#[tokio::test]
async fn test_type_reconcile_creates_and_syncs_schema() {
    let client = Arc::new(MemoryCatalogClient::new());

    let outcome = TypeReconciler::new()
        .reconcile(client.clone(), SYNC_ID, &[desired_type("service")], vec![])
        .await;

    assert!(outcome.failures.is_empty());
    let synced = &outcome.types["service"];
    assert_eq!(synced.schema.attributes.len(), 1);
    assert_eq!(synced.annotations[ANNOTATION_SYNC_ID], SYNC_ID);

    // Create, then update + schema update.
    let counts = client.counts();
    assert_eq!(counts.type_creates, 1);
    assert_eq!(counts.type_updates, 1);
    assert_eq!(counts.type_schema_updates, 1);
}

#[tokio::test]
async fn test_type_reconcile_prunes_only_managed_types() {
    let client = Arc::new(MemoryCatalogClient::new());

    // Managed T1 (still desired), managed T2 (abandoned), unmanaged T3.
    client.seed_type(managed_type("t1"));
    client.seed_type(managed_type("t2"));
    let mut unmanaged = managed_type("t3");
    unmanaged.annotations.clear();
    client.seed_type(unmanaged.clone());

    // The orchestrator pre-filters to managed types; pass t1 and t2.
    let existing: Vec<CatalogType> = client
        .types()
        .into_iter()
        .filter(|t| t.type_name != "t3")
        .collect();

    let outcome = TypeReconciler::new()
        .with_prune(true)
        .reconcile(client.clone(), SYNC_ID, &[desired_type("t1")], existing)
        .await;

    assert_eq!(outcome.pruned, vec!["t2".to_string()]);
    let remaining: Vec<String> = client
        .types()
        .into_iter()
        .map(|t| t.type_name)
        .collect();
    assert!(remaining.contains(&"t1".to_string()));
    assert!(remaining.contains(&"t3".to_string()));
    assert!(!remaining.contains(&"t2".to_string()));
}

#[tokio::test]
async fn test_type_reconcile_refuses_to_prune_unmanaged_input() {
    let client = Arc::new(MemoryCatalogClient::new());
    let mut unmanaged = managed_type("manual");
    unmanaged.annotations.clear();
    client.seed_type(unmanaged.clone());

    // Even if a caller wrongly passes an unmanaged type as existing, the
    // reconciler must fail closed and leave it alone.
    let outcome = TypeReconciler::new()
        .with_prune(true)
        .reconcile(client.clone(), SYNC_ID, &[], client.types())
        .await;

    assert!(outcome.pruned.is_empty());
    assert_eq!(client.types().len(), 1);
}

#[tokio::test]
async fn test_type_reconcile_without_prune_keeps_abandoned_types() {
    let client = Arc::new(MemoryCatalogClient::new());
    client.seed_type(managed_type("abandoned"));

    let outcome = TypeReconciler::new()
        .reconcile(client.clone(), SYNC_ID, &[desired_type("service")], client.types())
        .await;

    assert!(outcome.pruned.is_empty());
    assert_eq!(client.types().len(), 2);
    assert!(outcome.types.contains_key("service"));
}

#[tokio::test]
async fn test_submission_order_is_sorted_with_single_worker() {
    let (client, catalog_type) = seeded_client();

    let desired = vec![model("c", "C"), model("a", "A"), model("b", "B")];
    EntryReconciler::new()
        .with_width(1)
        .reconcile(
            client.clone(),
            &catalog_type,
            desired,
            SYNC_ID,
            Arc::new(NullReporter),
        )
        .await
        .unwrap();

    // With one worker, insertion order observed by the server equals
    // submission order, which must be sorted by external id.
    let order: Vec<String> = client
        .entries(&catalog_type.id)
        .into_iter()
        .map(|entry| entry.external_id)
        .collect();
    assert_eq!(order, vec!["a", "b", "c"]);
}
