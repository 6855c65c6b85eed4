use membercrm_core::{
    DbError, ExportPayload, ManualClock, MemberType, NewContract, NewMember, NewUser, Store,
    StoreConfig,
};
use serde_json::json;
use std::sync::Arc;

async fn seeded_store(clock: &ManualClock) -> Store {
    let store = Store::new(StoreConfig::in_memory(), Arc::new(clock.clone()));
    let user = store
        .users()
        .create_user(&NewUser::new("ops@example.com", "Sup3r-secret", "Ops"))
        .await
        .unwrap();
    let mut input = NewMember::new("Ana", "555-0100", "A-1", MemberType::Premium);
    input.created_by = Some(user.id);
    let member = store.members().create_member(&input).await.unwrap();
    store
        .contracts()
        .create_contract(&NewContract::new(member.id, "Plan", chrono::Utc::now()))
        .await
        .unwrap();
    store
        .settings()
        .set("locale", json!("pt-BR"), Some(user.id))
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn export_then_import_reproduces_identical_records() {
    let clock = ManualClock::default();
    let source = seeded_store(&clock).await;
    let exported = source.export_all().await.unwrap();

    assert_eq!(exported.len(), 6);
    assert_eq!(exported["users"].len(), 1);
    assert!(exported["relations"].is_empty());

    let json = serde_json::to_string(&exported).unwrap();
    let payload: ExportPayload = serde_json::from_str(&json).unwrap();

    let target = Store::new(StoreConfig::in_memory(), Arc::new(clock.clone()));
    target.import_all(&payload).await.unwrap();

    assert_eq!(target.export_all().await.unwrap(), exported);
    assert_eq!(
        target.users().get_all().await.unwrap(),
        source.users().get_all().await.unwrap()
    );
    let member = target.members().find_by_id_number("a-1").await.unwrap().unwrap();
    assert_eq!(member.name, "Ana");
}

#[tokio::test]
async fn import_replaces_only_the_collections_in_the_payload() {
    let clock = ManualClock::default();
    let store = seeded_store(&clock).await;

    let mut payload = ExportPayload::new();
    payload.insert("settings".to_string(), Vec::new());
    store.import_all(&payload).await.unwrap();

    assert_eq!(store.settings().records().count().await.unwrap(), 0);
    assert_eq!(store.members().records().count().await.unwrap(), 1);
}

#[tokio::test]
async fn unknown_collection_aborts_before_any_write() {
    let clock = ManualClock::default();
    let store = seeded_store(&clock).await;

    let mut payload = ExportPayload::new();
    payload.insert("members".to_string(), Vec::new());
    payload.insert("invoices".to_string(), Vec::new());

    let err = store.import_all(&payload).await.unwrap_err();
    assert!(matches!(err, DbError::UnknownCollection(name) if name == "invoices"));
    assert_eq!(store.members().records().count().await.unwrap(), 1);
}

#[tokio::test]
async fn record_without_id_rolls_back_its_collection() {
    let clock = ManualClock::default();
    let store = seeded_store(&clock).await;

    let mut payload = ExportPayload::new();
    payload.insert(
        "settings".to_string(),
        vec![json!({"key": "orphan", "value": 1})],
    );

    let err = store.import_all(&payload).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidRecord { .. }));
    assert_eq!(
        store.settings().get_value("locale").await.unwrap(),
        Some(json!("pt-BR"))
    );
}
