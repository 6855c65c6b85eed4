use chrono::Duration;
use membercrm_core::{
    member_state, Clock, ManualClock, MemberPatch, MemberState, MemberStatus, MemberType,
    NewMember, RepoError, Store, StoreConfig,
};
use std::sync::Arc;

fn store_with_clock() -> (Store, ManualClock) {
    let clock = ManualClock::default();
    let store = Store::new(StoreConfig::in_memory(), Arc::new(clock.clone()));
    (store, clock)
}

#[tokio::test]
async fn create_member_normalizes_id_number_and_defaults_to_active() {
    let (store, _clock) = store_with_clock();

    let member = store
        .members()
        .create_member(&NewMember::new(" Ana ", "555-0100", " ab-123 ", MemberType::Premium))
        .await
        .unwrap();

    assert_eq!(member.id_number, "AB-123");
    assert_eq!(member.name, "Ana");
    assert_eq!(member.status, MemberStatus::Active);

    let found = store.members().find_by_id_number("ab-123").await.unwrap();
    assert_eq!(found.map(|m| m.id), Some(member.id));
}

#[tokio::test]
async fn duplicate_id_number_is_rejected_case_insensitively() {
    let (store, _clock) = store_with_clock();
    store
        .members()
        .create_member(&NewMember::new("Ana", "1", "AB-123", MemberType::Regular))
        .await
        .unwrap();

    let err = store
        .members()
        .create_member(&NewMember::new("Bo", "2", "ab-123", MemberType::Regular))
        .await
        .unwrap_err();

    assert!(matches!(err, RepoError::DuplicateKey { index: "idNumber", .. }));
    assert_eq!(store.members().get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_member_keeps_own_id_number_and_rejects_taken_ones() {
    let (store, _clock) = store_with_clock();
    let ana = store
        .members()
        .create_member(&NewMember::new("Ana", "1", "A-1", MemberType::Regular))
        .await
        .unwrap();
    store
        .members()
        .create_member(&NewMember::new("Bo", "2", "B-2", MemberType::Regular))
        .await
        .unwrap();

    let same = store
        .members()
        .update_member(
            ana.id,
            &MemberPatch {
                id_number: Some("a-1".to_string()),
                notes: Some("renewed".to_string()),
                ..MemberPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(same.id_number, "A-1");
    assert_eq!(same.notes, "renewed");

    let err = store
        .members()
        .update_member(
            ana.id,
            &MemberPatch {
                id_number: Some("b-2".to_string()),
                ..MemberPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey { .. }));
}

#[tokio::test]
async fn type_and_status_lookups_use_indices() {
    let (store, _clock) = store_with_clock();
    let ana = store
        .members()
        .create_member(&NewMember::new("Ana", "1", "A-1", MemberType::Premium))
        .await
        .unwrap();
    let mut pending = NewMember::new("Bo", "2", "B-2", MemberType::Regular);
    pending.status = Some(MemberStatus::Pending);
    store.members().create_member(&pending).await.unwrap();

    let premium = store.members().find_by_type(MemberType::Premium).await.unwrap();
    assert_eq!(premium.len(), 1);
    assert_eq!(premium[0].id, ana.id);

    store
        .members()
        .update_type(ana.id, MemberType::Corporate)
        .await
        .unwrap();
    assert!(store
        .members()
        .find_by_type(MemberType::Premium)
        .await
        .unwrap()
        .is_empty());

    let pending = store.members().find_by_status(MemberStatus::Pending).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].name, "Bo");
}

#[tokio::test]
async fn expiring_and_expired_scans_use_the_store_clock() {
    let (store, clock) = store_with_clock();
    let now = clock.now();
    let members = store.members();

    let soon = members
        .create_member(&NewMember::new("Soon", "1", "S-1", MemberType::Regular))
        .await
        .unwrap();
    members
        .update_expiry_date(soon.id, Some(now + Duration::days(10)))
        .await
        .unwrap();
    let later = members
        .create_member(&NewMember::new("Later", "2", "L-2", MemberType::Regular))
        .await
        .unwrap();
    members
        .update_expiry_date(later.id, Some(now + Duration::days(90)))
        .await
        .unwrap();
    let past = members
        .create_member(&NewMember::new("Past", "3", "P-3", MemberType::Regular))
        .await
        .unwrap();
    members
        .update_expiry_date(past.id, Some(now - Duration::days(1)))
        .await
        .unwrap();
    members
        .create_member(&NewMember::new("Open", "4", "O-4", MemberType::Regular))
        .await
        .unwrap();

    let expiring: Vec<_> = members
        .get_expiring_members(30)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(expiring, vec![soon.id]);

    let expired: Vec<_> = members
        .get_expired_members()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(expired, vec![past.id]);

    clock.advance(Duration::days(11));
    let expired = members.get_expired_members().await.unwrap();
    assert_eq!(expired.len(), 2);
}

#[tokio::test]
async fn huge_expiry_windows_clamp_instead_of_overflowing() {
    let (store, clock) = store_with_clock();
    let now = clock.now();
    let members = store.members();

    let far = members
        .create_member(&NewMember::new("Far", "1", "F-1", MemberType::Regular))
        .await
        .unwrap();
    members
        .update_expiry_date(far.id, Some(now + Duration::days(3650)))
        .await
        .unwrap();
    let past = members
        .create_member(&NewMember::new("Past", "2", "P-2", MemberType::Regular))
        .await
        .unwrap();
    members
        .update_expiry_date(past.id, Some(now - Duration::days(1)))
        .await
        .unwrap();

    for days in [1_000_000_000, i64::MAX] {
        let expiring = members.get_expiring_members(days).await.unwrap();
        assert_eq!(expiring.iter().map(|m| m.id).collect::<Vec<_>>(), vec![far.id]);
    }
    assert!(members.get_expiring_members(i64::MIN).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_member_trims_name_and_phone() {
    let (store, _clock) = store_with_clock();
    let ana = store
        .members()
        .create_member(&NewMember::new("Ana", "1", "A-1", MemberType::Regular))
        .await
        .unwrap();

    let updated = store
        .members()
        .update_member(
            ana.id,
            &MemberPatch {
                name: Some("  Ana Maria ".to_string()),
                phone: Some(" 555-0199 ".to_string()),
                ..MemberPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Ana Maria");
    assert_eq!(updated.phone, "555-0199");

    let err = store
        .members()
        .update_member(
            ana.id,
            &MemberPatch {
                name: Some("   ".to_string()),
                ..MemberPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[tokio::test]
async fn clearing_expiry_turns_active_member_into_enabled() {
    let (store, clock) = store_with_clock();
    let member = store
        .members()
        .create_member(&NewMember::new("Ana", "1", "A-1", MemberType::Regular))
        .await
        .unwrap();
    let member = store
        .members()
        .update_expiry_date(member.id, Some(clock.now() + Duration::days(5)))
        .await
        .unwrap();
    assert_eq!(member_state(&member, clock.now()), MemberState::Active);

    clock.advance(Duration::days(6));
    assert_eq!(member_state(&member, clock.now()), MemberState::Disabled);

    let member = store
        .members()
        .update_expiry_date(member.id, None)
        .await
        .unwrap();
    assert!(member.expiry_date.is_none());
    assert_eq!(member_state(&member, clock.now()), MemberState::Enabled);
}

#[tokio::test]
async fn search_matches_name_id_number_and_phone() {
    let (store, _clock) = store_with_clock();
    for (name, phone, id_number) in [
        ("Ana Lima", "555-0100", "A-1"),
        ("Bo Chen", "555-0200", "B-2"),
        ("Cy Lima", "777-0300", "C-3"),
    ] {
        store
            .members()
            .create_member(&NewMember::new(name, phone, id_number, MemberType::Regular))
            .await
            .unwrap();
    }

    assert_eq!(store.members().search_members("LIMA").await.unwrap().len(), 2);
    assert_eq!(store.members().search_members("b-2").await.unwrap().len(), 1);
    assert_eq!(store.members().search_members("777").await.unwrap().len(), 1);
    assert_eq!(store.members().search_members("  ").await.unwrap().len(), 3);
}
