use membercrm_core::repo::user_repo::ProfileUpdate;
use membercrm_core::{NewUser, RepoError, Store, StoreConfig, SystemClock, UserRole, UserStatus};
use std::sync::Arc;

fn store() -> Store {
    Store::new(StoreConfig::in_memory(), Arc::new(SystemClock))
}

#[tokio::test]
async fn create_user_normalizes_email_and_hashes_password() {
    let store = store();

    let user = store
        .users()
        .create_user(&NewUser::new("  Ana@Example.COM ", "Sup3r-secret", "Ana"))
        .await
        .unwrap();

    assert_eq!(user.email, "ana@example.com");
    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.status, UserStatus::Active);
    assert_ne!(user.password_hash, "Sup3r-secret");
    assert!(store.users().verify_password(&user, "Sup3r-secret").await);
    assert!(!store.users().verify_password(&user, "wrong").await);
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively_without_write() {
    let store = store();
    store
        .users()
        .create_user(&NewUser::new("ana@example.com", "Sup3r-secret", "Ana"))
        .await
        .unwrap();

    let err = store
        .users()
        .create_user(&NewUser::new("ANA@example.com", "Other-pass1", "Ana Two"))
        .await
        .unwrap_err();

    assert!(matches!(err, RepoError::DuplicateKey { index: "email", .. }));
    assert_eq!(store.users().get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn find_by_email_ignores_case() {
    let store = store();
    let user = store
        .users()
        .create_user(&NewUser::new("ops@example.com", "Sup3r-secret", "Ops").with_role(UserRole::Admin))
        .await
        .unwrap();

    let found = store.users().find_by_email(" OPS@EXAMPLE.com").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert!(store.users().find_by_email("nobody@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn required_fields_are_validated() {
    let store = store();

    for input in [
        NewUser::new("not-an-email", "Sup3r-secret", "Ana"),
        NewUser::new("ana@example.com", "", "Ana"),
        NewUser::new("ana@example.com", "Sup3r-secret", "  "),
    ] {
        let err = store.users().create_user(&input).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)), "{err}");
    }
    assert!(store.users().get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_password_replaces_the_hash() {
    let store = store();
    let user = store
        .users()
        .create_user(&NewUser::new("ana@example.com", "Sup3r-secret", "Ana"))
        .await
        .unwrap();

    let updated = store
        .users()
        .update_password(user.id, "N3w-secret!")
        .await
        .unwrap();

    assert!(store.users().verify_password(&updated, "N3w-secret!").await);
    assert!(!store.users().verify_password(&updated, "Sup3r-secret").await);
}

#[tokio::test]
async fn profile_email_change_must_stay_unique() {
    let store = store();
    let ana = store
        .users()
        .create_user(&NewUser::new("ana@example.com", "Sup3r-secret", "Ana"))
        .await
        .unwrap();
    store
        .users()
        .create_user(&NewUser::new("bo@example.com", "Sup3r-secret", "Bo"))
        .await
        .unwrap();

    let err = store
        .users()
        .update_profile(
            ana.id,
            &ProfileUpdate {
                email: Some("BO@example.com".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::DuplicateKey { .. }));

    let renamed = store
        .users()
        .update_profile(
            ana.id,
            &ProfileUpdate {
                email: Some("Ana@Example.com".to_string()),
                name: Some("Ana Maria".to_string()),
                role: Some(UserRole::Admin),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.email, "ana@example.com");
    assert_eq!(renamed.name, "Ana Maria");
    assert_eq!(renamed.role, UserRole::Admin);
}

#[tokio::test]
async fn active_users_follow_status_changes() {
    let store = store();
    let ana = store
        .users()
        .create_user(&NewUser::new("ana@example.com", "Sup3r-secret", "Ana"))
        .await
        .unwrap();
    store
        .users()
        .create_user(
            &NewUser::new("bo@example.com", "Sup3r-secret", "Bo").with_status(UserStatus::Inactive),
        )
        .await
        .unwrap();

    let active = store.users().get_active_users().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, ana.id);

    store
        .users()
        .update_status(ana.id, UserStatus::Suspended)
        .await
        .unwrap();
    assert!(store.users().get_active_users().await.unwrap().is_empty());
}
