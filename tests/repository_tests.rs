//! Query catalog behavior against an in-memory database.

use thomas::db::repositories::user::UserInsert;
use thomas::db::{Store, UserRepository};
use thomas::domain::{AccountStatus, DuplicateKey};

async fn store_with_users(users: &[(&str, &str, Option<&str>)]) -> Store {
    let store = Store::new("sqlite::memory:").await.unwrap();
    let repo = UserRepository::new(&store.conn);
    for (username, email, surname) in users {
        repo.insert(&UserInsert {
            username,
            given_name: "Given",
            surname: *surname,
            email,
            ssh_key: "ssh-ed25519 AAAA",
            status: AccountStatus::Pending,
        })
        .await
        .unwrap();
    }
    store
}

#[tokio::test]
async fn last_mmm_ignores_institutional_usernames() {
    let store = store_with_users(&[
        ("mmm0002", "a@x.edu", None),
        ("mmm0010", "b@x.edu", None),
        ("zzzzzzz", "c@ucl.ac.uk", None),
    ])
    .await;

    let last = UserRepository::new(&store.conn)
        .last_mmm_username(&[])
        .await
        .unwrap();
    assert_eq!(last.as_deref(), Some("mmm0010"));
}

#[tokio::test]
async fn last_mmm_is_none_for_empty_table() {
    let store = store_with_users(&[]).await;
    let last = UserRepository::new(&store.conn)
        .last_mmm_username(&[])
        .await
        .unwrap();
    assert_eq!(last, None);
}

#[tokio::test]
async fn find_by_matches_exact_field() {
    let store = store_with_users(&[
        ("mmm0001", "same@x.edu", None),
        ("mmm0002", "same@x.edu", None),
        ("mmm0003", "other@x.edu", None),
    ])
    .await;
    let repo = UserRepository::new(&store.conn);

    assert_eq!(repo.find_by(DuplicateKey::Email, "same@x.edu").await.unwrap().len(), 2);
    assert_eq!(repo.find_by(DuplicateKey::Username, "mmm0003").await.unwrap().len(), 1);
    assert!(repo.find_by(DuplicateKey::Email, "same").await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_username_insert_fails() {
    let store = store_with_users(&[("mmm0001", "a@x.edu", None)]).await;

    let result = UserRepository::new(&store.conn)
        .insert(&UserInsert {
            username: "mmm0001",
            given_name: "Other",
            surname: None,
            email: "b@x.edu",
            ssh_key: "ssh-ed25519 BBBB",
            status: AccountStatus::Pending,
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn whois_matches_partially_and_skips_null_surnames_only_when_asked() {
    let store = store_with_users(&[
        ("mmm0001", "alice@inst.edu", Some("Smith")),
        ("mmm0002", "bob@inst.edu", None),
    ])
    .await;
    let repo = UserRepository::new(&store.conn);

    assert_eq!(repo.whois("", "inst.edu", "", "").await.unwrap().len(), 2);
    let smiths = repo.whois("", "", "", "mit").await.unwrap();
    assert_eq!(smiths.len(), 1);
    assert_eq!(smiths[0].username, "mmm0001");
    assert_eq!(repo.whois("0002", "", "", "").await.unwrap()[0].email, "bob@inst.edu");
}

#[tokio::test]
async fn status_update_stamps_modification_date() {
    let store = store_with_users(&[("mmm0001", "a@x.edu", None)]).await;
    let repo = UserRepository::new(&store.conn);

    assert_eq!(repo.set_status("mmm0001", AccountStatus::Active).await.unwrap(), 1);
    let user = repo.get("mmm0001").await.unwrap().unwrap();
    assert_eq!(user.status, "active");
    assert!(user.modification_date.is_some());
    assert_eq!(repo.set_status("mmm9999", AccountStatus::Active).await.unwrap(), 0);
}
