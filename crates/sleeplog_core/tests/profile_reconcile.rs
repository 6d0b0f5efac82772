use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use serde_json::{json, Value};
use sleeplog_core::db::open_db_in_memory;
use sleeplog_core::repo::kv_repo::{ALL_USERS_KEY, CURRENT_USER_KEY};
use sleeplog_core::{
    AppStateSnapshot, CurrentUserSource, ProfilePatch, ProfileRepository, ProfileService,
    ProfileServiceError, SleepRecord, SqliteKvStore, SqliteProfileRepository, UserProfile,
};

fn long_ago() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

fn alice() -> UserProfile {
    UserProfile {
        id: Some("u-1".to_string()),
        email: Some("alice@example.com".to_string()),
        display_name: Some("A".to_string()),
        avatar_token: Some("🙂".to_string()),
        average_score: Some(82.0),
        updated_at: Some(long_ago()),
        ..UserProfile::default()
    }
}

fn bob() -> UserProfile {
    UserProfile {
        id: Some("u-2".to_string()),
        display_name: Some("B".to_string()),
        ..UserProfile::default()
    }
}

fn seed(conn: &Connection, current: Option<&UserProfile>, users: &[UserProfile]) {
    let repo = SqliteProfileRepository::try_new(conn).unwrap();
    if let Some(current) = current {
        repo.set_current(current).unwrap();
    }
    repo.save_users(users).unwrap();
}

/// Seeds the collection with a valid `alice` and a `u-2` entry whose
/// millisecond `updatedAt` no longer parses.
fn seed_mixed_users(conn: &Connection) -> Value {
    let broken = json!({ "id": "u-2", "displayName": "B", "updatedAt": 1_700_000_000_000u64 });
    let entries = vec![serde_json::to_value(alice()).unwrap(), broken.clone()];
    SqliteKvStore::try_new(conn)
        .unwrap()
        .store_json(ALL_USERS_KEY, &entries)
        .unwrap();
    broken
}

fn raw_users(conn: &Connection) -> Value {
    let raw = SqliteKvStore::try_new(conn)
        .unwrap()
        .get_raw(ALL_USERS_KEY)
        .unwrap()
        .unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn service(conn: &Connection) -> ProfileService<SqliteProfileRepository<'_>> {
    ProfileService::new(SqliteProfileRepository::try_new(conn).unwrap())
}

fn current_slot(conn: &Connection) -> Option<UserProfile> {
    SqliteProfileRepository::try_new(conn)
        .unwrap()
        .get_current()
        .unwrap()
}

#[test]
fn empty_patch_only_moves_updated_at() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[alice()]);

    let updated = service(&conn)
        .update_profile(&ProfilePatch::default(), None)
        .unwrap();

    assert!(updated.updated_at.unwrap() > long_ago());
    let mut expected = alice();
    expected.updated_at = updated.updated_at;
    assert_eq!(updated, expected);
}

#[test]
fn patch_overwrites_named_fields_and_keeps_the_rest() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[alice()]);

    let updated = service(&conn)
        .update_profile(&ProfilePatch::display_name("X"), None)
        .unwrap();

    assert_eq!(updated.display_name.as_deref(), Some("X"));
    assert_eq!(updated.avatar_token.as_deref(), Some("🙂"));
    assert_eq!(updated.average_score, Some(82.0));
    assert!(updated.updated_at.unwrap() > long_ago());
}

#[test]
fn slot_and_collection_hold_the_same_record_after_update() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[bob(), alice()]);

    let updated = service(&conn)
        .update_profile(&ProfilePatch::display_name("X"), None)
        .unwrap();

    let repo = SqliteProfileRepository::try_new(&conn).unwrap();
    assert_eq!(repo.get_current().unwrap(), Some(updated.clone()));
    let users = repo.list_users().unwrap();
    assert_eq!(users, vec![bob(), updated]);
}

#[test]
fn collection_entry_is_found_by_email_when_id_missing() {
    let conn = open_db_in_memory().unwrap();
    let mut stored = alice();
    stored.id = None;
    seed(&conn, Some(&alice()), &[stored]);

    let updated = service(&conn)
        .update_profile(&ProfilePatch::display_name("X"), None)
        .unwrap();

    let repo = SqliteProfileRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_users().unwrap(), vec![updated]);
}

#[test]
fn missing_collection_entry_is_tolerated() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[bob()]);

    let updated = service(&conn)
        .update_profile(&ProfilePatch::display_name("X"), None)
        .unwrap();

    assert_eq!(current_slot(&conn), Some(updated));
    let repo = SqliteProfileRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_users().unwrap(), vec![bob()]);
}

#[test]
fn snapshot_user_heals_empty_slot() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, None, &[alice()]);
    let snapshot = AppStateSnapshot::with_user(alice());

    let svc = service(&conn);
    assert_eq!(
        svc.current_profile(Some(&snapshot)).map(|(_, source)| source),
        Some(CurrentUserSource::Snapshot)
    );

    let updated = svc
        .update_profile(&ProfilePatch::display_name("X"), Some(&snapshot))
        .unwrap();

    let mut expected = alice();
    expected.display_name = Some("X".to_string());
    expected.updated_at = updated.updated_at;
    assert_eq!(updated, expected);
    assert_eq!(current_slot(&conn), Some(updated));
    assert_eq!(
        svc.current_profile(None).map(|(_, source)| source),
        Some(CurrentUserSource::Slot)
    );
}

#[test]
fn slot_wins_over_snapshot_when_both_present() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[]);
    let snapshot = AppStateSnapshot::with_user(bob());

    let updated = service(&conn)
        .update_profile(&ProfilePatch::default(), Some(&snapshot))
        .unwrap();
    assert_eq!(updated.id.as_deref(), Some("u-1"));
}

#[test]
fn malformed_slot_falls_back_to_snapshot() {
    let conn = open_db_in_memory().unwrap();
    SqliteKvStore::try_new(&conn)
        .unwrap()
        .put_raw(CURRENT_USER_KEY, "not json")
        .unwrap();
    let snapshot = AppStateSnapshot::with_user(bob());

    let updated = service(&conn)
        .update_profile(&ProfilePatch::default(), Some(&snapshot))
        .unwrap();
    assert_eq!(updated.id.as_deref(), Some("u-2"));
    assert_eq!(current_slot(&conn), Some(updated));
}

#[test]
fn no_user_anywhere_is_no_active_user() {
    let conn = open_db_in_memory().unwrap();

    let svc = service(&conn);
    let err = svc
        .update_profile(&ProfilePatch::display_name("X"), None)
        .unwrap_err();
    assert!(matches!(err, ProfileServiceError::NoActiveUser));
    assert!(err.user_message().contains("sign in again"));

    let empty_snapshot = AppStateSnapshot::default();
    let err = svc
        .update_profile(&ProfilePatch::default(), Some(&empty_snapshot))
        .unwrap_err();
    assert!(matches!(err, ProfileServiceError::NoActiveUser));
    assert_eq!(current_slot(&conn), None);
}

#[test]
fn snapshot_parsed_from_app_state_json() {
    let conn = open_db_in_memory().unwrap();
    let snapshot: AppStateSnapshot = serde_json::from_value(json!({
        "auth": { "user": { "id": 7, "displayName": "Night Owl", "theme": "dark" } },
        "ui": { "tab": "home" }
    }))
    .unwrap();

    let updated = service(&conn)
        .update_profile(&ProfilePatch::default(), Some(&snapshot))
        .unwrap();
    assert_eq!(updated.id.as_deref(), Some("7"));
    assert_eq!(updated.extra.get("theme"), Some(&json!("dark")));
}

#[test]
fn unknown_patch_fields_are_merged_verbatim() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[alice()]);
    let patch: ProfilePatch =
        serde_json::from_value(json!({ "bedtimeGoal": "23:00", "displayName": "Y" })).unwrap();

    let updated = service(&conn).update_profile(&patch, None).unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Y"));
    assert_eq!(updated.extra.get("bedtimeGoal"), Some(&json!("23:00")));
    assert_eq!(current_slot(&conn), Some(updated));
}

#[test]
fn slot_write_failure_is_a_storage_error() {
    let conn = open_db_in_memory().unwrap();
    let svc = service(&conn);
    conn.execute_batch("DROP TABLE kv_store;").unwrap();

    let snapshot = AppStateSnapshot::with_user(alice());
    let err = svc
        .update_profile(&ProfilePatch::default(), Some(&snapshot))
        .unwrap_err();
    assert!(matches!(err, ProfileServiceError::Storage(_)));
}

#[test]
fn adopt_then_sign_out() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, None, &[bob()]);
    let svc = service(&conn);

    svc.adopt_user(&alice()).unwrap();
    svc.adopt_user(&alice()).unwrap();
    let repo = SqliteProfileRepository::try_new(&conn).unwrap();
    assert_eq!(repo.get_current().unwrap(), Some(alice()));
    assert_eq!(repo.list_users().unwrap(), vec![bob(), alice()]);

    svc.sign_out().unwrap();
    assert_eq!(repo.get_current().unwrap(), None);
    assert_eq!(repo.list_users().unwrap().len(), 2);
}

#[test]
fn refresh_sleep_stats_writes_averages() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[alice()]);
    let records = vec![
        SleepRecord::new(
            6 * 3600,
            "",
            Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap(),
        ),
        SleepRecord::new(
            8 * 3600,
            "",
            Utc.with_ymd_and_hms(2024, 3, 5, 7, 0, 0).unwrap(),
        ),
    ];

    let updated = service(&conn)
        .refresh_sleep_stats(&records, None)
        .unwrap();
    assert_eq!(updated.total_days, Some(2));
    assert_eq!(updated.average_sleep_hours, Some(7.0));
    assert_eq!(updated.display_name.as_deref(), Some("A"));
}

#[test]
fn sequential_edits_are_last_write_wins() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn, Some(&alice()), &[alice()]);
    let first = service(&conn);
    let second = service(&conn);

    first
        .update_profile(&ProfilePatch::display_name("first"), None)
        .unwrap();
    let last = second
        .update_profile(&ProfilePatch::display_name("second"), None)
        .unwrap();

    assert_eq!(current_slot(&conn), Some(last));
}

#[test]
fn adopt_keeps_unparseable_collection_entries() {
    let conn = open_db_in_memory().unwrap();
    let broken = seed_mixed_users(&conn);
    let carol = UserProfile {
        id: Some("u-3".to_string()),
        ..UserProfile::default()
    };

    service(&conn).adopt_user(&carol).unwrap();

    let raw = raw_users(&conn);
    assert_eq!(raw.as_array().map(Vec::len), Some(3));
    assert_eq!(raw[0], serde_json::to_value(alice()).unwrap());
    assert_eq!(raw[1], broken);
    let repo = SqliteProfileRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_users().unwrap(), vec![alice(), carol]);
}

#[test]
fn update_replaces_only_the_matching_entry_in_a_mixed_collection() {
    let conn = open_db_in_memory().unwrap();
    let broken = seed_mixed_users(&conn);
    SqliteProfileRepository::try_new(&conn)
        .unwrap()
        .set_current(&alice())
        .unwrap();

    let updated = service(&conn)
        .update_profile(&ProfilePatch::display_name("X"), None)
        .unwrap();

    let raw = raw_users(&conn);
    assert_eq!(raw.as_array().map(Vec::len), Some(2));
    assert_eq!(raw[0], serde_json::to_value(&updated).unwrap());
    assert_eq!(raw[1], broken);
}

#[test]
fn update_replaces_the_users_own_unparseable_entry() {
    let conn = open_db_in_memory().unwrap();
    seed_mixed_users(&conn);
    SqliteProfileRepository::try_new(&conn)
        .unwrap()
        .set_current(&bob())
        .unwrap();

    let updated = service(&conn)
        .update_profile(&ProfilePatch::display_name("Bee"), None)
        .unwrap();

    let repo = SqliteProfileRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_users().unwrap(), vec![alice(), updated]);
}

#[test]
fn non_array_collection_is_never_overwritten() {
    let conn = open_db_in_memory().unwrap();
    let kv = SqliteKvStore::try_new(&conn).unwrap();
    kv.put_raw(ALL_USERS_KEY, r#"{"u-1":{}}"#).unwrap();
    SqliteProfileRepository::try_new(&conn)
        .unwrap()
        .set_current(&alice())
        .unwrap();
    let svc = service(&conn);

    let updated = svc
        .update_profile(&ProfilePatch::display_name("X"), None)
        .unwrap();
    assert_eq!(current_slot(&conn), Some(updated));

    let err = svc.adopt_user(&bob()).unwrap_err();
    assert!(matches!(err, ProfileServiceError::Storage(_)));
    assert_eq!(
        kv.get_raw(ALL_USERS_KEY).unwrap().as_deref(),
        Some(r#"{"u-1":{}}"#)
    );
}

#[test]
fn find_by_identity_skips_unparseable_entries() {
    let conn = open_db_in_memory().unwrap();
    seed_mixed_users(&conn);
    let repo = SqliteProfileRepository::try_new(&conn).unwrap();

    let by_email = UserProfile {
        email: Some("alice@example.com".to_string()),
        ..UserProfile::default()
    };
    assert_eq!(repo.find_by_identity(&by_email).unwrap(), Some(alice()));
    assert_eq!(repo.find_by_identity(&bob()).unwrap(), None);
}
