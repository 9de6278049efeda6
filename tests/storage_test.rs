//! Integration tests for SQLite storage layer
//!
//! Tests record round-trips and index lookups on in-memory databases, and
//! schema upgrades and lazy opening on temporary database files.

use std::path::Path;

use survey_collector::config::DatabaseConfig;
use survey_collector::error::StorageError;
use survey_collector::forms::{Answer, AnswerSet};
use survey_collector::storage::{
    Collection, NewRegistration, NewResponse, SqliteStorage, Storage, StoreHandle,
    LATEST_SCHEMA_VERSION,
};

/// Create an in-memory storage instance for testing
async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

fn file_config(path: &Path, schema_version: i64) -> DatabaseConfig {
    DatabaseConfig {
        path: path.to_path_buf(),
        max_connections: 2,
        schema_version,
    }
}

fn answers(pairs: &[(&str, Answer)]) -> AnswerSet {
    pairs.iter().cloned().collect()
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get_all_responses() {
        let storage = create_test_storage().await;

        let set = answers(&[
            ("q1", Answer::text("hello")),
            ("q2", Answer::text("X")),
            ("q3", Answer::Number(3)),
            ("q4", Answer::selections(["a", "b"])),
        ]);
        let stored = storage
            .put_response(NewResponse::new("survey-A", set.clone()))
            .await
            .unwrap();

        let all = storage.get_all_responses().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], stored);
        assert_eq!(all[0].answers, set);
        assert!(all[0].completed);
    }

    #[tokio::test]
    async fn test_responses_keep_insertion_order() {
        let storage = create_test_storage().await;

        let mut ids = Vec::new();
        for survey in ["b", "a", "c", "a"] {
            let record = storage
                .put_response(NewResponse::new(survey, AnswerSet::new()))
                .await
                .unwrap();
            ids.push(record.id);
        }

        let stored: Vec<String> = storage
            .get_all_responses()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(stored, ids);
    }

    #[tokio::test]
    async fn test_index_lookup_by_survey() {
        let storage = create_test_storage().await;
        for survey in ["survey-A", "survey-B", "survey-A"] {
            storage
                .put_response(NewResponse::new(survey, AnswerSet::new()))
                .await
                .unwrap();
        }

        let a = storage.get_responses_by_survey("survey-A").await.unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|r| r.survey_id == "survey-A"));

        assert!(storage
            .get_responses_by_survey("survey-Z")
            .await
            .unwrap()
            .is_empty());

        assert_eq!(
            storage
                .count_by_index(Collection::Responses, "survey-A")
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_partial_response_flag_survives() {
        let storage = create_test_storage().await;
        storage
            .put_response(NewResponse::new("survey-A", AnswerSet::new()).partial())
            .await
            .unwrap();

        let all = storage.get_all_responses().await.unwrap();
        assert!(!all[0].completed);
    }

    #[tokio::test]
    async fn test_unknown_survey_id_is_stored() {
        let storage = create_test_storage().await;
        let stored = storage
            .put_response(NewResponse::new("not-in-any-catalog", AnswerSet::new()))
            .await
            .unwrap();
        assert_eq!(stored.survey_id, "not-in-any-catalog");
    }
}

#[cfg(test)]
mod registration_tests {
    use super::*;

    #[tokio::test]
    async fn test_put_registration_assigns_id_and_timestamp() {
        let storage = create_test_storage().await;
        let before = chrono::Utc::now();

        let stored = storage
            .put_registration(NewRegistration::new(
                "student-registration-form",
                answers(&[("fname", Answer::text("Asha"))]),
            ))
            .await
            .unwrap();

        assert!(!stored.id.is_empty());
        assert!(stored.completed_at >= before);

        let all = storage.get_all_registrations().await.unwrap();
        assert_eq!(all, vec![stored]);
    }

    #[tokio::test]
    async fn test_two_student_registrations_counted() {
        let storage = create_test_storage().await;
        for name in ["Asha", "Ravi"] {
            storage
                .put_registration(NewRegistration::new(
                    "student-registration-form",
                    answers(&[("fname", Answer::text(name))]),
                ))
                .await
                .unwrap();
        }
        storage
            .put_registration(NewRegistration::new("volunteer-registration", AnswerSet::new()))
            .await
            .unwrap();

        let students = storage
            .get_registrations_by_form("student-registration-form")
            .await
            .unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(
            storage
                .count_by_index(Collection::Registrations, "student-registration-form")
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_put_registration_with_same_id_overwrites() {
        let storage = create_test_storage().await;
        for name in ["Asha", "Asha Patil"] {
            storage
                .put_registration(
                    NewRegistration::new(
                        "student-registration-form",
                        answers(&[("fname", Answer::text(name))]),
                    )
                    .with_id("reg-1"),
                )
                .await
                .unwrap();
        }

        let all = storage.get_all_registrations().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "reg-1");
        assert_eq!(all[0].responses.get("fname"), Some(&Answer::text("Asha Patil")));
    }

    #[tokio::test]
    async fn test_collections_are_independent() {
        let storage = create_test_storage().await;
        storage
            .put_response(NewResponse::new("survey-A", AnswerSet::new()))
            .await
            .unwrap();

        assert!(storage.get_all_registrations().await.unwrap().is_empty());
    }
}

#[cfg(test)]
mod schema_tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_database_at_latest_version() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(&file_config(
            &dir.path().join("fresh.db"),
            LATEST_SCHEMA_VERSION,
        ))
        .await
        .unwrap();
        assert_eq!(storage.schema_version(), LATEST_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_version_one_has_no_registrations() {
        let storage = SqliteStorage::new_in_memory_at(1).await.unwrap();
        assert_eq!(storage.schema_version(), 1);

        let result = storage
            .put_registration(NewRegistration::new("volunteer-registration", AnswerSet::new()))
            .await;
        assert!(matches!(
            result,
            Err(StorageError::CollectionMissing { version: 1, .. })
        ));
        assert!(storage
            .put_response(NewResponse::new("survey-A", AnswerSet::new()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_upgrade_keeps_existing_responses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upgrade.db");

        let v1 = SqliteStorage::open(&file_config(&path, 1)).await.unwrap();
        let set = answers(&[("q1", Answer::text("kept"))]);
        let original = v1
            .put_response(NewResponse::new("survey-A", set))
            .await
            .unwrap();
        v1.close().await;

        let v2 = SqliteStorage::open(&file_config(&path, 2)).await.unwrap();
        assert_eq!(v2.schema_version(), 2);
        assert_eq!(v2.get_all_responses().await.unwrap(), vec![original]);

        v2.put_registration(NewRegistration::new("volunteer-registration", AnswerSet::new()))
            .await
            .unwrap();
        assert_eq!(v2.get_all_registrations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reopen_at_same_or_lower_version_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noop.db");

        let first = SqliteStorage::open(&file_config(&path, 2)).await.unwrap();
        first
            .put_registration(NewRegistration::new("volunteer-registration", AnswerSet::new()))
            .await
            .unwrap();
        first.close().await;

        for version in [2, 1] {
            let again = SqliteStorage::open(&file_config(&path, version)).await.unwrap();
            assert_eq!(again.schema_version(), 2);
            assert_eq!(again.get_all_registrations().await.unwrap().len(), 1);
            again.close().await;
        }
    }

    #[tokio::test]
    async fn test_version_above_latest_applies_known_migrations() {
        let storage = SqliteStorage::new_in_memory_at(LATEST_SCHEMA_VERSION + 5)
            .await
            .unwrap();
        assert_eq!(storage.schema_version(), LATEST_SCHEMA_VERSION);
    }
}

#[cfg(test)]
mod handle_tests {
    use super::*;

    #[tokio::test]
    async fn test_concurrent_acquire_shares_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let handle = StoreHandle::new(file_config(
            &dir.path().join("shared.db"),
            LATEST_SCHEMA_VERSION,
        ));

        let (a, b) = tokio::join!(handle.acquire(), handle.acquire());
        let (a, b) = (a.unwrap(), b.unwrap());

        a.put_response(NewResponse::new("survey-A", AnswerSet::new()))
            .await
            .unwrap();
        assert_eq!(b.get_all_responses().await.unwrap().len(), 1);
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn test_failed_open_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let handle = StoreHandle::new(file_config(
            &blocker.join("store.db"),
            LATEST_SCHEMA_VERSION,
        ));

        let first = handle.acquire().await;
        assert!(matches!(first, Err(StorageError::Unavailable { .. })));
        assert!(!handle.is_open());

        std::fs::remove_file(&blocker).unwrap();
        std::fs::create_dir(&blocker).unwrap();

        let second = handle.acquire().await;
        assert!(second.is_ok(), "open should be retried: {:?}", second.err());
        assert!(handle.is_open());
    }
}
