use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::migrations::{self, LATEST_SCHEMA_VERSION};
use super::{
    Collection, NewRegistration, NewResponse, RegistrationSubmission, Storage, SubmittedResponse,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::forms::AnswerSet;

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    version: i64,
}

impl SqliteStorage {
    /// Open (creating if needed) the database and migrate it to the
    /// configured schema version.
    pub async fn open(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Unavailable {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable {
                message: format!("Failed to open database: {}", e),
            })?;

        let storage = Self::with_pool(pool, config.schema_version).await?;
        info!(
            path = %config.path.display(),
            version = storage.version,
            "Database opened"
        );
        Ok(storage)
    }

    /// In-memory database at the latest schema version.
    pub async fn new_in_memory() -> StorageResult<Self> {
        Self::new_in_memory_at(LATEST_SCHEMA_VERSION).await
    }

    /// In-memory database at a specific schema version.
    pub async fn new_in_memory_at(version: i64) -> StorageResult<Self> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
                StorageError::Unavailable {
                    message: format!("Invalid database URL: {}", e),
                }
            })?;

        // A single long-lived connection; every new in-memory connection
        // would otherwise see its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        Self::with_pool(pool, version).await
    }

    async fn with_pool(pool: SqlitePool, target_version: i64) -> StorageResult<Self> {
        let version = migrations::migrate_to(&pool, target_version).await?;
        Ok(Self { pool, version })
    }

    /// Schema version the database is at.
    pub fn schema_version(&self) -> i64 {
        self.version
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn require(&self, collection: Collection) -> StorageResult<()> {
        if self.version < collection.since_version() {
            return Err(StorageError::CollectionMissing {
                collection: collection.table().to_string(),
                version: self.version,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn put_response(&self, response: NewResponse) -> StorageResult<SubmittedResponse> {
        self.require(Collection::Responses)?;

        let record = SubmittedResponse {
            id: response.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            survey_id: response.survey_id,
            answers: response.answers,
            submitted_at: Utc::now(),
            completed: response.completed,
        };
        let answers = serde_json::to_string(&record.answers)?;

        // Dropping this future before commit rolls the insert back.
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO responses (id, survey_id, answers, submitted_at, completed)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                survey_id = excluded.survey_id,
                answers = excluded.answers,
                submitted_at = excluded.submitted_at,
                completed = excluded.completed
            "#,
        )
        .bind(&record.id)
        .bind(&record.survey_id)
        .bind(&answers)
        .bind(record.submitted_at.to_rfc3339())
        .bind(record.completed)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(id = %record.id, survey_id = %record.survey_id, "Stored survey response");
        Ok(record)
    }

    async fn get_all_responses(&self) -> StorageResult<Vec<SubmittedResponse>> {
        self.require(Collection::Responses)?;

        let rows: Vec<ResponseRow> = sqlx::query_as(
            r#"
            SELECT id, survey_id, answers, submitted_at, completed
            FROM responses
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_responses_by_survey(
        &self,
        survey_id: &str,
    ) -> StorageResult<Vec<SubmittedResponse>> {
        self.require(Collection::Responses)?;

        let rows: Vec<ResponseRow> = sqlx::query_as(
            r#"
            SELECT id, survey_id, answers, submitted_at, completed
            FROM responses
            WHERE survey_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn put_registration(
        &self,
        registration: NewRegistration,
    ) -> StorageResult<RegistrationSubmission> {
        self.require(Collection::Registrations)?;

        let record = RegistrationSubmission {
            id: registration
                .id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            registration_id: registration.registration_id,
            responses: registration.responses,
            completed_at: Utc::now(),
        };
        let responses = serde_json::to_string(&record.responses)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO registrations (id, registration_id, responses, completed_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                registration_id = excluded.registration_id,
                responses = excluded.responses,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.registration_id)
        .bind(&responses)
        .bind(record.completed_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(
            id = %record.id,
            registration_id = %record.registration_id,
            "Stored registration"
        );
        Ok(record)
    }

    async fn get_all_registrations(&self) -> StorageResult<Vec<RegistrationSubmission>> {
        self.require(Collection::Registrations)?;

        let rows: Vec<RegistrationRow> = sqlx::query_as(
            r#"
            SELECT id, registration_id, responses, completed_at
            FROM registrations
            ORDER BY rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get_registrations_by_form(
        &self,
        registration_id: &str,
    ) -> StorageResult<Vec<RegistrationSubmission>> {
        self.require(Collection::Registrations)?;

        let rows: Vec<RegistrationRow> = sqlx::query_as(
            r#"
            SELECT id, registration_id, responses, completed_at
            FROM registrations
            WHERE registration_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(registration_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_by_index(&self, collection: Collection, key: &str) -> StorageResult<u64> {
        self.require(collection)?;

        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            collection.table(),
            collection.index_column()
        );
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(key)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct ResponseRow {
    id: String,
    survey_id: String,
    answers: String,
    submitted_at: String,
    completed: bool,
}

impl TryFrom<ResponseRow> for SubmittedResponse {
    type Error = StorageError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let answers = parse_answers(Collection::Responses, &row.id, &row.answers)?;
        let submitted_at = parse_timestamp(Collection::Responses, &row.id, &row.submitted_at)?;
        Ok(Self {
            id: row.id,
            survey_id: row.survey_id,
            answers,
            submitted_at,
            completed: row.completed,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RegistrationRow {
    id: String,
    registration_id: String,
    responses: String,
    completed_at: String,
}

impl TryFrom<RegistrationRow> for RegistrationSubmission {
    type Error = StorageError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let responses = parse_answers(Collection::Registrations, &row.id, &row.responses)?;
        let completed_at =
            parse_timestamp(Collection::Registrations, &row.id, &row.completed_at)?;
        Ok(Self {
            id: row.id,
            registration_id: row.registration_id,
            responses,
            completed_at,
        })
    }
}

fn parse_answers(collection: Collection, id: &str, raw: &str) -> StorageResult<AnswerSet> {
    serde_json::from_str(raw).map_err(|e| StorageError::CorruptRecord {
        collection: collection.to_string(),
        id: id.to_string(),
        message: format!("invalid answers: {}", e),
    })
}

fn parse_timestamp(collection: Collection, id: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRecord {
            collection: collection.to_string(),
            id: id.to_string(),
            message: format!("invalid timestamp '{}': {}", raw, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::Answer;

    fn answers() -> AnswerSet {
        [("q1", Answer::text("hello")), ("q3", Answer::Number(3))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn test_put_assigns_id_and_timestamp() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        let before = Utc::now();

        let record = storage
            .put_response(NewResponse::new("survey-A", answers()))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&record.id).is_ok());
        assert!(record.submitted_at >= before);
        assert!(record.completed);
    }

    #[tokio::test]
    async fn test_put_with_existing_id_overwrites() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();

        storage
            .put_response(NewResponse::new("survey-A", answers()).with_id("r1"))
            .await
            .unwrap();
        storage
            .put_response(NewResponse::new("survey-B", AnswerSet::new()).with_id("r1"))
            .await
            .unwrap();

        let all = storage.get_all_responses().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].survey_id, "survey-B");
    }

    #[tokio::test]
    async fn test_registrations_missing_at_version_one() {
        let storage = SqliteStorage::new_in_memory_at(1).await.unwrap();
        assert_eq!(storage.schema_version(), 1);

        let err = storage
            .put_registration(NewRegistration::new("student-registration-form", answers()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CollectionMissing { version: 1, .. }));

        let err = storage
            .count_by_index(Collection::Registrations, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CollectionMissing { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_answers_surface_as_error() {
        let storage = SqliteStorage::new_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO responses (id, survey_id, answers, submitted_at, completed) VALUES ('bad', 's', '{oops', ?, 1)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(storage.pool())
        .await
        .unwrap();

        let err = storage.get_all_responses().await.unwrap_err();
        assert!(matches!(err, StorageError::CorruptRecord { .. }));
    }
}
