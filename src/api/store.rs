//! Profile persistence.

use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileRecord {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<ProfileRecord>, sqlx::Error> {
        let query = r"
            SELECT full_name, email
            FROM profiles
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.sql.table = "profiles"
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        row.map(|row| -> Result<ProfileRecord, sqlx::Error> {
            Ok(ProfileRecord {
                full_name: row.try_get("full_name")?,
                email: row.try_get("email")?,
            })
        })
        .transpose()
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await
    }
}
