//! 用户目录适配器，从账号系统维护的 users 表读取展示资料。

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use application::directory::UserDirectory;
use domain::{RepositoryError, UserId, UserSummary};

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    name: String,
    photo: Option<String>,
}

impl From<UserRecord> for UserSummary {
    fn from(value: UserRecord) -> Self {
        UserSummary {
            id: UserId::from(value.id),
            username: value.username,
            name: value.name,
            photo: value.photo,
        }
    }
}

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_summary(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, name, photo FROM users WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| RepositoryError::storage(err.to_string()))?;

        Ok(record.map(UserSummary::from))
    }

    async fn get_summaries(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, RepositoryError> {
        let raw: Vec<Uuid> = ids.iter().map(|id| Uuid::from(*id)).collect();
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, name, photo FROM users WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| RepositoryError::storage(err.to_string()))?;

        Ok(records.into_iter().map(UserSummary::from).collect())
    }
}
