//! PostgreSQL 仓储实现。
//!
//! 成员增删和回应切换落在带条件的单条 SQL 上，配合唯一约束
//! 保证并发下不会丢更新，服务层不需要读出-修改-写回。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use application::repository::{ChannelListing, ChannelRepository, MessageRepository};
use domain::{
    Channel, ChannelId, ChannelMember, ChannelRole, ChannelSlug, ChannelVisibility, Message,
    MessageId, Reaction, Reply, RepositoryError, Timestamp, UserId,
};

pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

/// page 和 limit 都来自未认证的查询参数，乘积可能超出 i64；
/// 饱和到 i64::MAX，对应一个必然为空的页。
fn page_offset(page: u32, limit: u32) -> i64 {
    i64::from(page)
        .checked_mul(i64::from(limit))
        .unwrap_or(i64::MAX)
}

fn role_to_str(role: ChannelRole) -> &'static str {
    match role {
        ChannelRole::Moderator => "moderator",
        ChannelRole::Member => "member",
    }
}

fn role_from_str(value: &str) -> ChannelRole {
    match value {
        "moderator" => ChannelRole::Moderator,
        _ => ChannelRole::Member,
    }
}

#[derive(Debug, FromRow)]
struct ChannelRecord {
    id: Uuid,
    slug: String,
    title: String,
    description: String,
    is_private: bool,
    created_by: Uuid,
    last_activity: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ChannelRecord> for Channel {
    type Error = RepositoryError;

    fn try_from(value: ChannelRecord) -> Result<Self, Self::Error> {
        let slug =
            ChannelSlug::parse(value.slug).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Channel {
            id: ChannelId::from(value.id),
            slug,
            title: value.title,
            description: value.description,
            visibility: if value.is_private {
                ChannelVisibility::Private
            } else {
                ChannelVisibility::Public
            },
            created_by: UserId::from(value.created_by),
            last_activity: value.last_activity,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MemberRecord {
    channel_id: Uuid,
    user_id: Uuid,
    role: String,
    joined_at: DateTime<Utc>,
}

impl From<MemberRecord> for ChannelMember {
    fn from(value: MemberRecord) -> Self {
        ChannelMember {
            channel_id: ChannelId::from(value.channel_id),
            user_id: UserId::from(value.user_id),
            role: role_from_str(&value.role),
            joined_at: value.joined_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ChannelListingRecord {
    #[sqlx(flatten)]
    channel: ChannelRecord,
    member_count: i64,
}

const CHANNEL_COLUMNS: &str =
    "id, slug, title, description, is_private, created_by, last_activity, created_at, updated_at";

#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn create(
        &self,
        channel: Channel,
        creator: ChannelMember,
    ) -> Result<Channel, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, ChannelRecord>(
            r#"
            INSERT INTO channels (id, slug, title, description, is_private, created_by, last_activity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, slug, title, description, is_private, created_by, last_activity, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(channel.id))
        .bind(channel.slug.as_str())
        .bind(&channel.title)
        .bind(&channel.description)
        .bind(channel.is_private())
        .bind(Uuid::from(channel.created_by))
        .bind(channel.last_activity)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        sqlx::query(
            r#"
            INSERT INTO channel_members (channel_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::from(creator.channel_id))
        .bind(Uuid::from(creator.user_id))
        .bind(role_to_str(creator.role))
        .bind(creator.joined_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        Channel::try_from(record)
    }

    async fn find_by_id(&self, id: ChannelId) -> Result<Option<Channel>, RepositoryError> {
        let record = sqlx::query_as::<_, ChannelRecord>(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Channel::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Channel>, RepositoryError> {
        let record = sqlx::query_as::<_, ChannelRecord>(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Channel::try_from).transpose()
    }

    async fn list_public(&self) -> Result<Vec<ChannelListing>, RepositoryError> {
        let rows = sqlx::query_as::<_, ChannelListingRecord>(
            r#"
            SELECT c.id, c.slug, c.title, c.description, c.is_private, c.created_by,
                   c.last_activity, c.created_at, c.updated_at,
                   COUNT(m.user_id) AS member_count
            FROM channels c
            LEFT JOIN channel_members m ON m.channel_id = c.id
            WHERE NOT c.is_private
            GROUP BY c.id
            ORDER BY c.last_activity DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(ChannelListing {
                    channel: Channel::try_from(row.channel)?,
                    member_count: row.member_count.max(0) as u64,
                })
            })
            .collect()
    }

    async fn touch_activity(&self, id: ChannelId, at: Timestamp) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE channels SET last_activity = $2, updated_at = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn add_member(&self, member: ChannelMember) -> Result<(), RepositoryError> {
        // 重复加入靠主键约束吸收，幂等
        sqlx::query(
            r#"
            INSERT INTO channel_members (channel_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (channel_id, user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(member.channel_id))
        .bind(Uuid::from(member.user_id))
        .bind(role_to_str(member.role))
        .bind(member.joined_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn remove_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM channel_members WHERE channel_id = $1 AND user_id = $2")
            .bind(Uuid::from(channel_id))
            .bind(Uuid::from(user_id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn find_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<Option<ChannelMember>, RepositoryError> {
        let record = sqlx::query_as::<_, MemberRecord>(
            "SELECT channel_id, user_id, role, joined_at FROM channel_members WHERE channel_id = $1 AND user_id = $2",
        )
        .bind(Uuid::from(channel_id))
        .bind(Uuid::from(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(record.map(ChannelMember::from))
    }

    async fn list_members(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<ChannelMember>, RepositoryError> {
        let records = sqlx::query_as::<_, MemberRecord>(
            "SELECT channel_id, user_id, role, joined_at FROM channel_members WHERE channel_id = $1 ORDER BY joined_at",
        )
        .bind(Uuid::from(channel_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(ChannelMember::from).collect())
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    channel_id: Uuid,
    author_id: Option<Uuid>,
    text: String,
    attachments: Vec<String>,
    pinned: bool,
    edited: bool,
    deleted: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ReactionRecord {
    message_id: Uuid,
    user_id: Uuid,
    emoji: String,
}

#[derive(Debug, FromRow)]
struct ReplyRecord {
    message_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
    edited: bool,
}

fn hydrate(record: MessageRecord, reactions: Vec<Reaction>, replies: Vec<Reply>) -> Message {
    Message {
        id: MessageId::from(record.id),
        channel_id: ChannelId::from(record.channel_id),
        author_id: record.author_id.map(UserId::from),
        text: record.text,
        attachments: record.attachments,
        reactions,
        replies,
        pinned: record.pinned,
        edited: record.edited,
        deleted: record.deleted,
        created_at: record.created_at,
    }
}

const MESSAGE_COLUMNS: &str =
    "id, channel_id, author_id, text, attachments, pinned, edited, deleted, created_at";

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let Some(record) = record else {
            return Ok(None);
        };

        let reactions = sqlx::query_as::<_, ReactionRecord>(
            "SELECT message_id, user_id, emoji FROM message_reactions WHERE message_id = $1 ORDER BY created_at",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .into_iter()
        .map(|r| Reaction {
            emoji: r.emoji,
            user_id: UserId::from(r.user_id),
        })
        .collect();

        let replies = sqlx::query_as::<_, ReplyRecord>(
            "SELECT message_id, author_id, text, created_at, edited FROM message_replies WHERE message_id = $1 ORDER BY id",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .into_iter()
        .map(|r| Reply {
            author_id: UserId::from(r.author_id),
            text: r.text,
            created_at: r.created_at,
            edited: r.edited,
        })
        .collect();

        Ok(Some(hydrate(record, reactions, replies)))
    }

    async fn require(&self, id: MessageId) -> Result<Message, RepositoryError> {
        self.load(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn load_many(&self, records: Vec<MessageRecord>) -> Result<Vec<Message>, RepositoryError> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();

        let mut reactions_by_message: HashMap<Uuid, Vec<Reaction>> = HashMap::new();
        for r in sqlx::query_as::<_, ReactionRecord>(
            "SELECT message_id, user_id, emoji FROM message_reactions WHERE message_id = ANY($1) ORDER BY created_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        {
            reactions_by_message
                .entry(r.message_id)
                .or_default()
                .push(Reaction {
                    emoji: r.emoji,
                    user_id: UserId::from(r.user_id),
                });
        }

        let mut replies_by_message: HashMap<Uuid, Vec<Reply>> = HashMap::new();
        for r in sqlx::query_as::<_, ReplyRecord>(
            "SELECT message_id, author_id, text, created_at, edited FROM message_replies WHERE message_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        {
            replies_by_message
                .entry(r.message_id)
                .or_default()
                .push(Reply {
                    author_id: UserId::from(r.author_id),
                    text: r.text,
                    created_at: r.created_at,
                    edited: r.edited,
                });
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let reactions = reactions_by_message.remove(&record.id).unwrap_or_default();
                let replies = replies_by_message.remove(&record.id).unwrap_or_default();
                hydrate(record, reactions, replies)
            })
            .collect())
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, channel_id, author_id, text, attachments, pinned, edited, deleted, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, channel_id, author_id, text, attachments, pinned, edited, deleted, created_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.channel_id))
        .bind(message.author_id.map(Uuid::from))
        .bind(&message.text)
        .bind(&message.attachments)
        .bind(message.pinned)
        .bind(message.edited)
        .bind(message.deleted)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(hydrate(record, Vec::new(), Vec::new()))
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        self.load(id).await
    }

    async fn list_page(
        &self,
        channel_id: ChannelId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE channel_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#
        ))
        .bind(Uuid::from(channel_id))
        .bind(page_offset(page, limit))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        self.load_many(records).await
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn toggle_reaction(
        &self,
        id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        // 条件删除，删不到就条件插入；唯一约束保证并发下不产生重复对
        let removed = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = $1 AND user_id = $2 AND emoji = $3",
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(user_id))
        .bind(emoji)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        if removed.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO message_reactions (message_id, user_id, emoji)
                SELECT $1, $2, $3
                WHERE EXISTS (SELECT 1 FROM messages WHERE id = $1 AND NOT deleted)
                ON CONFLICT (message_id, user_id, emoji) DO NOTHING
                "#,
            )
            .bind(Uuid::from(id))
            .bind(Uuid::from(user_id))
            .bind(emoji)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        self.require(id).await
    }

    async fn soft_delete(&self, id: MessageId) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let updated = sqlx::query(
            "UPDATE messages SET text = '', attachments = '{}', deleted = TRUE WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM message_reactions WHERE message_id = $1")
            .bind(Uuid::from(id))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        tx.commit().await.map_err(map_sqlx_err)?;
        self.require(id).await
    }

    async fn update_text(&self, id: MessageId, text: &str) -> Result<Message, RepositoryError> {
        let updated = sqlx::query(
            "UPDATE messages SET text = $2, edited = TRUE WHERE id = $1 AND NOT deleted",
        )
        .bind(Uuid::from(id))
        .bind(text)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.require(id).await
    }

    async fn add_reply(&self, id: MessageId, reply: Reply) -> Result<Message, RepositoryError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO message_replies (message_id, author_id, text, created_at, edited)
            SELECT $1, $2, $3, $4, $5
            WHERE EXISTS (SELECT 1 FROM messages WHERE id = $1)
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(reply.author_id))
        .bind(&reply.text)
        .bind(reply.created_at)
        .bind(reply.edited)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if inserted.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.require(id).await
    }

    async fn set_pinned(&self, id: MessageId, pinned: bool) -> Result<Message, RepositoryError> {
        let updated = sqlx::query("UPDATE messages SET pinned = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(pinned)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.require(id).await
    }
}
