//! 存储层接口。
//!
//! 回应切换和成员增删必须是存储层的条件原子操作，
//! 不允许读出-修改-写回（并发下会丢更新）。

use async_trait::async_trait;
use domain::{
    Channel, ChannelId, ChannelMember, Message, MessageId, Reply, RepositoryError, Timestamp,
    UserId,
};

/// 公开频道列表行：频道加成员数。
#[derive(Debug, Clone)]
pub struct ChannelListing {
    pub channel: Channel,
    pub member_count: u64,
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// 创建频道并在同一事务内写入创建者成员记录。
    /// slug 冲突返回 `RepositoryError::Conflict`。
    async fn create(
        &self,
        channel: Channel,
        creator: ChannelMember,
    ) -> Result<Channel, RepositoryError>;

    async fn find_by_id(&self, id: ChannelId) -> Result<Option<Channel>, RepositoryError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Channel>, RepositoryError>;

    /// 公开频道，按最近活跃时间倒序。
    async fn list_public(&self) -> Result<Vec<ChannelListing>, RepositoryError>;

    /// 更新频道最近活跃时间。
    async fn touch_activity(&self, id: ChannelId, at: Timestamp) -> Result<(), RepositoryError>;

    /// 原子加入：已是成员时为无操作。
    async fn add_member(&self, member: ChannelMember) -> Result<(), RepositoryError>;

    /// 原子退出：不是成员时为无操作。
    async fn remove_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<(), RepositoryError>;

    async fn find_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<Option<ChannelMember>, RepositoryError>;

    async fn list_members(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<ChannelMember>, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;

    /// 按创建时间倒序取一页（page 从 0 开始）。
    /// 调用方负责反转为页内正序。
    async fn list_page(
        &self,
        channel_id: ChannelId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// 硬删除。消息不存在返回 `RepositoryError::NotFound`。
    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError>;

    /// 原子切换 (emoji, user) 回应，返回更新后的消息。
    async fn toggle_reaction(
        &self,
        id: MessageId,
        user_id: UserId,
        emoji: &str,
    ) -> Result<Message, RepositoryError>;

    /// 软删除：清空文本、附件、回应，置 deleted 标记，保留记录。
    async fn soft_delete(&self, id: MessageId) -> Result<Message, RepositoryError>;

    /// 更新正文并置 edited 标记。
    async fn update_text(&self, id: MessageId, text: &str) -> Result<Message, RepositoryError>;

    async fn add_reply(&self, id: MessageId, reply: Reply) -> Result<Message, RepositoryError>;

    async fn set_pinned(&self, id: MessageId, pinned: bool) -> Result<Message, RepositoryError>;
}
