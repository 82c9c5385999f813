use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::{
    ChannelId, DomainError, Message, MessageId, Reply, UserId, UserSummary,
};
use uuid::Uuid;

use crate::{
    broadcaster::{ChannelEvent, EventPublisher, MessageDeletedPayload},
    clock::Clock,
    directory::UserDirectory,
    dto::MessageView,
    error::ApplicationError,
    repository::{ChannelRepository, MessageRepository},
};

pub const DEFAULT_PAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub channel_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub attachments: Vec<String>,
}

pub struct MessageServiceDependencies {
    pub channel_repository: Arc<dyn ChannelRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub clock: Arc<dyn Clock>,
    pub publisher: Arc<dyn EventPublisher>,
}

/// 消息账本：消息生命周期、回应切换、软/硬删除、回复与置顶。
///
/// 所有广播都发生在持久化提交之后；广播失败只记日志，
/// 永远不把已提交的变更报告为失败。
pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 发送消息。
    ///
    /// 私有频道要求发送者是成员；公开频道不限制。正文允许为空
    /// （沿用线上行为，即使附件也为空）。发送成功后尽力更新频道
    /// 活跃时间并广播 `new_message`，两者失败都不影响返回。
    pub async fn send(&self, request: SendMessageRequest) -> Result<MessageView, ApplicationError> {
        let channel_id = ChannelId::from(request.channel_id);
        let author_id = UserId::from(request.author_id);

        let channel = self
            .deps
            .channel_repository
            .find_by_id(channel_id)
            .await?
            .ok_or(DomainError::ChannelNotFound)?;

        if channel.is_private() {
            self.deps
                .channel_repository
                .find_member(channel_id, author_id)
                .await?
                .ok_or(DomainError::NotChannelMember)?;
        }

        let message = Message::new(
            MessageId::new(Uuid::new_v4()),
            channel_id,
            Some(author_id),
            request.text,
            request.attachments,
            self.deps.clock.now(),
        );

        let stored = self.deps.message_repository.create(message).await?;

        // 活跃时间是尽力而为的旁路更新，失败不影响发送
        if let Err(err) = self
            .deps
            .channel_repository
            .touch_activity(channel_id, stored.created_at)
            .await
        {
            tracing::warn!(
                channel_id = %channel_id,
                error = %err,
                "failed to touch channel activity"
            );
        }

        let view = self.resolve_view(&stored).await;
        self.publish(ChannelEvent::NewMessage(view.clone())).await;
        Ok(view)
    }

    /// 分页取消息，页内按时间正序。
    ///
    /// 查询按最新在前取 `page * limit` 偏移，再反转返回。读取不做
    /// 成员校验，私有频道也一样（沿用线上行为，写有守卫读没有）。
    pub async fn list(
        &self,
        channel_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<Vec<MessageView>, ApplicationError> {
        let messages = self
            .deps
            .message_repository
            .list_page(ChannelId::from(channel_id), page, limit)
            .await?;

        let mut views = self.resolve_views(&messages).await;
        views.reverse();
        Ok(views)
    }

    /// 硬删除：仅作者或频道版主。记录移除后广播 `message_deleted`。
    pub async fn delete(
        &self,
        message_id: Uuid,
        requester: UserId,
    ) -> Result<MessageId, ApplicationError> {
        let message = self.require_message(message_id).await?;
        self.require_author_or_moderator(&message, requester, "delete message")
            .await?;

        self.deps.message_repository.delete(message.id).await?;

        self.publish(ChannelEvent::MessageDeleted(MessageDeletedPayload {
            msg_id: message.id,
            channel_id: message.channel_id,
        }))
        .await;
        Ok(message.id)
    }

    /// 切换 (emoji, user) 回应。
    ///
    /// 存储层做条件原子增删，两次相同调用互为逆操作，并发下不会
    /// 产生重复回应。tombstone 消息拒绝回应。
    pub async fn toggle_reaction(
        &self,
        message_id: Uuid,
        user_id: UserId,
        emoji: &str,
    ) -> Result<MessageView, ApplicationError> {
        if emoji.is_empty() {
            return Err(DomainError::validation("emoji", "missing emoji").into());
        }

        let message = self.require_message(message_id).await?;
        if message.is_tombstoned() {
            return Err(DomainError::MessageTombstoned.into());
        }

        let updated = self
            .deps
            .message_repository
            .toggle_reaction(message.id, user_id, emoji)
            .await?;

        let view = self.resolve_view(&updated).await;
        self.publish(ChannelEvent::ReactionUpdated(view.clone()))
            .await;
        Ok(view)
    }

    /// 软删除：清空内容、保留消息标识。仅作者或版主。
    pub async fn soft_delete(
        &self,
        message_id: Uuid,
        requester: UserId,
    ) -> Result<MessageView, ApplicationError> {
        let message = self.require_message(message_id).await?;
        self.require_author_or_moderator(&message, requester, "soft delete message")
            .await?;

        let updated = self.deps.message_repository.soft_delete(message.id).await?;

        let view = self.resolve_view(&updated).await;
        self.publish(ChannelEvent::MessageUpdated(view.clone()))
            .await;
        Ok(view)
    }

    /// 编辑正文：仅作者本人，tombstone 拒绝。
    pub async fn edit(
        &self,
        message_id: Uuid,
        requester: UserId,
        text: &str,
    ) -> Result<MessageView, ApplicationError> {
        let message = self.require_message(message_id).await?;
        if message.is_tombstoned() {
            return Err(DomainError::MessageTombstoned.into());
        }
        if !message.is_authored_by(requester) {
            return Err(DomainError::not_authorized("edit message").into());
        }

        let updated = self
            .deps
            .message_repository
            .update_text(message.id, text.trim())
            .await?;

        let view = self.resolve_view(&updated).await;
        self.publish(ChannelEvent::MessageUpdated(view.clone()))
            .await;
        Ok(view)
    }

    /// 追加线程回复。回复不触发广播。
    pub async fn add_reply(
        &self,
        message_id: Uuid,
        author_id: UserId,
        text: &str,
    ) -> Result<MessageView, ApplicationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::validation("text", "cannot be empty").into());
        }

        let message = self.require_message(message_id).await?;
        if message.is_tombstoned() {
            return Err(DomainError::MessageTombstoned.into());
        }

        let reply = Reply {
            author_id,
            text: text.to_owned(),
            created_at: self.deps.clock.now(),
            edited: false,
        };
        let updated = self
            .deps
            .message_repository
            .add_reply(message.id, reply)
            .await?;

        Ok(self.resolve_view(&updated).await)
    }

    /// 置顶 / 取消置顶：仅频道版主。
    pub async fn set_pinned(
        &self,
        message_id: Uuid,
        requester: UserId,
        pinned: bool,
    ) -> Result<MessageView, ApplicationError> {
        let message = self.require_message(message_id).await?;
        if !self.is_moderator(message.channel_id, requester).await? {
            return Err(DomainError::not_authorized("pin message").into());
        }

        let updated = self
            .deps
            .message_repository
            .set_pinned(message.id, pinned)
            .await?;

        Ok(self.resolve_view(&updated).await)
    }

    async fn require_message(&self, message_id: Uuid) -> Result<Message, ApplicationError> {
        self.deps
            .message_repository
            .find_by_id(MessageId::from(message_id))
            .await?
            .ok_or_else(|| DomainError::MessageNotFound.into())
    }

    async fn is_moderator(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<bool, ApplicationError> {
        Ok(self
            .deps
            .channel_repository
            .find_member(channel_id, user_id)
            .await?
            .map(|m| m.role.can_moderate())
            .unwrap_or(false))
    }

    async fn require_author_or_moderator(
        &self,
        message: &Message,
        requester: UserId,
        action: &str,
    ) -> Result<(), ApplicationError> {
        if message.is_authored_by(requester)
            || self.is_moderator(message.channel_id, requester).await?
        {
            return Ok(());
        }
        Err(DomainError::not_authorized(action).into())
    }

    async fn resolve_view(&self, message: &Message) -> MessageView {
        let author = match message.author_id {
            Some(id) => Some(self.resolve_summary(id).await),
            None => None,
        };
        MessageView::from_message(message, author)
    }

    async fn resolve_views(&self, messages: &[Message]) -> Vec<MessageView> {
        let ids: Vec<UserId> = messages
            .iter()
            .filter_map(|m| m.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let by_id: HashMap<UserId, UserSummary> =
            match self.deps.user_directory.get_summaries(&ids).await {
                Ok(found) => found.into_iter().map(|s| (s.id, s)).collect(),
                Err(err) => {
                    tracing::warn!(error = %err, "user directory lookup failed, using placeholders");
                    HashMap::new()
                }
            };

        messages
            .iter()
            .map(|m| {
                let author = m.author_id.map(|id| {
                    by_id
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| UserSummary::placeholder(id))
                });
                MessageView::from_message(m, author)
            })
            .collect()
    }

    async fn resolve_summary(&self, id: UserId) -> UserSummary {
        match self.deps.user_directory.get_summary(id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => UserSummary::placeholder(id),
            Err(err) => {
                tracing::warn!(user_id = %id, error = %err, "user directory lookup failed");
                UserSummary::placeholder(id)
            }
        }
    }

    /// 广播失败吞掉并记日志，变更已经提交。
    async fn publish(&self, event: ChannelEvent) {
        let name = event.name();
        let channel_id = event.channel_id();
        if let Err(err) = self.deps.publisher.publish(event).await {
            tracing::warn!(
                event = name,
                channel_id = %channel_id,
                error = %err,
                "broadcast failed after committed mutation"
            );
        }
    }
}
