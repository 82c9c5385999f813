//! 广播事件定义。
//!
//! 事件在持久化提交之后发布；发布失败由调用方记录日志并吞掉，
//! 绝不把已成功的变更报告为失败。

use async_trait::async_trait;
use domain::{ChannelId, MessageId};
use serde::Serialize;
use thiserror::Error;

use crate::dto::MessageView;

/// `message_deleted` 事件体，线上格式只有 msgId 一个字段。
#[derive(Debug, Clone, Serialize)]
pub struct MessageDeletedPayload {
    #[serde(rename = "msgId")]
    pub msg_id: MessageId,
    #[serde(skip_serializing)]
    pub channel_id: ChannelId,
}

/// 频道主题上的实时事件。
///
/// 枚举标签即线上事件名，客户端按名字分发。
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChannelEvent {
    NewMessage(MessageView),
    MessageDeleted(MessageDeletedPayload),
    ReactionUpdated(MessageView),
    MessageUpdated(MessageView),
}

impl ChannelEvent {
    /// 事件所属主题（频道）。
    pub fn channel_id(&self) -> ChannelId {
        match self {
            ChannelEvent::NewMessage(view)
            | ChannelEvent::ReactionUpdated(view)
            | ChannelEvent::MessageUpdated(view) => view.channel,
            ChannelEvent::MessageDeleted(payload) => payload.channel_id,
        }
    }

    /// 线上事件名。
    pub fn name(&self) -> &'static str {
        match self {
            ChannelEvent::NewMessage(_) => "new_message",
            ChannelEvent::MessageDeleted(_) => "message_deleted",
            ChannelEvent::ReactionUpdated(_) => "reaction_updated",
            ChannelEvent::MessageUpdated(_) => "message_updated",
        }
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 投递到频道主题的所有订阅者，fire-and-forget。
    async fn publish(&self, event: ChannelEvent) -> Result<(), BroadcastError>;
}
