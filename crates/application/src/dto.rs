//! 对外数据传输对象。
//!
//! 字段名保持 camelCase，与既有客户端的线上格式兼容。

use domain::{
    Channel, ChannelId, Message, MessageId, Reaction, Reply, Timestamp, UserId, UserSummary,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ReactionView {
    pub emoji: String,
    pub user: UserId,
}

impl From<&Reaction> for ReactionView {
    fn from(value: &Reaction) -> Self {
        Self {
            emoji: value.emoji.clone(),
            user: value.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub user: UserId,
    pub text: String,
    pub created_at: Timestamp,
    pub edited: bool,
}

impl From<&Reply> for ReplyView {
    fn from(value: &Reply) -> Self {
        Self {
            user: value.author_id,
            text: value.text.clone(),
            created_at: value.created_at,
            edited: value.edited,
        }
    }
}

/// 已解析作者摘要的消息视图。`user` 为 None 表示系统消息。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub channel: ChannelId,
    pub user: Option<UserSummary>,
    pub text: String,
    pub attachments: Vec<String>,
    pub reactions: Vec<ReactionView>,
    pub replies: Vec<ReplyView>,
    pub pinned: bool,
    pub edited: bool,
    pub deleted: bool,
    pub created_at: Timestamp,
}

impl MessageView {
    pub fn from_message(message: &Message, author: Option<UserSummary>) -> Self {
        Self {
            id: message.id,
            channel: message.channel_id,
            user: author,
            text: message.text.clone(),
            attachments: message.attachments.clone(),
            reactions: message.reactions.iter().map(ReactionView::from).collect(),
            replies: message.replies.iter().map(ReplyView::from).collect(),
            pinned: message.pinned,
            edited: message.edited,
            deleted: message.deleted,
            created_at: message.created_at,
        }
    }
}

/// 频道详情：成员解析为用户摘要，版主以 ID 列表给出。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    pub id: ChannelId,
    pub name: String,
    pub title: String,
    pub description: String,
    pub is_private: bool,
    pub created_by: UserId,
    pub last_activity: Timestamp,
    pub created_at: Timestamp,
    pub members: Vec<UserSummary>,
    pub moderators: Vec<UserId>,
}

/// 公开频道列表行。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummaryView {
    pub id: ChannelId,
    pub name: String,
    pub title: String,
    pub description: String,
    pub last_activity: Timestamp,
    pub member_count: u64,
}

impl ChannelSummaryView {
    pub fn from_channel(channel: &Channel, member_count: u64) -> Self {
        Self {
            id: channel.id,
            name: channel.slug.as_str().to_owned(),
            title: channel.title.clone(),
            description: channel.description.clone(),
            last_activity: channel.last_activity,
            member_count,
        }
    }
}
