use crate::errors::DomainError;
use crate::value_objects::{ChannelId, MessageId, Timestamp, UserId};

/// 表情回应：同一条消息内 (emoji, user) 组合唯一。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub user_id: UserId,
}

/// 线程回复，轻量内嵌结构，无独立生命周期。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Reply {
    pub author_id: UserId,
    pub text: String,
    pub created_at: Timestamp,
    pub edited: bool,
}

/// 频道时间线中的一条消息。
///
/// `author_id` 为 None 表示系统消息。软删除（tombstone）清空内容
/// 但保留消息标识；硬删除直接移除记录。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: Option<UserId>,
    pub text: String,
    pub attachments: Vec<String>,
    pub reactions: Vec<Reaction>,
    pub replies: Vec<Reply>,
    pub pinned: bool,
    pub edited: bool,
    pub deleted: bool,
    pub created_at: Timestamp,
}

impl Message {
    pub fn new(
        id: MessageId,
        channel_id: ChannelId,
        author_id: Option<UserId>,
        text: impl Into<String>,
        attachments: Vec<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            channel_id,
            author_id,
            text: text.into().trim().to_owned(),
            attachments,
            reactions: Vec::new(),
            replies: Vec::new(),
            pinned: false,
            edited: false,
            deleted: false,
            created_at,
        }
    }

    pub fn is_tombstoned(&self) -> bool {
        self.deleted
    }

    /// 判断用户是否为消息作者。系统消息没有作者。
    pub fn is_authored_by(&self, user_id: UserId) -> bool {
        self.author_id == Some(user_id)
    }

    /// 软删除：清空文本、附件、回应，保留消息标识和时间戳。
    pub fn tombstone(&mut self) {
        self.text.clear();
        self.attachments.clear();
        self.reactions.clear();
        self.deleted = true;
    }

    /// 编辑正文。tombstone 状态下拒绝。
    pub fn edit(&mut self, new_text: impl Into<String>) -> Result<(), DomainError> {
        if self.deleted {
            return Err(DomainError::MessageTombstoned);
        }
        self.text = new_text.into().trim().to_owned();
        self.edited = true;
        Ok(())
    }

    /// 切换 (emoji, user) 回应：存在则移除，不存在则追加。
    ///
    /// 领域层的参考实现；持久化路径使用存储层的原子切换，
    /// 两者语义必须一致。
    pub fn toggle_reaction(
        &mut self,
        user_id: UserId,
        emoji: impl Into<String>,
    ) -> Result<bool, DomainError> {
        if self.deleted {
            return Err(DomainError::MessageTombstoned);
        }
        let emoji = emoji.into();
        let before = self.reactions.len();
        self.reactions
            .retain(|r| !(r.emoji == emoji && r.user_id == user_id));
        if self.reactions.len() < before {
            return Ok(false);
        }
        self.reactions.push(Reaction { emoji, user_id });
        Ok(true)
    }

    pub fn add_reply(&mut self, reply: Reply) -> Result<(), DomainError> {
        if self.deleted {
            return Err(DomainError::MessageTombstoned);
        }
        self.replies.push(reply);
        Ok(())
    }
}
