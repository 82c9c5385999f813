use crate::value_objects::{ChannelId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelRole {
    Moderator,
    Member,
}

impl ChannelRole {
    /// 版主可以删除他人消息、置顶消息。
    pub fn can_moderate(&self) -> bool {
        matches!(self, ChannelRole::Moderator)
    }
}

/// 频道成员关系。
///
/// 创建者在建频道时即以 Moderator 身份写入成员表，
/// 因此"创建者隐式是版主"归约为一次角色判断。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelMember {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub role: ChannelRole,
    pub joined_at: Timestamp,
}

impl ChannelMember {
    pub fn new(
        channel_id: ChannelId,
        user_id: UserId,
        role: ChannelRole,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            channel_id,
            user_id,
            role,
            joined_at,
        }
    }
}
