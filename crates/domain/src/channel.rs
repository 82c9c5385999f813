use crate::errors::DomainError;
use crate::value_objects::{ChannelId, ChannelSlug, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelVisibility {
    Public,
    Private,
}

/// 频道：按主题组织用户和消息的命名空间。
///
/// slug 创建后不可变；频道在本系统中从不硬删除。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub slug: ChannelSlug,
    pub title: String,
    pub description: String,
    pub visibility: ChannelVisibility,
    pub created_by: UserId,
    pub last_activity: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Channel {
    pub fn create(
        id: ChannelId,
        slug: ChannelSlug,
        title: impl Into<String>,
        description: impl Into<String>,
        visibility: ChannelVisibility,
        created_by: UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let title = title.into().trim().to_owned();
        // 标题缺省时沿用 slug
        let title = if title.is_empty() {
            slug.as_str().to_owned()
        } else {
            title
        };
        if title.len() > 120 {
            return Err(DomainError::validation("title", "too long"));
        }

        Ok(Self {
            id,
            slug,
            title,
            description: description.into(),
            visibility,
            created_by,
            last_activity: now,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_private(&self) -> bool {
        matches!(self.visibility, ChannelVisibility::Private)
    }

    /// 记录最新消息时间，用于频道列表排序。
    pub fn touch_activity(&mut self, now: Timestamp) {
        self.last_activity = now;
    }
}
