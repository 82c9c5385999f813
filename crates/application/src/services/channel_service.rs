use std::sync::Arc;

use domain::{
    Channel, ChannelId, ChannelMember, ChannelRole, ChannelSlug, ChannelVisibility, DomainError,
    RepositoryError, UserId, UserSummary,
};
use uuid::Uuid;

use crate::{
    clock::Clock,
    directory::UserDirectory,
    dto::{ChannelSummaryView, ChannelView},
    error::ApplicationError,
    repository::ChannelRepository,
};

#[derive(Debug, Clone)]
pub struct CreateChannelRequest {
    pub name: String,
    pub title: String,
    pub description: String,
    pub is_private: bool,
    pub created_by: Uuid,
}

pub struct ChannelServiceDependencies {
    pub channel_repository: Arc<dyn ChannelRepository>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub clock: Arc<dyn Clock>,
}

/// 频道目录：频道生命周期、成员关系、版主判定。
pub struct ChannelService {
    deps: ChannelServiceDependencies,
}

impl ChannelService {
    pub fn new(deps: ChannelServiceDependencies) -> Self {
        Self { deps }
    }

    /// 公开频道，按最近活跃时间倒序。无需认证。
    pub async fn list_public(&self) -> Result<Vec<ChannelSummaryView>, ApplicationError> {
        let listings = self.deps.channel_repository.list_public().await?;
        Ok(listings
            .iter()
            .map(|row| ChannelSummaryView::from_channel(&row.channel, row.member_count))
            .collect())
    }

    /// 频道详情，成员解析为用户摘要。
    pub async fn get_detail(&self, channel_id: Uuid) -> Result<ChannelView, ApplicationError> {
        let channel_id = ChannelId::from(channel_id);
        let channel = self
            .deps
            .channel_repository
            .find_by_id(channel_id)
            .await?
            .ok_or(DomainError::ChannelNotFound)?;

        let members = self
            .deps
            .channel_repository
            .list_members(channel_id)
            .await?;

        let member_ids: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
        let summaries = self.resolve_summaries(&member_ids).await;

        let moderators = members
            .iter()
            .filter(|m| m.role.can_moderate())
            .map(|m| m.user_id)
            .collect();

        Ok(ChannelView {
            id: channel.id,
            name: channel.slug.as_str().to_owned(),
            title: channel.title,
            description: channel.description,
            is_private: matches!(channel.visibility, ChannelVisibility::Private),
            created_by: channel.created_by,
            last_activity: channel.last_activity,
            created_at: channel.created_at,
            members: summaries,
            moderators,
        })
    }

    /// 创建频道。创建者成为唯一的初始成员兼版主。
    pub async fn create_channel(
        &self,
        request: CreateChannelRequest,
    ) -> Result<Channel, ApplicationError> {
        let slug = ChannelSlug::parse(request.name)?;

        // 先查一次给出友好错误，唯一索引兜底并发竞争
        if self
            .deps
            .channel_repository
            .find_by_slug(slug.as_str())
            .await?
            .is_some()
        {
            return Err(DomainError::SlugTaken.into());
        }

        let created_by = UserId::from(request.created_by);
        let now = self.deps.clock.now();
        let visibility = if request.is_private {
            ChannelVisibility::Private
        } else {
            ChannelVisibility::Public
        };

        let channel = Channel::create(
            ChannelId::new(Uuid::new_v4()),
            slug,
            request.title,
            request.description,
            visibility,
            created_by,
            now,
        )?;

        let creator = ChannelMember::new(channel.id, created_by, ChannelRole::Moderator, now);

        match self.deps.channel_repository.create(channel, creator).await {
            Ok(channel) => Ok(channel),
            Err(RepositoryError::Conflict) => Err(DomainError::SlugTaken.into()),
            Err(err) => Err(err.into()),
        }
    }

    /// 加入频道，幂等：重复加入是无操作。
    pub async fn join(&self, channel_id: Uuid, user_id: Uuid) -> Result<(), ApplicationError> {
        let channel_id = ChannelId::from(channel_id);
        self.deps
            .channel_repository
            .find_by_id(channel_id)
            .await?
            .ok_or(DomainError::ChannelNotFound)?;

        let member = ChannelMember::new(
            channel_id,
            UserId::from(user_id),
            ChannelRole::Member,
            self.deps.clock.now(),
        );
        self.deps.channel_repository.add_member(member).await?;
        Ok(())
    }

    /// 退出频道，幂等：不是成员也不报错。
    pub async fn leave(&self, channel_id: Uuid, user_id: Uuid) -> Result<(), ApplicationError> {
        self.deps
            .channel_repository
            .remove_member(ChannelId::from(channel_id), UserId::from(user_id))
            .await?;
        Ok(())
    }

    pub async fn is_member(
        &self,
        channel_id: ChannelId,
        user_id: UserId,
    ) -> Result<bool, ApplicationError> {
        Ok(self
            .deps
            .channel_repository
            .find_member(channel_id, user_id)
            .await?
            .is_some())
    }

    pub async fn is_moderator(
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

    /// 目录查询失败退化为占位摘要，不让详情接口整体失败。
    async fn resolve_summaries(&self, ids: &[UserId]) -> Vec<UserSummary> {
        match self.deps.user_directory.get_summaries(ids).await {
            Ok(found) => {
                let mut by_id: std::collections::HashMap<UserId, UserSummary> =
                    found.into_iter().map(|s| (s.id, s)).collect();
                ids.iter()
                    .map(|id| by_id.remove(id).unwrap_or_else(|| UserSummary::placeholder(*id)))
                    .collect()
            }
            Err(err) => {
                tracing::warn!(error = %err, "user directory lookup failed, using placeholders");
                ids.iter().map(|id| UserSummary::placeholder(*id)).collect()
            }
        }
    }
}
