//! 频道目录服务单元测试。

use std::sync::Arc;

use domain::{DomainError, UserId, UserSummary};
use uuid::Uuid;

use crate::error::ApplicationError;
use crate::services::test_support::{InMemoryChannelRepository, StaticUserDirectory, TickingClock};
use crate::services::{ChannelService, ChannelServiceDependencies, CreateChannelRequest};

struct TestEnv {
    service: ChannelService,
    repo: Arc<InMemoryChannelRepository>,
    directory: Arc<StaticUserDirectory>,
    clock: Arc<TickingClock>,
}

fn env() -> TestEnv {
    let repo = InMemoryChannelRepository::new();
    let directory = StaticUserDirectory::new();
    let clock = TickingClock::new();
    let service = ChannelService::new(ChannelServiceDependencies {
        channel_repository: repo.clone(),
        user_directory: directory.clone(),
        clock: clock.clone(),
    });
    TestEnv {
        service,
        repo,
        directory,
        clock,
    }
}

fn request(name: &str, creator: Uuid) -> CreateChannelRequest {
    CreateChannelRequest {
        name: name.to_owned(),
        title: String::new(),
        description: String::new(),
        is_private: false,
        created_by: creator,
    }
}

#[tokio::test]
async fn create_normalizes_slug_and_seeds_creator() {
    let env = env();
    let creator = Uuid::new_v4();

    let channel = env
        .service
        .create_channel(request("  Team-Chat ", creator))
        .await
        .unwrap();
    assert_eq!(channel.slug.as_str(), "team-chat");
    // 标题缺省沿用 slug
    assert_eq!(channel.title, "team-chat");

    let detail = env.service.get_detail(channel.id.into()).await.unwrap();
    assert_eq!(detail.name, "team-chat");
    assert_eq!(detail.members.len(), 1);
    assert_eq!(detail.moderators, vec![UserId::from(creator)]);

    assert!(env
        .service
        .is_moderator(channel.id, UserId::from(creator))
        .await
        .unwrap());
}

#[tokio::test]
async fn create_rejects_invalid_slug() {
    let env = env();
    let result = env
        .service
        .create_channel(request("team chat!", Uuid::new_v4()))
        .await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::Validation { .. }))
    ));
}

#[tokio::test]
async fn duplicate_slug_conflicts_case_insensitively() {
    let env = env();
    let creator = Uuid::new_v4();

    let first = env
        .service
        .create_channel(request("team-chat", creator))
        .await
        .unwrap();

    let second = env
        .service
        .create_channel(request("TEAM-CHAT", Uuid::new_v4()))
        .await;
    assert!(matches!(
        second,
        Err(ApplicationError::Domain(DomainError::SlugTaken))
    ));

    // 第一个频道不受影响
    let detail = env.service.get_detail(first.id.into()).await.unwrap();
    assert_eq!(detail.name, "team-chat");
    assert_eq!(detail.members.len(), 1);
}

#[tokio::test]
async fn join_is_idempotent() {
    let env = env();
    let creator = Uuid::new_v4();
    let joiner = Uuid::new_v4();

    let channel = env
        .service
        .create_channel(request("general", creator))
        .await
        .unwrap();

    env.service.join(channel.id.into(), joiner).await.unwrap();
    env.service.join(channel.id.into(), joiner).await.unwrap();

    assert_eq!(env.repo.member_count(channel.id), 2);
    assert!(env
        .service
        .is_member(channel.id, UserId::from(joiner))
        .await
        .unwrap());
    // 普通成员不是版主
    assert!(!env
        .service
        .is_moderator(channel.id, UserId::from(joiner))
        .await
        .unwrap());
}

#[tokio::test]
async fn join_missing_channel_is_not_found() {
    let env = env();
    let result = env.service.join(Uuid::new_v4(), Uuid::new_v4()).await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::ChannelNotFound))
    ));
}

#[tokio::test]
async fn leave_is_idempotent_for_non_members() {
    let env = env();
    let channel = env
        .service
        .create_channel(request("general", Uuid::new_v4()))
        .await
        .unwrap();

    // 从未加入的用户退出也不报错
    env.service
        .leave(channel.id.into(), Uuid::new_v4())
        .await
        .unwrap();
    assert_eq!(env.repo.member_count(channel.id), 1);
}

#[tokio::test]
async fn list_public_excludes_private_and_sorts_by_activity() {
    let env = env();
    let creator = Uuid::new_v4();

    let older = env
        .service
        .create_channel(request("older", creator))
        .await
        .unwrap();
    env.clock.advance_secs(10);
    let newer = env
        .service
        .create_channel(request("newer", creator))
        .await
        .unwrap();

    let mut private = request("secret", creator);
    private.is_private = true;
    env.service.create_channel(private).await.unwrap();

    let listed = env.service.list_public().await.unwrap();
    let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["newer", "older"]);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);
}

#[tokio::test]
async fn detail_resolves_members_with_placeholder_fallback() {
    let env = env();
    let creator = Uuid::new_v4();

    let channel = env
        .service
        .create_channel(request("general", creator))
        .await
        .unwrap();

    env.directory.insert(UserSummary {
        id: UserId::from(creator),
        username: "alice".into(),
        name: "Alice".into(),
        photo: None,
    });

    let known = Uuid::new_v4();
    env.service.join(channel.id.into(), known).await.unwrap();

    let detail = env.service.get_detail(channel.id.into()).await.unwrap();
    assert_eq!(detail.members.len(), 2);
    assert_eq!(detail.members[0].username, "alice");
    // 目录里没有的成员退化为占位摘要，而不是整体失败
    assert_eq!(detail.members[1].username, "unknown");
}

#[tokio::test]
async fn detail_missing_channel_is_not_found() {
    let env = env();
    let result = env.service.get_detail(Uuid::new_v4()).await;
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::ChannelNotFound))
    ));
}
