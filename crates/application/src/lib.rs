//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理权限校验、持久化边界、
//! 以及对外部适配器（用户目录、事件广播）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod directory;
pub mod dto;
pub mod error;
pub mod hub;
pub mod identity;
pub mod repository;
pub mod services;

pub use broadcaster::{BroadcastError, ChannelEvent, EventPublisher, MessageDeletedPayload};
pub use clock::{Clock, SystemClock};
pub use directory::UserDirectory;
pub use dto::{ChannelSummaryView, ChannelView, MessageView, ReactionView, ReplyView};
pub use error::ApplicationError;
pub use hub::{BroadcastHub, EventStream};
pub use identity::Identity;
pub use repository::{ChannelListing, ChannelRepository, MessageRepository};
pub use services::{
    ChannelService, ChannelServiceDependencies, CreateChannelRequest, MessageService,
    MessageServiceDependencies, SendMessageRequest,
};
