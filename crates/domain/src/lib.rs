//! 频道消息系统核心领域模型
//!
//! 包含频道、成员、消息等核心实体，以及相关的业务规则。
//! 这一层不做任何 I/O。

pub mod channel;
pub mod errors;
pub mod member;
pub mod message;
pub mod user;
pub mod value_objects;

pub use channel::{Channel, ChannelVisibility};
pub use errors::{DomainError, DomainResult, RepositoryError};
pub use member::{ChannelMember, ChannelRole};
pub use message::{Message, Reaction, Reply};
pub use user::UserSummary;
pub use value_objects::{ChannelId, ChannelSlug, MessageId, Timestamp, UserId};
