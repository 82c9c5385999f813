//! 领域错误定义
//!
//! 错误分类对应对外的响应约定：校验 / 冲突 / 不存在属于业务上的
//! 预期失败，权限类错误单独区分，存储故障归入 RepositoryError。

use thiserror::Error;

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 输入校验失败
    #[error("validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// 频道标识符已被占用
    #[error("channel name taken")]
    SlugTaken,

    /// 频道不存在
    #[error("channel not found")]
    ChannelNotFound,

    /// 消息不存在
    #[error("message not found")]
    MessageNotFound,

    /// 用户不是频道成员
    #[error("not a channel member")]
    NotChannelMember,

    /// 没有执行该操作的权限
    #[error("not authorized: {action}")]
    NotAuthorized { action: String },

    /// 消息已被软删除，内容类操作不再允许
    #[error("message has been deleted")]
    MessageTombstoned,
}

impl DomainError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn not_authorized(action: impl Into<String>) -> Self {
        Self::NotAuthorized {
            action: action.into(),
        }
    }
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 存储层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// 记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一约束冲突
    #[error("record conflict")]
    Conflict,

    /// 底层存储故障
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
