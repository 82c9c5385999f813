//! 对外错误映射。
//!
//! 响应体统一为 `{success: false, message}`。业务上的预期失败
//! （校验、冲突、不存在、tombstone）保持 HTTP 200，客户端按
//! success 字段分支；401/403/500 保留给认证、权限和存储故障。

use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, RepositoryError};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 业务失败：HTTP 200 + success:false。
    pub fn expected(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error = %message, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        match error {
            ApplicationError::Domain(domain_err) => match domain_err {
                DomainError::Validation { field, reason } => {
                    ApiError::expected(format!("{}: {}", field, reason))
                }
                DomainError::SlugTaken => ApiError::expected("channel name already taken"),
                DomainError::ChannelNotFound => ApiError::expected("channel not found"),
                DomainError::MessageNotFound => ApiError::expected("message not found"),
                DomainError::MessageTombstoned => ApiError::expected("message has been deleted"),
                DomainError::NotChannelMember => ApiError::forbidden("not a channel member"),
                DomainError::NotAuthorized { action } => {
                    ApiError::forbidden(format!("not allowed to {}", action))
                }
            },
            ApplicationError::Repository(repo_err) => match repo_err {
                RepositoryError::NotFound => ApiError::expected("not found"),
                RepositoryError::Conflict => ApiError::expected("conflict"),
                RepositoryError::Storage { message } => ApiError::internal(message),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}
