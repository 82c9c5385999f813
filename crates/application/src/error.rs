use domain::{DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApplicationError {
    /// 业务上的预期失败（校验、冲突、不存在、权限），
    /// 区别于需要报 500 的存储故障。
    pub fn is_expected(&self) -> bool {
        !matches!(
            self,
            ApplicationError::Repository(RepositoryError::Storage { .. })
        )
    }
}
