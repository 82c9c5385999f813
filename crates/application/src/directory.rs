use async_trait::async_trait;
use domain::{RepositoryError, UserId, UserSummary};

/// 用户目录：把用户 ID 解析为展示摘要。
///
/// 账号数据归外部系统所有，这里只读。调用方在查询失败或
/// 用户缺失时退化为占位摘要，不传播错误。
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_summary(&self, id: UserId) -> Result<Option<UserSummary>, RepositoryError>;

    async fn get_summaries(&self, ids: &[UserId]) -> Result<Vec<UserSummary>, RepositoryError>;
}
