//! 基础设施层实现。
//!
//! 提供 PostgreSQL 仓储和用户目录适配器，实现应用层定义的接口。

pub mod directory;
pub mod repository;

pub use directory::PgUserDirectory;
pub use repository::{create_pg_pool, PgChannelRepository, PgMessageRepository};
