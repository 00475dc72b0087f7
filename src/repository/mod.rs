// ==========================================
// 利用率合并引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 外部存储接口 + SQLite 实现
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod utilization_repo;
pub mod utilization_repo_impl;

pub use error::{RepositoryError, RepositoryResult};
pub use utilization_repo::{StoreContext, UtilizationRepository};
pub use utilization_repo_impl::SqliteUtilizationRepository;
