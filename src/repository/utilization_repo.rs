// ==========================================
// 利用率合并引擎 - 利用率 Repository Trait
// ==========================================
// 职责: 定义外部存储接口（不包含业务逻辑）
// 红线: Repository 不含合并规则，只做数据存取
// 凭据: 每次调用显式传入 StoreContext，没有全局令牌
// ==========================================

use crate::domain::types::SourceKind;
use crate::domain::utilization::{ConsolidatedEntry, FlatRecord, IngestBatch, NormalizedRow};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;

// ==========================================
// StoreContext - 调用上下文
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    pub actor: String,      // 操作人
    pub credential: String, // 存储凭据（由调用方注入）
}

impl StoreContext {
    pub fn new(actor: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            credential: credential.into(),
        }
    }

    /// 基本校验: 操作人与凭据都不能为空
    pub fn ensure_valid(&self) -> RepositoryResult<()> {
        if self.actor.trim().is_empty() {
            return Err(RepositoryError::InvalidCredential("操作人为空".to_string()));
        }
        if self.credential.trim().is_empty() {
            return Err(RepositoryError::InvalidCredential("凭据为空".to_string()));
        }
        Ok(())
    }
}

// ==========================================
// UtilizationRepository Trait
// ==========================================
// 实现者: SqliteUtilizationRepository（使用 rusqlite）
#[async_trait]
pub trait UtilizationRepository: Send + Sync {
    // ===== 数据源行（按数据源整体替换）=====

    /// 替换某个数据源的全部记录（后写覆盖先写）
    ///
    /// # 参数
    /// - source: 数据源
    /// - file_name: 源文件名（记录来源）
    /// - records: 扁平记录（周键为顶层字段）
    ///
    /// # 返回
    /// - Ok(usize): 写入的记录数
    async fn replace_source_rows(
        &self,
        ctx: &StoreContext,
        source: SourceKind,
        file_name: &str,
        records: Vec<FlatRecord>,
    ) -> RepositoryResult<usize>;

    /// 读取某个数据源最新持久化的行
    async fn load_source_rows(
        &self,
        ctx: &StoreContext,
        source: SourceKind,
    ) -> RepositoryResult<Vec<NormalizedRow>>;

    // ===== 合并结果（全量替换）=====

    async fn replace_consolidated(
        &self,
        ctx: &StoreContext,
        entries: Vec<ConsolidatedEntry>,
    ) -> RepositoryResult<usize>;

    async fn load_consolidated(&self, ctx: &StoreContext) -> RepositoryResult<Vec<ConsolidatedEntry>>;

    // ===== 上传批次 =====

    async fn insert_ingest_batch(&self, ctx: &StoreContext, batch: IngestBatch) -> RepositoryResult<()>;

    /// 查询最近的上传批次（按导入时间倒序）
    async fn recent_ingest_batches(&self, limit: usize) -> RepositoryResult<Vec<IngestBatch>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_context_validation() {
        assert!(StoreContext::new("anna", "token").ensure_valid().is_ok());
        assert!(matches!(
            StoreContext::new("", "token").ensure_valid(),
            Err(RepositoryError::InvalidCredential(_))
        ));
        assert!(StoreContext::new("anna", " ").ensure_valid().is_err());
    }
}
