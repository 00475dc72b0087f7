// ==========================================
// 利用率合并引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含解析逻辑
// ==========================================

pub mod types;
pub mod utilization;

// 重导出核心类型
pub use types::{PercentMetric, SourceKind, WeekKey};
pub use utilization::{
    composite_key, ConsolidatedEntry, ConsolidationStatus, FlatRecord, IngestBatch,
    NormalizedRow,
};
