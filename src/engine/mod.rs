// ==========================================
// 利用率合并引擎 - 引擎层
// ==========================================
// 职责: 周窗口、两数据源合并、上传流水线编排
// 红线: Engine 不拼 SQL，存取经由 UtilizationRepository
// ==========================================

pub mod consolidation;
pub mod pipeline;
pub mod week_window;

// 重导出核心引擎
pub use consolidation::{
    ConsolidationEngine, ConsolidationError, ConsolidationOutcome, ConsolidationResult,
};
pub use pipeline::{ConsolidationRun, IngestOutcome, Upload, UtilizationPipeline};
pub use week_window::{target_weeks, TargetWeek};
