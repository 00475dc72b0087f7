// ==========================================
// 利用率合并引擎 - 核心库
// ==========================================
// 输入: 两份独立维护的周度利用率表格（当前利用率 A / 部署计划 B）
// 输出: 每人每周一条的合并利用率序列
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 外部存储
pub mod repository;

// 引擎层 - 合并与流水线
pub mod engine;

// 导入层 - 表格解析
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigManager, IngestConfig};
pub use domain::{
    ConsolidatedEntry, ConsolidationStatus, NormalizedRow, PercentMetric, SourceKind, WeekKey,
};
pub use engine::{
    ConsolidationEngine, ConsolidationError, ConsolidationRun, IngestOutcome, Upload,
    UtilizationPipeline,
};
pub use importer::{
    DeploymentPlanSheetExtractor, ImportError, PersonKeyNormalizer, PercentValueParser,
    SheetExtractor, UtilizationSheetExtractor, WeekKeyResolver,
};
pub use repository::{
    RepositoryError, SqliteUtilizationRepository, StoreContext, UtilizationRepository,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "利用率合并引擎";
