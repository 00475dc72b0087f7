// ==========================================
// 利用率合并引擎 - 导入层
// ==========================================
// 职责: 表格字节 → 网格 → 列映射 → NormalizedRow
// 支持: Excel (.xlsx/.xls/.ods), CSV
// ==========================================

// 模块声明
pub mod deployment_plan_extractor;
pub mod diagnostics;
pub mod error;
pub mod file_parser;
pub mod grid;
pub mod header_locator;
pub mod percent;
pub mod person_key;
pub mod row_extraction;
pub mod sheet_extractor_trait;
pub mod utilization_extractor;
pub mod week_key;

// 重导出核心类型
pub use deployment_plan_extractor::{extractor_for, DeploymentPlanSheetExtractor};
pub use diagnostics::Diagnostics;
pub use error::{ImportError, ImportErrorKind, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use grid::{CellValue, Grid};
pub use header_locator::{ColumnMap, HeaderLocator, WeekColumn};
pub use percent::PercentValueParser;
pub use person_key::PersonKeyNormalizer;
pub use utilization_extractor::UtilizationSheetExtractor;
pub use week_key::{ResolvedWeek, WeekKeyResolver};

// 重导出 Trait 接口
pub use sheet_extractor_trait::{
    ExtractedSheet, ExtractionFailure, ExtractionResult, ExtractionResultExt, GridLoader,
    SheetExtractor,
};
