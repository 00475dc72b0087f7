// ==========================================
// 利用率合并引擎 - 导入接口定义
// ==========================================
// 职责: 定义网格加载与表格提取接口（不包含实现）
// 红线: 两种提取策略共用一个契约，由调用方按数据源选择
// ==========================================

use crate::domain::types::SourceKind;
use crate::domain::utilization::NormalizedRow;
use crate::importer::diagnostics::Diagnostics;
use crate::importer::error::{ImportError, ImportErrorKind, ImportResult};
use crate::importer::grid::Grid;
use crate::importer::header_locator::ColumnMap;

// ==========================================
// GridLoader Trait
// ==========================================
// 用途: 内存字节 → 网格（阶段 0）
// 实现者: ExcelParser, CsvParser, UniversalFileParser
pub trait GridLoader: Send + Sync {
    /// 读取第一个工作表
    ///
    /// # 参数
    /// - file_name: 文件名（用于选择格式与诊断）
    /// - bytes: 文件内容
    ///
    /// # 返回
    /// - Ok(Grid): 网格
    /// - Err: NoSheetsFound / EmptySheet / 格式错误
    fn load_grid(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Grid>;
}

// ==========================================
// 提取结果
// ==========================================

/// 提取成功: 归一化行 + 有序诊断
#[derive(Debug, Clone)]
pub struct ExtractedSheet {
    pub rows: Vec<NormalizedRow>,
    pub diagnostics: Vec<String>,
}

/// 提取失败: 错误 + 有序诊断
#[derive(Debug)]
pub struct ExtractionFailure {
    pub error: ImportError,
    pub diagnostics: Vec<String>,
}

impl ExtractionFailure {
    pub fn kind(&self) -> ImportErrorKind {
        self.error.kind()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

pub type ExtractionResult = Result<ExtractedSheet, ExtractionFailure>;

/// isValid / error 视图
pub trait ExtractionResultExt {
    fn is_valid(&self) -> bool;
    fn error_message(&self) -> Option<String>;
    fn diagnostics(&self) -> &[String];
}

impl ExtractionResultExt for ExtractionResult {
    fn is_valid(&self) -> bool {
        self.is_ok()
    }

    fn error_message(&self) -> Option<String> {
        self.as_ref().err().map(ExtractionFailure::message)
    }

    fn diagnostics(&self) -> &[String] {
        match self {
            Ok(sheet) => &sheet.diagnostics,
            Err(failure) => &failure.diagnostics,
        }
    }
}

// ==========================================
// SheetExtractor Trait
// ==========================================
// 用途: 网格 → NormalizedRow 列表
// 实现者: UtilizationSheetExtractor（固定偏移布局）
//         DeploymentPlanSheetExtractor（三列一组的动态布局）
pub trait SheetExtractor: Send + Sync {
    /// 该策略对应的数据源
    fn source(&self) -> SourceKind;

    /// 定位表头，生成列映射（只生成一次）
    fn locate(&self, grid: &Grid, diag: &mut Diagnostics) -> ImportResult<ColumnMap>;

    /// 按列映射逐行提取
    fn extract_rows(
        &self,
        grid: &Grid,
        columns: &ColumnMap,
        diag: &mut Diagnostics,
    ) -> ImportResult<Vec<NormalizedRow>>;

    /// 完整提取: 定位 → 逐行提取，诊断随结果返回
    fn extract(&self, grid: &Grid) -> ExtractionResult {
        let mut diag = Diagnostics::new();
        diag.push(format!(
            "开始解析工作表 '{}'（数据源 {}，共 {} 行）",
            grid.sheet_name(),
            self.source(),
            grid.row_count()
        ));

        let outcome = self
            .locate(grid, &mut diag)
            .and_then(|columns| self.extract_rows(grid, &columns, &mut diag));

        match outcome {
            Ok(rows) => {
                diag.push(format!("解析完成: 保留 {} 行", rows.len()));
                Ok(ExtractedSheet {
                    rows,
                    diagnostics: diag.into_lines(),
                })
            }
            Err(error) => {
                diag.push(format!("解析失败: {}", error));
                Err(ExtractionFailure {
                    error,
                    diagnostics: diag.into_lines(),
                })
            }
        }
    }
}
