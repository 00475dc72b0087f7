// ==========================================
// 利用率合并引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xlsm/.xls/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("工作簿读取失败: {0}")]
    WorkbookReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作簿中没有工作表")]
    NoSheetsFound,

    #[error("工作表为空: {0}")]
    EmptySheet(String),

    // ===== 表头与列识别错误 =====
    #[error("未找到表头: {0}")]
    HeaderNotFound(String),

    #[error("未找到匹配的周列: {0}")]
    NoWeekColumnsFound(String),

    // ===== 数据行错误 =====
    #[error("没有有效的人员行: {0}")]
    NoPersonRowsFound(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 错误种类（不带负载，便于调用方分支判断与持久化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportErrorKind {
    UnsupportedFormat,
    WorkbookRead,
    NoSheetsFound,
    EmptySheet,
    HeaderNotFound,
    NoWeekColumnsFound,
    NoPersonRowsFound,
    Other,
}

impl ImportError {
    pub fn kind(&self) -> ImportErrorKind {
        match self {
            ImportError::UnsupportedFormat(_) => ImportErrorKind::UnsupportedFormat,
            ImportError::WorkbookReadError(_) | ImportError::CsvParseError(_) => {
                ImportErrorKind::WorkbookRead
            }
            ImportError::NoSheetsFound => ImportErrorKind::NoSheetsFound,
            ImportError::EmptySheet(_) => ImportErrorKind::EmptySheet,
            ImportError::HeaderNotFound(_) => ImportErrorKind::HeaderNotFound,
            ImportError::NoWeekColumnsFound(_) => ImportErrorKind::NoWeekColumnsFound,
            ImportError::NoPersonRowsFound(_) => ImportErrorKind::NoPersonRowsFound,
            ImportError::Other(_) => ImportErrorKind::Other,
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::WorkbookReadError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
