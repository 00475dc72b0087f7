// ==========================================
// 利用率合并引擎 - 原始单元格网格
// ==========================================
// 职责: 工作表的内存表示（绝对坐标，0 基）
// 说明: 解析器只面向网格，不关心来源是 xlsx 还是 csv
// ==========================================

use std::fmt;

/// 原始单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// 文本单元格（空白文本视为空单元格）
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 单元格的文本表示（已 TRIM）
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

// 整数值不带小数部分输出（25.0 → "25"）
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ==========================================
// Grid - 单个工作表的单元格网格
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    sheet_name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new(sheet_name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            rows,
        }
    }

    /// 由文本二维数组构造（空字符串 → 空单元格）
    pub fn from_text_rows<R, C>(sheet_name: &str, rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| CellValue::text(c.as_ref())).collect())
            .collect();
        Self::new(sheet_name, rows)
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(CellValue::is_empty))
    }

    /// 行切片（越界返回空切片）
    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 单元格（越界返回空单元格）
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// 单元格文本（已 TRIM）
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).as_text()
    }

    /// 单元格文本，空值返回 None
    pub fn text_opt(&self, row: usize, col: usize) -> Option<String> {
        let text = self.text(row, col);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn width(&self, row: usize) -> usize {
        self.row(row).len()
    }
}
