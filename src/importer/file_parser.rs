// ==========================================
// 利用率合并引擎 - 文件解析器实现
// ==========================================
// 职责: 内存字节 → 第一个工作表的单元格网格
// 支持: Excel (.xlsx/.xlsm/.xls) / ODS / CSV
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::grid::{CellValue, Grid};
use crate::importer::sheet_extractor_trait::GridLoader;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl GridLoader for ExcelParser {
    fn load_grid(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Grid> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ImportError::WorkbookReadError(format!("{}: {}", file_name, e)))?;

        // 只读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names.first().cloned().ok_or(ImportError::NoSheetsFound)?;

        let range = workbook.worksheet_range(&sheet_name)?;
        if range.is_empty() {
            return Err(ImportError::EmptySheet(sheet_name));
        }

        let grid = range_to_grid(&sheet_name, &range);
        if grid.is_empty() {
            return Err(ImportError::EmptySheet(sheet_name));
        }
        Ok(grid)
    }
}

/// calamine Range → 绝对坐标网格
///
/// Range 从第一个非空单元格开始，这里补齐前导空行/空列，
/// 使固定行号布局（表头第 4 行、数据第 9 行）保持正确。
fn range_to_grid(sheet_name: &str, range: &Range<Data>) -> Grid {
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
    for data_row in range.rows() {
        let mut row = vec![CellValue::Empty; start_col];
        row.extend(data_row.iter().map(convert_cell));
        rows.push(row);
    }
    Grid::new(sheet_name, rows)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::text(s.as_str()),
        other => CellValue::text(other.to_string()),
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl GridLoader for CsvParser {
    fn load_grid(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Grid> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(detect_delimiter(bytes))
            .from_reader(bytes);

        let mut rows: Vec<Vec<CellValue>> = Vec::new();
        for result in reader.records() {
            let record = result?;
            // csv 会跳过空行: 按记录起始行号补齐，保持与 Excel 相同的绝对行号
            if let Some(line) = record.position().map(|p| p.line() as usize) {
                while rows.len() + 1 < line {
                    rows.push(Vec::new());
                }
            }
            rows.push(record.iter().map(CellValue::text).collect());
        }

        let grid = Grid::new(file_name, rows);
        if grid.row_count() == 0 || grid.is_empty() {
            return Err(ImportError::EmptySheet(file_name.to_string()));
        }
        Ok(grid)
    }
}

// 欧洲区域导出常用 ';' 分隔（小数点为 ','）
// 标题行通常不含分隔符，因此统计前若干个非空行
fn detect_delimiter(bytes: &[u8]) -> u8 {
    const SAMPLE_LINES: usize = 10;
    let (semicolons, commas) = bytes
        .split(|b| *b == b'\n')
        .filter(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .take(SAMPLE_LINES)
        .flatten()
        .copied()
        .fold((0usize, 0usize), |(s, c), b| match b {
            b';' => (s + 1, c),
            b',' => (s, c + 1),
            _ => (s, c),
        });
    if semicolons > 0 && semicolons >= commas {
        b';'
    } else {
        b','
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl GridLoader for UniversalFileParser {
    fn load_grid(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Grid> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.load_grid(file_name, bytes),
            // 无扩展名时交给 calamine 按内容识别
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" | "" => ExcelParser.load_grid(file_name, bytes),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ImportErrorKind;

    #[test]
    fn test_csv_parser_semicolon() {
        let csv = "Name;KW1/2025;KW2/2025\nAnna;80,5;0,7\n";
        let grid = CsvParser.load_grid("plan.csv", csv.as_bytes()).unwrap();
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.text(0, 1), "KW1/2025");
        assert_eq!(grid.text(1, 1), "80,5");
        assert_eq!(grid.sheet_name(), "plan.csv");
    }

    #[test]
    fn test_csv_parser_comma_and_ragged_rows() {
        let csv = "a,b,c\n1\n,,\n";
        let grid = CsvParser.load_grid("x.csv", csv.as_bytes()).unwrap();
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.width(1), 1);
        assert_eq!(grid.cell(2, 0), &CellValue::Empty);
    }

    #[test]
    fn test_csv_parser_keeps_blank_lines() {
        let csv = "Auslastung Q1\n\n\nName;KW1/2025;KW2/2025\n\nAnna;80;70\n";
        let grid = CsvParser.load_grid("a.csv", csv.as_bytes()).unwrap();
        assert_eq!(grid.row_count(), 6, "空行不应被吞掉");
        assert_eq!(grid.text(0, 0), "Auslastung Q1");
        assert_eq!(grid.width(1), 0);
        assert_eq!(grid.text(3, 1), "KW1/2025", "按 ';' 分隔");
        assert_eq!(grid.text(5, 0), "Anna");
    }

    #[test]
    fn test_csv_parser_blank_only_file() {
        let err = CsvParser.load_grid("x.csv", b"\n\n  \n").unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::EmptySheet);
    }

    #[test]
    fn test_csv_parser_empty_file() {
        let err = CsvParser.load_grid("x.csv", b"").unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::EmptySheet);
    }

    #[test]
    fn test_universal_parser_unsupported() {
        let err = UniversalFileParser.load_grid("report.pdf", b"%PDF").unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_excel_parser_garbage_bytes() {
        let err = ExcelParser.load_grid("broken.xlsx", b"not a workbook").unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::WorkbookRead);
    }

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell(&Data::Int(25)), CellValue::Number(25.0));
        assert_eq!(convert_cell(&Data::String("  ".into())), CellValue::Empty);
        assert_eq!(
            convert_cell(&Data::String("KW1".into())),
            CellValue::Text("KW1".into())
        );
    }

    #[test]
    fn test_range_to_grid_keeps_absolute_position() {
        let mut range: Range<Data> = Range::new((2, 1), (2, 2));
        range.set_value((2, 1), Data::String("Name".into()));
        range.set_value((2, 2), Data::Float(0.5));
        let grid = range_to_grid("Sheet1", &range);
        assert_eq!(grid.text(2, 1), "Name");
        assert_eq!(grid.cell(2, 2), &CellValue::Number(0.5));
        assert_eq!(grid.cell(0, 0), &CellValue::Empty);
        assert_eq!(grid.row_count(), 3);
    }
}
