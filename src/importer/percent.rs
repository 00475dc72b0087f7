// ==========================================
// 利用率合并引擎 - 百分比解析器
// ==========================================
// 职责: 原始单元格 → [0, 100] 的百分比（一位小数）
// ==========================================
// 规则:
// - 空值 → None
// - 数值 ≤ 1.5 视为小数比例，×100（0.8 → 80）
// - 数值 > 1.5 视为百分数本身（80 → 80）
// - 文本: 去掉结尾 '%'，',' → '.'，再按数值处理
// 说明: 1.5 阈值对接近 1% 或 150% 的真实值有歧义，保持原口径不做修正
// ==========================================

use crate::domain::types::round1;
use crate::importer::grid::CellValue;

/// 默认小数/百分数分界阈值
pub const DEFAULT_FRACTION_THRESHOLD: f64 = 1.5;

#[derive(Debug, Clone, Copy)]
pub struct PercentValueParser {
    fraction_threshold: f64,
}

impl Default for PercentValueParser {
    fn default() -> Self {
        Self {
            fraction_threshold: DEFAULT_FRACTION_THRESHOLD,
        }
    }
}

impl PercentValueParser {
    pub fn new(fraction_threshold: f64) -> Self {
        Self { fraction_threshold }
    }

    /// 解析单元格
    pub fn parse_cell(&self, cell: &CellValue) -> Option<f64> {
        match cell {
            CellValue::Empty | CellValue::Bool(_) => None,
            CellValue::Number(n) => self.parse_number(*n),
            CellValue::Text(s) => self.parse_str(s),
        }
    }

    /// 解析文本（"80%"、"80,5"、"0.8"）
    pub fn parse_str(&self, raw: &str) -> Option<f64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let normalized = trimmed.trim_end_matches('%').trim().replace(',', ".");
        let value = normalized.parse::<f64>().ok()?;
        self.parse_number(value)
    }

    /// 解析数值
    pub fn parse_number(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let percent = if value <= self.fraction_threshold {
            value * 100.0
        } else {
            value
        };
        Some(round1(percent).clamp(0.0, 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PercentValueParser {
        PercentValueParser::default()
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(parser().parse_cell(&CellValue::Empty), None);
        assert_eq!(parser().parse_str("   "), None);
        assert_eq!(parser().parse_cell(&CellValue::Bool(true)), None);
    }

    #[test]
    fn test_fraction_heuristic() {
        assert_eq!(parser().parse_number(0.8), Some(80.0));
        assert_eq!(parser().parse_number(1.0), Some(100.0));
        assert_eq!(parser().parse_number(80.0), Some(80.0));
        assert_eq!(parser().parse_number(0.0), Some(0.0));
        // 阈值附近保持原口径
        assert_eq!(parser().parse_number(1.5), Some(100.0));
        assert_eq!(parser().parse_number(1.6), Some(1.6));
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(parser().parse_str("80%"), Some(80.0));
        assert_eq!(parser().parse_str("80,5"), Some(80.5));
        assert_eq!(parser().parse_str(" 75 % "), Some(75.0));
        assert_eq!(parser().parse_str("0,25"), Some(25.0));
        assert_eq!(parser().parse_str("abc"), None);
        assert_eq!(parser().parse_str("NaN"), None);
    }

    #[test]
    fn test_clamp_and_round() {
        assert_eq!(parser().parse_number(250.0), Some(100.0));
        assert_eq!(parser().parse_number(-0.2), Some(0.0));
        assert_eq!(parser().parse_number(0.12345), Some(12.3));
    }

    #[test]
    fn test_idempotence() {
        let p = parser();
        let inputs = [
            CellValue::Number(0.0),
            CellValue::Number(0.8),
            CellValue::Number(80.0),
            CellValue::text("80%"),
            CellValue::text("80,5"),
        ];
        for input in inputs {
            let first = p.parse_cell(&input).unwrap();
            let second = p.parse_str(&format!("{}%", first)).unwrap();
            assert_eq!(first, second, "输入 {:?}", input);
        }
    }
}
