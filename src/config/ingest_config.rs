// ==========================================
// 利用率合并引擎 - 导入与合并参数
// ==========================================
// 职责: 汇总所有可调常量（表头扫描、固定布局位置、周窗口、小数阈值）
// 存储: 默认值在此定义，覆写值来自 config_kv（见 ConfigManager）
// ==========================================

use crate::importer::percent::DEFAULT_FRACTION_THRESHOLD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    // ===== 表头定位 =====
    /// 周表头行的最大扫描深度
    pub header_scan_depth: usize,
    /// 周表头行至少包含的周标签数
    pub min_week_cells: usize,
    /// 角色列相对周单元格的最大偏移
    pub role_offset_window: usize,

    // ===== 固定布局（0 基） =====
    pub fixed_header_row: usize,
    pub fixed_data_start_row: usize,

    // ===== 合并周窗口 =====
    /// 当前周之前的历史周数
    pub historical_weeks: u32,
    /// 当前周之后的预测周数
    pub forecast_weeks: u32,

    // ===== 百分比 =====
    /// 不大于该值的数字视为小数比例（×100）
    pub fraction_threshold: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_scan_depth: 10,
            min_week_cells: 3,
            role_offset_window: 3,
            fixed_header_row: 3,
            fixed_data_start_row: 8,
            historical_weeks: 8,
            forecast_weeks: 12,
            fraction_threshold: DEFAULT_FRACTION_THRESHOLD,
        }
    }
}
