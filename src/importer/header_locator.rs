// ==========================================
// 利用率合并引擎 - 表头定位器
// ==========================================
// 职责: 在原始网格中定位周表头行 / 角色子表头行，生成列映射
// 输出: ColumnMap（一次生成，传给提取器，避免散落的魔法下标）
// ==========================================
// 两种布局:
// - 动态布局（部署计划）: 前 N 行中第一个含 ≥3 个周标签的行为周表头，
//   下一行为角色子表头；每个周的数值列相对周单元格偏移 0..3 列
// - 固定布局（当前利用率）: 表头第 4 行、数据第 9 行（0 基: 3 / 8），
//   元数据列 A–D、人员列 E 按位置分配
// ==========================================

use crate::config::IngestConfig;
use crate::domain::types::{PercentMetric, WeekKey};
use crate::importer::diagnostics::Diagnostics;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::grid::Grid;
use crate::importer::week_key::WeekKeyResolver;
use std::collections::HashSet;

// ==========================================
// 关键词集合
// ==========================================

// 非利用率口径（NKV）: 先于直接口径判断
const INVERSE_KEYWORDS: [&str; 7] = [
    "nkv",
    "nicht",
    "non-util",
    "unausgelastet",
    "verfügbar",
    "available",
    "frei",
];

// 利用率 / 分配百分比
const DIRECT_KEYWORDS: [&str; 10] = [
    "auslastung",
    "utilization",
    "utilisation",
    "allocation",
    "allokation",
    "einsatz",
    "belegung",
    "prozent",
    "percent",
    "%",
];

// 非数值角色（项目 / 客户 / 地点），按词匹配
const NON_VALUE_PREFIXES: [&str; 4] = ["projekt", "project", "kunde", "customer"];

const PERSON_KEYWORDS: [&str; 6] = [
    "name",
    "mitarbeiter",
    "person",
    "employee",
    "ressource",
    "resource",
];

/// 角色标签 → 百分比口径
///
/// # 返回
/// - Some(Inverse): 含 NKV 类关键词
/// - Some(Direct): 含利用率类关键词
/// - None: 非数值角色或无法识别
pub fn classify_role(label: &str) -> Option<PercentMetric> {
    let lower = label.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    if INVERSE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(PercentMetric::Inverse);
    }
    if is_non_value_role(&lower) {
        return None;
    }
    if DIRECT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some(PercentMetric::Direct);
    }
    None
}

// "Einsatzort" / "Ort" 等地点列不能被 "einsatz" 误判为数值列；
// "Allocation" 含 "location" 子串，因此按词而非子串判断
fn is_non_value_role(lower: &str) -> bool {
    tokens(lower).any(|t| {
        t == "location"
            || t.ends_with("ort")
            || NON_VALUE_PREFIXES.iter().any(|p| t.starts_with(p))
    })
}

fn tokens(lower: &str) -> impl Iterator<Item = &str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

/// 是否为人员列表头
pub fn is_person_header(label: &str) -> bool {
    let lower = label.trim().to_lowercase();
    PERSON_KEYWORDS.iter().any(|k| lower.contains(k)) || tokens(&lower).any(|t| t == "ma")
}

/// 元数据列角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Person,
    Lob,
    Bereich,
    Cc,
    Team,
    Lbs,
    Vg,
}

/// 元数据列表头识别
pub fn classify_metadata(label: &str) -> Option<MetadataField> {
    let lower = label.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let has_token = |word: &str| tokens(&lower).any(|t| t == word);

    if has_token("lob") || lower.contains("line of business") {
        Some(MetadataField::Lob)
    } else if lower.contains("bereich") {
        Some(MetadataField::Bereich)
    } else if has_token("cc") || lower.contains("kostenstelle") || lower.contains("cost center") {
        Some(MetadataField::Cc)
    } else if has_token("lbs") {
        Some(MetadataField::Lbs)
    } else if has_token("vg") {
        Some(MetadataField::Vg)
    } else if lower.contains("team") {
        Some(MetadataField::Team)
    } else if is_person_header(&lower) {
        Some(MetadataField::Person)
    } else {
        None
    }
}

// ==========================================
// ColumnMap - 列映射
// ==========================================

/// 单个周的数值列
#[derive(Debug, Clone, PartialEq)]
pub struct WeekColumn {
    pub key: WeekKey,
    pub column: usize,         // 数值所在列
    pub metric: PercentMetric, // 由角色标签决定
    pub label: String,         // 角色标签原文（诊断用）
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnMap {
    pub week_header_row: usize,
    pub role_header_row: Option<usize>,
    pub data_start_row: usize,
    pub person: usize,
    pub lob: Option<usize>,
    pub bereich: Option<usize>,
    pub cc: Option<usize>,
    pub team: Option<usize>,
    pub lbs: Option<usize>,
    pub vg: Option<usize>,
    pub weeks: Vec<WeekColumn>,
    /// team 列为 "Total" 的行视为汇总行（固定布局）
    pub skip_total_team: bool,
}

impl ColumnMap {
    fn assign(&mut self, field: MetadataField, column: usize) -> bool {
        let slot = match field {
            MetadataField::Person => return false,
            MetadataField::Lob => &mut self.lob,
            MetadataField::Bereich => &mut self.bereich,
            MetadataField::Cc => &mut self.cc,
            MetadataField::Team => &mut self.team,
            MetadataField::Lbs => &mut self.lbs,
            MetadataField::Vg => &mut self.vg,
        };
        if slot.is_none() {
            *slot = Some(column);
            true
        } else {
            false
        }
    }
}

// ==========================================
// HeaderLocator
// ==========================================
pub struct HeaderLocator {
    scan_depth: usize,
    min_week_cells: usize,
    offset_window: usize,
    fixed_header_row: usize,
    fixed_data_start_row: usize,
}

// 固定布局的位置约定: A–D 元数据，E 人员
const FIXED_PERSON_COLUMN: usize = 4;

impl HeaderLocator {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            scan_depth: config.header_scan_depth,
            min_week_cells: config.min_week_cells,
            offset_window: config.role_offset_window,
            fixed_header_row: config.fixed_header_row,
            fixed_data_start_row: config.fixed_data_start_row,
        }
    }

    /// 查找周表头行: 前 scan_depth 行中第一个周标签数 ≥ min_week_cells 的行
    pub fn find_week_header_row(&self, grid: &Grid) -> Option<usize> {
        (0..grid.row_count().min(self.scan_depth)).find(|&row| {
            let count = grid
                .row(row)
                .iter()
                .filter(|cell| WeekKeyResolver::resolve(&cell.as_text()).is_some())
                .count();
            count >= self.min_week_cells
        })
    }

    // ==========================================
    // 动态布局（部署计划）
    // ==========================================

    /// 定位动态布局
    ///
    /// # 错误
    /// - HeaderNotFound: 扫描深度内没有周表头行，或其后没有子表头行
    /// - NoWeekColumnsFound: 没有任何周在偏移窗口内匹配到数值角色
    pub fn locate_dynamic(&self, grid: &Grid, diag: &mut Diagnostics) -> ImportResult<ColumnMap> {
        let week_row = self.find_week_header_row(grid).ok_or_else(|| {
            ImportError::HeaderNotFound(format!(
                "前 {} 行中没有包含至少 {} 个周标签的行",
                self.scan_depth, self.min_week_cells
            ))
        })?;
        let role_row = week_row + 1;
        if role_row >= grid.row_count() {
            return Err(ImportError::HeaderNotFound(format!(
                "周表头位于第 {} 行，但其后没有角色子表头行",
                week_row + 1
            )));
        }
        diag.push(format!(
            "周表头: 第 {} 行，角色子表头: 第 {} 行",
            week_row + 1,
            role_row + 1
        ));

        // 周单元格所在列
        let week_cells: Vec<(usize, WeekKey)> = grid
            .row(week_row)
            .iter()
            .enumerate()
            .filter_map(|(col, cell)| {
                WeekKeyResolver::resolve(&cell.as_text()).map(|w| (col, w.key()))
            })
            .collect();

        let mut map = ColumnMap {
            week_header_row: week_row,
            role_header_row: Some(role_row),
            data_start_row: role_row + 1,
            ..Default::default()
        };

        let role_width = grid.width(role_row);
        let mut seen = HashSet::new();
        for (idx, (week_col, key)) in week_cells.iter().enumerate() {
            // 偏移窗口不得越过下一个周单元格
            let limit = week_cells
                .get(idx + 1)
                .map(|(next, _)| *next)
                .unwrap_or(usize::MAX)
                .min(week_col + self.offset_window + 1)
                .min(role_width.max(week_col + 1));

            match self.pick_value_column(grid, role_row, *week_col, limit) {
                Some((column, metric, label)) => {
                    if !seen.insert(key.clone()) {
                        diag.warn(format!("周 {} 重复出现（第 {} 列），忽略", key, week_col + 1));
                        continue;
                    }
                    diag.push(format!(
                        "周 {}: 数值列 {}（偏移 {}，角色 '{}'，口径 {:?}）",
                        key,
                        column + 1,
                        column - week_col,
                        label,
                        metric
                    ));
                    map.weeks.push(WeekColumn {
                        key: key.clone(),
                        column,
                        metric,
                        label,
                    });
                }
                None => diag.warn(format!(
                    "周 {}（第 {} 列）在偏移 0..{} 内没有匹配的数值角色",
                    key,
                    week_col + 1,
                    self.offset_window
                )),
            }
        }

        if map.weeks.is_empty() {
            return Err(ImportError::NoWeekColumnsFound(format!(
                "找到 {} 个周标签，但没有列满足角色关键词",
                week_cells.len()
            )));
        }

        let first_week_col = week_cells.first().map(|(c, _)| *c).unwrap_or(0);
        self.assign_dynamic_metadata(grid, week_row, role_row, first_week_col, &mut map, diag)?;
        Ok(map)
    }

    // 优先直接口径列，其次 NKV 列
    fn pick_value_column(
        &self,
        grid: &Grid,
        role_row: usize,
        week_col: usize,
        limit: usize,
    ) -> Option<(usize, PercentMetric, String)> {
        let candidates: Vec<(usize, PercentMetric, String)> = (week_col..limit)
            .filter_map(|col| {
                let label = grid.text(role_row, col);
                classify_role(&label).map(|metric| (col, metric, label))
            })
            .collect();

        candidates
            .iter()
            .find(|(_, metric, _)| *metric == PercentMetric::Direct)
            .or_else(|| candidates.first())
            .cloned()
    }

    fn assign_dynamic_metadata(
        &self,
        grid: &Grid,
        week_row: usize,
        role_row: usize,
        first_week_col: usize,
        map: &mut ColumnMap,
        diag: &mut Diagnostics,
    ) -> ImportResult<()> {
        let mut person = None;
        for col in 0..first_week_col {
            // 子表头优先，合并单元格时回退到周表头行
            let label = grid
                .text_opt(role_row, col)
                .or_else(|| grid.text_opt(week_row, col))
                .unwrap_or_default();
            match classify_metadata(&label) {
                Some(MetadataField::Person) if person.is_none() => {
                    person = Some(col);
                    diag.push(format!("人员列: 第 {} 列（'{}'）", col + 1, label));
                }
                Some(field) => {
                    if map.assign(field, col) {
                        diag.push(format!("元数据列 {:?}: 第 {} 列", field, col + 1));
                    }
                }
                None => {}
            }
        }

        map.person = match person {
            Some(col) => col,
            None if first_week_col > 0 => {
                diag.warn("未找到人员列表头，使用第 1 列");
                0
            }
            None => {
                return Err(ImportError::HeaderNotFound(
                    "周列从第 1 列开始，没有人员列".to_string(),
                ))
            }
        };
        Ok(())
    }

    // ==========================================
    // 固定布局（当前利用率）
    // ==========================================

    /// 定位固定布局
    ///
    /// # 错误
    /// - HeaderNotFound: 表格行数不足以包含固定表头行
    /// - NoWeekColumnsFound: 表头行中人员列之后没有周标签
    pub fn locate_fixed(&self, grid: &Grid, diag: &mut Diagnostics) -> ImportResult<ColumnMap> {
        let header_row = self.fixed_header_row;
        if grid.row_count() <= header_row {
            return Err(ImportError::HeaderNotFound(format!(
                "表格只有 {} 行，固定表头应位于第 {} 行",
                grid.row_count(),
                header_row + 1
            )));
        }
        diag.push(format!(
            "固定布局: 表头第 {} 行，数据自第 {} 行",
            header_row + 1,
            self.fixed_data_start_row + 1
        ));

        let person_header = grid.text(header_row, FIXED_PERSON_COLUMN);
        if !is_person_header(&person_header) {
            diag.warn(format!(
                "人员列（E 列）表头 '{}' 不含预期关键词",
                person_header
            ));
        }

        // 表头下方、数据区之前的一行可承载角色标签
        let role_row = header_row + 1;
        let role_row = (role_row < self.fixed_data_start_row).then_some(role_row);

        let mut map = ColumnMap {
            week_header_row: header_row,
            role_header_row: role_row,
            data_start_row: self.fixed_data_start_row,
            person: FIXED_PERSON_COLUMN,
            lob: Some(0),
            bereich: Some(1),
            cc: Some(2),
            team: Some(3),
            skip_total_team: true,
            ..Default::default()
        };

        let mut seen = HashSet::new();
        for col in (FIXED_PERSON_COLUMN + 1)..grid.width(header_row) {
            let header = grid.text(header_row, col);
            let Some(week) = WeekKeyResolver::resolve(&header) else {
                // 人员列之后、周列之前的元数据列
                if map.weeks.is_empty() {
                    if let Some(field) = classify_metadata(&header) {
                        if map.assign(field, col) {
                            diag.push(format!("元数据列 {:?}: 第 {} 列", field, col + 1));
                        }
                    }
                }
                continue;
            };
            let key = week.key();
            if !seen.insert(key.clone()) {
                diag.warn(format!("周 {} 重复出现（第 {} 列），忽略", key, col + 1));
                continue;
            }

            let role_label = match role_row.and_then(|r| grid.text_opt(r, col)) {
                Some(sub) => format!("{} {}", header, sub),
                None => header.clone(),
            };
            let metric = classify_role(&role_label).unwrap_or(PercentMetric::Direct);
            diag.push(format!(
                "周 {}: 第 {} 列（标签 '{}'，口径 {:?}）",
                key,
                col + 1,
                role_label,
                metric
            ));
            map.weeks.push(WeekColumn {
                key,
                column: col,
                metric,
                label: role_label,
            });
        }

        if map.weeks.is_empty() {
            return Err(ImportError::NoWeekColumnsFound(format!(
                "第 {} 行人员列之后没有可识别的周标签",
                header_row + 1
            )));
        }
        Ok(map)
    }
}
