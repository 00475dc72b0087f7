// ==========================================
// 利用率合并引擎 - 部署计划表提取器（数据源 B）
// ==========================================
// 布局: 动态三列组
// - 周表头行在前 10 行内动态发现，下一行为角色子表头
// - 每周三列（项目 / 分配% / 地点），数值列由角色关键词确定
// - 元数据列在第一个周列左侧按表头文字识别
// ==========================================

use crate::config::IngestConfig;
use crate::domain::types::SourceKind;
use crate::domain::utilization::NormalizedRow;
use crate::importer::diagnostics::Diagnostics;
use crate::importer::error::ImportResult;
use crate::importer::grid::Grid;
use crate::importer::header_locator::{ColumnMap, HeaderLocator};
use crate::importer::percent::PercentValueParser;
use crate::importer::row_extraction::extract_normalized_rows;
use crate::importer::sheet_extractor_trait::SheetExtractor;

pub struct DeploymentPlanSheetExtractor {
    locator: HeaderLocator,
    parser: PercentValueParser,
}

impl DeploymentPlanSheetExtractor {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            locator: HeaderLocator::new(config),
            parser: PercentValueParser::new(config.fraction_threshold),
        }
    }
}

impl Default for DeploymentPlanSheetExtractor {
    fn default() -> Self {
        Self::new(&IngestConfig::default())
    }
}

impl SheetExtractor for DeploymentPlanSheetExtractor {
    fn source(&self) -> SourceKind {
        SourceKind::DeploymentPlan
    }

    fn locate(&self, grid: &Grid, diag: &mut Diagnostics) -> ImportResult<ColumnMap> {
        self.locator.locate_dynamic(grid, diag)
    }

    fn extract_rows(
        &self,
        grid: &Grid,
        columns: &ColumnMap,
        diag: &mut Diagnostics,
    ) -> ImportResult<Vec<NormalizedRow>> {
        extract_normalized_rows(grid, columns, &self.parser, diag)
    }
}

/// 按数据源选择提取策略
pub fn extractor_for(source: SourceKind, config: &IngestConfig) -> Box<dyn SheetExtractor> {
    match source {
        SourceKind::CurrentUtilization => {
            Box::new(crate::importer::utilization_extractor::UtilizationSheetExtractor::new(config))
        }
        SourceKind::DeploymentPlan => Box::new(DeploymentPlanSheetExtractor::new(config)),
    }
}
