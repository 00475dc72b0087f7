// ==========================================
// 利用率合并引擎 - 当前利用率表提取器（数据源 A）
// ==========================================
// 布局: 固定偏移
// - 表头第 4 行，数据自第 9 行
// - A–D: LoB / Bereich / CC / Team，E: 人员
// - E 列之后: 可选 LBS / VG，随后为周列（KW<yy>/<ww>）
// - team 列为 "Total" 的行为插入表中的合计行，跳过
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

pub struct UtilizationSheetExtractor {
    locator: HeaderLocator,
    parser: PercentValueParser,
}

impl UtilizationSheetExtractor {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            locator: HeaderLocator::new(config),
            parser: PercentValueParser::new(config.fraction_threshold),
        }
    }
}

impl Default for UtilizationSheetExtractor {
    fn default() -> Self {
        Self::new(&IngestConfig::default())
    }
}

impl SheetExtractor for UtilizationSheetExtractor {
    fn source(&self) -> SourceKind {
        SourceKind::CurrentUtilization
    }

    fn locate(&self, grid: &Grid, diag: &mut Diagnostics) -> ImportResult<ColumnMap> {
        self.locator.locate_fixed(grid, diag)
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
