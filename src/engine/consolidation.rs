// ==========================================
// 利用率合并引擎 - 合并引擎
// ==========================================
// 输入: 数据源 A（当前利用率，权威）+ 数据源 B（部署计划）的 NormalizedRow
// 输出: ConsolidatedEntry（每个 人员×周 一条）+ 合并状态摘要
// ==========================================
// 规则:
// 1. 人员集合 = A ∪ B
// 2. A 有值取 A，否则取 B；都没有则不产生条目（缺失不是 0）
// 3. 一侧完全缺失: 仍然合并，条目标记 is_partial + missing_source
// 4. 两侧都缺失: NoDataAvailable（致命）
// 每次全量重算，不做增量修补
// ==========================================

use crate::config::IngestConfig;
use crate::domain::types::SourceKind;
use crate::domain::utilization::{
    composite_key, ConsolidatedEntry, ConsolidationStatus, NormalizedRow,
};
use crate::engine::week_window::{target_weeks, TargetWeek};
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum ConsolidationError {
    #[error("没有可用数据: 数据源 A 与 B 均无记录")]
    NoDataAvailable,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type ConsolidationResult<T> = Result<T, ConsolidationError>;

/// 一次合并的结果
#[derive(Debug, Clone)]
pub struct ConsolidationOutcome {
    pub entries: Vec<ConsolidatedEntry>,
    pub status: ConsolidationStatus,
}

// ==========================================
// ConsolidationEngine
// ==========================================
pub struct ConsolidationEngine {
    historical_weeks: u32,
    forecast_weeks: u32,
}

impl Default for ConsolidationEngine {
    fn default() -> Self {
        Self::new(&IngestConfig::default())
    }
}

impl ConsolidationEngine {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            historical_weeks: config.historical_weeks,
            forecast_weeks: config.forecast_weeks,
        }
    }

    /// 合并两个数据源
    ///
    /// # 参数
    /// - source_a: 当前利用率表的行（可为空）
    /// - source_b: 部署计划表的行（可为空）
    /// - today: 参考日期（决定当前 ISO 周）
    ///
    /// # 返回
    /// - Ok(ConsolidationOutcome): 条目 + 状态（部分合并不是错误）
    /// - Err(NoDataAvailable): 两个数据源都为空
    #[instrument(skip(self, source_a, source_b), fields(a_rows = source_a.len(), b_rows = source_b.len(), %today))]
    pub fn consolidate(
        &self,
        source_a: &[NormalizedRow],
        source_b: &[NormalizedRow],
        today: NaiveDate,
    ) -> ConsolidationResult<ConsolidationOutcome> {
        let status = Self::status(source_a.len(), source_b.len())?;
        let is_partial = !status.can_fully_consolidate;
        if is_partial {
            warn!(missing = ?status.missing_source, "部分合并: {}", status.message);
        }

        let index_a = index_by_person(source_a);
        let index_b = index_by_person(source_b);
        let weeks = target_weeks(today, self.historical_weeks, self.forecast_weeks);

        // 人员按首次出现的顺序（先 A 后 B）
        let mut seen = HashSet::new();
        let persons: Vec<&str> = source_a
            .iter()
            .chain(source_b.iter())
            .map(|row| row.person.as_str())
            .filter(|person| seen.insert(*person))
            .collect();

        let mut entries = Vec::new();
        for person in persons {
            let row_a = index_a.get(person).copied();
            let row_b = index_b.get(person).copied();
            for week in &weeks {
                if let Some(entry) =
                    build_entry(person, week, row_a, row_b, is_partial, status.missing_source)
                {
                    entries.push(entry);
                }
            }
        }

        info!(
            entries = entries.len(),
            weeks = weeks.len(),
            partial = is_partial,
            "合并完成"
        );
        Ok(ConsolidationOutcome { entries, status })
    }

    fn status(a_rows: usize, b_rows: usize) -> ConsolidationResult<ConsolidationStatus> {
        let (can_fully_consolidate, missing_source, message) = match (a_rows, b_rows) {
            (0, 0) => return Err(ConsolidationError::NoDataAvailable),
            (0, _) => (
                false,
                Some(SourceKind::CurrentUtilization),
                "缺少数据源 A（当前利用率），仅使用部署计划合并".to_string(),
            ),
            (_, 0) => (
                false,
                Some(SourceKind::DeploymentPlan),
                "缺少数据源 B（部署计划），仅使用当前利用率合并".to_string(),
            ),
            _ => (true, None, "两个数据源均可用，完整合并".to_string()),
        };
        Ok(ConsolidationStatus {
            can_fully_consolidate,
            missing_source,
            source_a_rows: a_rows,
            source_b_rows: b_rows,
            message,
        })
    }
}

// 同一数据源内重复的人员键: 保留第一行
fn index_by_person(rows: &[NormalizedRow]) -> HashMap<&str, &NormalizedRow> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(row.person.as_str()).or_insert(row);
    }
    index
}

fn build_entry(
    person: &str,
    week: &TargetWeek,
    row_a: Option<&NormalizedRow>,
    row_b: Option<&NormalizedRow>,
    is_partial: bool,
    missing_source: Option<SourceKind>,
) -> Option<ConsolidatedEntry> {
    let source_a_value = row_a.and_then(|r| r.value_for(&week.key));
    let source_b_value = row_b.and_then(|r| r.value_for(&week.key));

    let (final_value, source) = match (source_a_value, source_b_value) {
        (Some(a), _) => (a, SourceKind::CurrentUtilization),
        (None, Some(b)) => (b, SourceKind::DeploymentPlan),
        (None, None) => return None,
    };

    // 元数据优先取 A 行，保证同一人员各周的 composite_key 一致
    let meta = row_a.or(row_b)?;
    Some(ConsolidatedEntry {
        person: person.to_string(),
        week: week.key.clone(),
        year: week.year,
        week_number: week.week_number,
        source_a_value,
        source_b_value,
        final_value,
        is_historical: week.is_historical,
        is_partial,
        missing_source,
        source,
        composite_key: composite_key(person, meta.team.as_deref(), meta.cc.as_deref()),
        lob: meta.lob.clone(),
        bereich: meta.bereich.clone(),
        cc: meta.cc.clone(),
        team: meta.team.clone(),
        lbs: meta.lbs.clone(),
    })
}
