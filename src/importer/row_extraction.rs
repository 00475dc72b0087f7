// ==========================================
// 利用率合并引擎 - 数据行提取（两种布局共用）
// ==========================================
// 跳过规则（跳过不是错误）:
// - 人员单元格为空
// - 人员标签为汇总行（Total / Summe / Gesamt / Sum）
// - 固定布局: team 单元格为 "Total"
// - 没有任何有效周值（记录诊断）
// ==========================================

use crate::domain::utilization::NormalizedRow;
use crate::importer::diagnostics::Diagnostics;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::grid::Grid;
use crate::importer::header_locator::ColumnMap;
use crate::importer::percent::PercentValueParser;
use crate::importer::person_key::PersonKeyNormalizer;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Default)]
struct SkipStats {
    empty: usize,
    summary: usize,
    total_team: usize,
    no_values: usize,
    merged: usize,
}

/// 按列映射逐行提取 NormalizedRow
///
/// # 错误
/// - NoPersonRowsFound: 所有数据行都被跳过
pub fn extract_normalized_rows(
    grid: &Grid,
    columns: &ColumnMap,
    parser: &PercentValueParser,
    diag: &mut Diagnostics,
) -> ImportResult<Vec<NormalizedRow>> {
    let mut rows: Vec<NormalizedRow> = Vec::new();
    let mut index_by_person: HashMap<String, usize> = HashMap::new();
    let mut stats = SkipStats::default();

    for r in columns.data_start_row..grid.row_count() {
        let Some(person_display) = grid.text_opt(r, columns.person) else {
            stats.empty += 1;
            continue;
        };

        if PersonKeyNormalizer::is_summary_label(&person_display) {
            stats.summary += 1;
            diag.push(format!("第 {} 行: 汇总行 '{}'，跳过", r + 1, person_display));
            continue;
        }

        let meta = |col: Option<usize>| col.and_then(|c| grid.text_opt(r, c));
        let team = meta(columns.team);
        if columns.skip_total_team
            && team
                .as_deref()
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("total"))
        {
            stats.total_team += 1;
            diag.push(format!("第 {} 行: team 列为 Total，跳过", r + 1));
            continue;
        }

        let person = PersonKeyNormalizer::normalize(&person_display);
        if person.is_empty() {
            stats.empty += 1;
            diag.warn(format!(
                "第 {} 行: 人员标签 '{}' 去掉注释后为空，跳过",
                r + 1,
                person_display
            ));
            continue;
        }

        let mut row = NormalizedRow::new(person.clone(), person_display.clone());
        row.lob = meta(columns.lob);
        row.bereich = meta(columns.bereich);
        row.cc = meta(columns.cc);
        row.team = team;
        row.lbs = meta(columns.lbs);
        row.vg = meta(columns.vg);

        for week in &columns.weeks {
            if let Some(parsed) = parser.parse_cell(grid.cell(r, week.column)) {
                row.values.insert(week.key.clone(), week.metric.to_utilization(parsed));
            }
        }

        if row.values.is_empty() {
            stats.no_values += 1;
            diag.warn(format!(
                "第 {} 行: '{}' 没有有效周值，跳过",
                r + 1,
                person_display
            ));
            continue;
        }

        match index_by_person.get(&person) {
            Some(&idx) => {
                merge_into(&mut rows[idx], row);
                stats.merged += 1;
                diag.warn(format!(
                    "第 {} 行: 人员 '{}' 重复出现，周值合并到首行",
                    r + 1,
                    person
                ));
            }
            None => {
                index_by_person.insert(person, rows.len());
                rows.push(row);
            }
        }
    }

    diag.push(format!(
        "数据行统计: 保留 {}，空人员 {}，汇总 {}，Total 团队 {}，无周值 {}，合并重复 {}",
        rows.len(),
        stats.empty,
        stats.summary,
        stats.total_team,
        stats.no_values,
        stats.merged
    ));
    info!(
        retained = rows.len(),
        empty = stats.empty,
        summary = stats.summary,
        total_team = stats.total_team,
        no_values = stats.no_values,
        merged = stats.merged,
        "数据行提取完成"
    );

    if rows.is_empty() {
        return Err(ImportError::NoPersonRowsFound(format!(
            "自第 {} 行起没有可保留的人员行",
            columns.data_start_row + 1
        )));
    }
    Ok(rows)
}

// 后出现的非空周值覆盖先出现的；元数据只补缺
fn merge_into(target: &mut NormalizedRow, later: NormalizedRow) {
    target.values.extend(later.values);
    let fill = |slot: &mut Option<String>, value: Option<String>| {
        if slot.is_none() {
            *slot = value;
        }
    };
    fill(&mut target.lob, later.lob);
    fill(&mut target.bereich, later.bereich);
    fill(&mut target.cc, later.cc);
    fill(&mut target.team, later.team);
    fill(&mut target.lbs, later.lbs);
    fill(&mut target.vg, later.vg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{PercentMetric, WeekKey};
    use crate::importer::header_locator::WeekColumn;

    fn columns(skip_total_team: bool) -> ColumnMap {
        ColumnMap {
            data_start_row: 1,
            person: 0,
            team: Some(1),
            weeks: vec![
                WeekColumn {
                    key: WeekKey::new(1, 2025).unwrap(),
                    column: 2,
                    metric: PercentMetric::Direct,
                    label: "Einsatz %".to_string(),
                },
                WeekColumn {
                    key: WeekKey::new(2, 2025).unwrap(),
                    column: 3,
                    metric: PercentMetric::Inverse,
                    label: "NKV".to_string(),
                },
            ],
            skip_total_team,
            ..Default::default()
        }
    }

    fn extract(grid: &Grid, skip_total_team: bool) -> ImportResult<Vec<NormalizedRow>> {
        extract_normalized_rows(
            grid,
            &columns(skip_total_team),
            &PercentValueParser::default(),
            &mut Diagnostics::new(),
        )
    }

    #[test]
    fn test_extract_values_and_metrics() {
        let grid = Grid::from_text_rows(
            "s",
            vec![
                vec!["Name", "Team", "KW1", "KW2"],
                vec!["Anna Muster (extern)", "Core", "0,8", "30%"],
            ],
        );
        let rows = extract(&grid, false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].person, "Anna Muster");
        assert_eq!(rows[0].person_display, "Anna Muster (extern)");
        assert_eq!(rows[0].value_for(&WeekKey::new(1, 2025).unwrap()), Some(80.0));
        assert_eq!(rows[0].value_for(&WeekKey::new(2, 2025).unwrap()), Some(70.0));
    }

    #[test]
    fn test_skip_rules() {
        let grid = Grid::from_text_rows(
            "s",
            vec![
                vec!["Name", "Team", "KW1", "KW2"],
                vec!["", "Core", "50", "50"],
                vec!["Summe", "Core", "50", "50"],
                vec!["Max", "Total", "50", "50"],
                vec!["Leer", "Core", "", ""],
                vec!["Anna", "Core", "50", ""],
            ],
        );
        let rows = extract(&grid, true).unwrap();
        let people: Vec<&str> = rows.iter().map(|r| r.person.as_str()).collect();
        assert_eq!(people, vec!["Anna"]);

        // 动态布局不按 team 列过滤
        let rows = extract(&grid, false).unwrap();
        let people: Vec<&str> = rows.iter().map(|r| r.person.as_str()).collect();
        assert_eq!(people, vec!["Max", "Anna"]);
    }

    #[test]
    fn test_duplicate_person_merged() {
        let grid = Grid::from_text_rows(
            "s",
            vec![
                vec!["Name", "Team", "KW1", "KW2"],
                vec!["Anna (Projekt A)", "", "40", ""],
                vec!["Anna  (Projekt B)", "Core", "", "10"],
            ],
        );
        let rows = extract(&grid, false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values.len(), 2);
        assert_eq!(rows[0].team.as_deref(), Some("Core"));
    }

    #[test]
    fn test_no_person_rows() {
        let grid = Grid::from_text_rows(
            "s",
            vec![vec!["Name", "Team", "KW1", "KW2"], vec!["Total", "", "1", "1"]],
        );
        let err = extract(&grid, false).unwrap_err();
        assert!(matches!(err, ImportError::NoPersonRowsFound(_)));
    }
}
