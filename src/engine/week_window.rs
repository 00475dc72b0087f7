// ==========================================
// 利用率合并引擎 - 合并周窗口
// ==========================================
// 窗口: 当前 ISO 周之前 H 周 + 当前周 + 之后 F 周
// 当前周计为历史周
// ==========================================

use crate::domain::types::WeekKey;
use chrono::{Datelike, Duration, NaiveDate};

#[derive(Debug, Clone, PartialEq)]
pub struct TargetWeek {
    pub key: WeekKey,
    pub year: i32,        // ISO 年（四位）
    pub week_number: u32, // ISO 周号
    pub is_historical: bool,
}

/// 生成按时间排序的目标周列表
///
/// # 参数
/// - today: 参考日期
/// - historical_weeks: 当前周之前的周数
/// - forecast_weeks: 当前周之后的周数
pub fn target_weeks(today: NaiveDate, historical_weeks: u32, forecast_weeks: u32) -> Vec<TargetWeek> {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let from = -(historical_weeks as i64);
    let to = forecast_weeks as i64;

    (from..=to)
        .filter_map(|offset| {
            let iso = (monday + Duration::weeks(offset)).iso_week();
            WeekKey::new(iso.week(), iso.year()).map(|key| TargetWeek {
                key,
                year: iso.year(),
                week_number: iso.week(),
                is_historical: offset <= 0,
            })
        })
        .collect()
}
