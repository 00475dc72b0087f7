// ==========================================
// 利用率合并引擎 - 领域类型定义
// ==========================================
// 职责: 周键 / 数据源 / 百分比口径
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// WeekKey - 周键（YY/WW）
// ==========================================
// 红线: 周号 ∈ [1, 53]，年份取后两位，均补零
// 比较: 字符串相等；同一世纪内字典序即时间序
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekKey(String);

impl WeekKey {
    /// 由 (周, 年) 生成规范周键
    ///
    /// # 返回
    /// - Some(WeekKey): 周号合法
    /// - None: 周号超出 [1, 53]
    pub fn new(week: u32, year: i32) -> Option<Self> {
        if !(1..=53).contains(&week) {
            return None;
        }
        Some(Self(format!("{:02}/{:02}", year.rem_euclid(100), week)))
    }

    /// 已校验过周号的构造（仅供周标签解析器使用）
    pub(crate) fn from_valid(week: u32, year: i32) -> Self {
        debug_assert!((1..=53).contains(&week));
        Self(format!("{:02}/{:02}", year.rem_euclid(100), week))
    }

    /// 解析已是规范形式的周键字符串（用于持久化记录回读）
    pub fn parse_canonical(raw: &str) -> Option<Self> {
        let (yy, ww) = raw.split_once('/')?;
        if yy.len() != 2 || ww.len() != 2 {
            return None;
        }
        if !yy.bytes().all(|b| b.is_ascii_digit()) || !ww.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let week: u32 = ww.parse().ok()?;
        if !(1..=53).contains(&week) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 两位年份
    pub fn short_year(&self) -> u32 {
        self.0[..2].parse().unwrap_or(0)
    }

    /// 周号
    pub fn week_number(&self) -> u32 {
        self.0[3..].parse().unwrap_or(0)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==========================================
// SourceKind - 数据源
// ==========================================
// A: 当前利用率表（权威）
// B: 部署计划表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "A")]
    CurrentUtilization,
    #[serde(rename = "B")]
    DeploymentPlan,
}

impl SourceKind {
    /// 持久化与合并结果中使用的单字母代号
    pub fn code(&self) -> &'static str {
        match self {
            SourceKind::CurrentUtilization => "A",
            SourceKind::DeploymentPlan => "B",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "A" => Some(SourceKind::CurrentUtilization),
            "B" => Some(SourceKind::DeploymentPlan),
            _ => None,
        }
    }

    /// 另一个数据源
    pub fn other(&self) -> Self {
        match self {
            SourceKind::CurrentUtilization => SourceKind::DeploymentPlan,
            SourceKind::DeploymentPlan => SourceKind::CurrentUtilization,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::CurrentUtilization => write!(f, "A(当前利用率)"),
            SourceKind::DeploymentPlan => write!(f, "B(部署计划)"),
        }
    }
}

// ==========================================
// PercentMetric - 百分比口径
// ==========================================
// 由子表头文字决定，而非由表决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PercentMetric {
    Direct,  // 利用率
    Inverse, // 非利用率（NKV），存储值 = 100 - x
}

impl PercentMetric {
    /// 将解析后的数值转换为利用率，并截断到 [0, 100]、保留一位小数
    pub fn to_utilization(&self, parsed: f64) -> f64 {
        let raw = match self {
            PercentMetric::Direct => parsed,
            PercentMetric::Inverse => 100.0 - parsed,
        };
        round1(raw).clamp(0.0, 100.0)
    }
}

/// 四舍五入保留一位小数
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
