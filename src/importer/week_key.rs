// ==========================================
// 利用率合并引擎 - 周标签解析器
// ==========================================
// 职责: 自由文本周标签 → (周, 年) → 规范周键 YY/WW
// ==========================================
// 识别顺序（大小写不敏感，容忍空白）:
// 1. KW<w>(<yyyy>)
// 2. KW<w>/<yyyy> 或 KW<w>-<yyyy>
// 3. KW<yy>/<ww>   注意: 先两位年份、后周号（当前利用率表使用）
// ==========================================

use crate::domain::types::WeekKey;
use regex::Regex;
use std::sync::OnceLock;

/// 解析得到的周
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWeek {
    pub week: u32,
    pub year: i32,
}

impl ResolvedWeek {
    /// 规范周键
    pub fn key(&self) -> WeekKey {
        WeekKey::from_valid(self.week, self.year)
    }
}

struct WeekPatterns {
    week_paren_year: Regex,
    week_sep_year: Regex,
    short_year_week: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("周标签正则为静态常量")
}

fn patterns() -> &'static WeekPatterns {
    static PATTERNS: OnceLock<WeekPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| WeekPatterns {
        week_paren_year: compile(r"(?i)\bKW\s*(\d{1,2})\s*\(\s*(\d{4})\s*\)"),
        week_sep_year: compile(r"(?i)\bKW\s*(\d{1,2})\s*[/-]\s*(\d{4})\b"),
        short_year_week: compile(r"(?i)\bKW\s*(\d{2})\s*/\s*(\d{1,2})\b"),
    })
}

// ==========================================
// WeekKeyResolver
// ==========================================
pub struct WeekKeyResolver;

impl WeekKeyResolver {
    /// 解析周标签
    ///
    /// # 返回
    /// - Some(ResolvedWeek): 识别成功且周号 ∈ [1, 53]
    /// - None: 不是周标签，或周号越界（调用方按非周列处理）
    ///
    /// 按优先级取第一个匹配的格式；匹配但越界时直接返回 None，不再尝试后续格式。
    pub fn resolve(text: &str) -> Option<ResolvedWeek> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let p = patterns();

        let (week, year) = if let Some(caps) = p.week_paren_year.captures(text) {
            (caps[1].parse::<u32>().ok()?, caps[2].parse::<i32>().ok()?)
        } else if let Some(caps) = p.week_sep_year.captures(text) {
            (caps[1].parse::<u32>().ok()?, caps[2].parse::<i32>().ok()?)
        } else if let Some(caps) = p.short_year_week.captures(text) {
            // 操作数顺序相反: 第一个是两位年份
            let yy = caps[1].parse::<i32>().ok()?;
            (caps[2].parse::<u32>().ok()?, 2000 + yy)
        } else {
            return None;
        };

        if !(1..=53).contains(&week) {
            return None;
        }
        Some(ResolvedWeek { week, year })
    }

    /// 解析并直接返回规范周键
    pub fn resolve_key(text: &str) -> Option<WeekKey> {
        Self::resolve(text).map(|w| w.key())
    }

    /// 规范渲染: 年份后两位 + '/' + 两位周号
    pub fn to_key(week: u32, year: i32) -> Option<WeekKey> {
        WeekKey::new(week, year)
    }
}
