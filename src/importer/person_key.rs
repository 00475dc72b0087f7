// ==========================================
// 利用率合并引擎 - 人员关联键
// ==========================================
// 职责: 去掉括号注释、折叠空白，得到跨表关联键
// 红线: 不改变字母与大小写，否则两表中同一人员会静默失配
// ==========================================

pub struct PersonKeyNormalizer;

impl PersonKeyNormalizer {
    /// 生成关联键
    ///
    /// 例: "Muster,  Anna (extern)" → "Muster, Anna"
    pub fn normalize(raw: &str) -> String {
        let mut stripped = String::with_capacity(raw.len());
        let mut depth = 0usize;
        for ch in raw.chars() {
            match ch {
                '(' => depth += 1,
                ')' if depth > 0 => depth -= 1,
                _ if depth == 0 => stripped.push(ch),
                _ => {}
            }
        }
        // 未闭合的括号: 原样保留
        if depth > 0 {
            stripped = raw.to_string();
        }
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 是否为汇总行（Total / Summe / Gesamt / Sum）
    ///
    /// total / summe / gesamt 按子串匹配（Subtotal、Totals、Zwischensumme）；
    /// sum 只按整词匹配，"Summer" 之类的姓名不受影响
    pub fn is_summary_label(label: &str) -> bool {
        let lower = label.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }
        const SUMMARY_STEMS: [&str; 3] = ["total", "summe", "gesamt"];
        if SUMMARY_STEMS.iter().any(|stem| lower.contains(stem)) {
            return true;
        }
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == "sum")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_parentheses() {
        assert_eq!(PersonKeyNormalizer::normalize("Anna Muster (extern)"), "Anna Muster");
        assert_eq!(
            PersonKeyNormalizer::normalize("Muster,  Anna (50%) (TZ)"),
            "Muster, Anna"
        );
        assert_eq!(PersonKeyNormalizer::normalize("(neu) Max  Mustermann"), "Max Mustermann");
    }

    #[test]
    fn test_keeps_case_and_characters() {
        assert_eq!(PersonKeyNormalizer::normalize("  Jörg  ÜBEL "), "Jörg ÜBEL");
    }

    #[test]
    fn test_nested_and_unbalanced() {
        assert_eq!(PersonKeyNormalizer::normalize("Anna (a (b) c) Muster"), "Anna Muster");
        assert_eq!(PersonKeyNormalizer::normalize("Anna (extern"), "Anna (extern");
    }

    #[test]
    fn test_summary_labels() {
        assert!(PersonKeyNormalizer::is_summary_label("Total"));
        assert!(PersonKeyNormalizer::is_summary_label("SUMME"));
        assert!(PersonKeyNormalizer::is_summary_label("Summe Team A"));
        assert!(PersonKeyNormalizer::is_summary_label("Team Gesamt"));
        assert!(PersonKeyNormalizer::is_summary_label("Grand total"));
        assert!(PersonKeyNormalizer::is_summary_label("Sum"));
        assert!(PersonKeyNormalizer::is_summary_label("Gesamtsumme:"));
        assert!(PersonKeyNormalizer::is_summary_label("Total (alle Teams)"));
        assert!(PersonKeyNormalizer::is_summary_label("Subtotal"));
        assert!(PersonKeyNormalizer::is_summary_label("Totals"));
        assert!(PersonKeyNormalizer::is_summary_label("Teamtotal"));
        assert!(PersonKeyNormalizer::is_summary_label("Summen"));
        assert!(PersonKeyNormalizer::is_summary_label("Zwischensumme"));
        assert!(PersonKeyNormalizer::is_summary_label("Sum of hours"));
        assert!(!PersonKeyNormalizer::is_summary_label("Summer, Anna"));
        assert!(!PersonKeyNormalizer::is_summary_label("Sumi Tanaka"));
        assert!(!PersonKeyNormalizer::is_summary_label("Anna Muster"));
        assert!(!PersonKeyNormalizer::is_summary_label(""));
    }
}
