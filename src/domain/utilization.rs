// ==========================================
// 利用率合并引擎 - 利用率领域模型
// ==========================================
// 职责: NormalizedRow（单源归一化行）/ ConsolidatedEntry（合并结果）
// 用途: 导入层写入，合并引擎只读，仓储层持久化
// ==========================================

use crate::domain::types::{SourceKind, WeekKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 持久化扁平记录（周键直接作为顶层字段）
pub type FlatRecord = Map<String, Value>;

// 扁平记录中的固定字段名
const FIELD_PERSON: &str = "person";
const FIELD_PERSON_DISPLAY: &str = "personDisplay";
const METADATA_FIELDS: [&str; 6] = ["lob", "bereich", "cc", "team", "lbs", "vg"];

// ==========================================
// NormalizedRow - 单源归一化行
// ==========================================
// 红线: 提取后不可变，合并后丢弃
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRow {
    pub person: String,         // 关联键（去括号注释 + 折叠空白）
    pub person_display: String, // 原始标签（展示用）
    pub lob: Option<String>,
    pub bereich: Option<String>,
    pub cc: Option<String>,
    pub team: Option<String>,
    pub lbs: Option<String>,
    pub vg: Option<String>,
    pub values: BTreeMap<WeekKey, f64>, // 周 → 利用率 [0, 100]
}

impl NormalizedRow {
    pub fn new(person: impl Into<String>, person_display: impl Into<String>) -> Self {
        Self {
            person: person.into(),
            person_display: person_display.into(),
            ..Default::default()
        }
    }

    pub fn value_for(&self, week: &WeekKey) -> Option<f64> {
        self.values.get(week).copied()
    }

    /// 展平为持久化记录
    ///
    /// # 格式
    /// - person / personDisplay / 元数据字段
    /// - 每个周键一个顶层数值字段（如 "25/01": 75.0）
    pub fn to_flat_record(&self) -> FlatRecord {
        let mut record = Map::new();
        record.insert(FIELD_PERSON.to_string(), Value::from(self.person.clone()));
        record.insert(
            FIELD_PERSON_DISPLAY.to_string(),
            Value::from(self.person_display.clone()),
        );

        for (name, value) in METADATA_FIELDS.iter().zip(self.metadata()) {
            if let Some(v) = value {
                record.insert(name.to_string(), Value::from(v.clone()));
            }
        }

        for (week, value) in &self.values {
            record.insert(week.to_string(), Value::from(*value));
        }
        record
    }

    /// 由持久化记录还原
    ///
    /// # 返回
    /// - None: 缺少 person 字段
    pub fn from_flat_record(record: &FlatRecord) -> Option<Self> {
        let person = record.get(FIELD_PERSON)?.as_str()?.to_string();
        let person_display = record
            .get(FIELD_PERSON_DISPLAY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| person.clone());

        let text = |name: &str| record.get(name).and_then(Value::as_str).map(str::to_string);

        let mut values = BTreeMap::new();
        for (field, value) in record {
            if let (Some(week), Some(v)) = (WeekKey::parse_canonical(field), value.as_f64()) {
                values.insert(week, v);
            }
        }

        Some(Self {
            person,
            person_display,
            lob: text("lob"),
            bereich: text("bereich"),
            cc: text("cc"),
            team: text("team"),
            lbs: text("lbs"),
            vg: text("vg"),
            values,
        })
    }

    fn metadata(&self) -> [&Option<String>; 6] {
        [&self.lob, &self.bereich, &self.cc, &self.team, &self.lbs, &self.vg]
    }
}

// ==========================================
// ConsolidatedEntry - 合并结果（人 × 周）
// ==========================================
// 红线: 至少一个数据源有值才生成；缺失不以 0 表示
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedEntry {
    pub person: String,
    pub week: WeekKey,
    pub year: i32,
    pub week_number: u32,
    pub source_a_value: Option<f64>,
    pub source_b_value: Option<f64>,
    pub final_value: f64,
    pub is_historical: bool,
    pub is_partial: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub missing_source: Option<SourceKind>,
    pub source: SourceKind,
    pub composite_key: String, // person__team__cc（外部持久化标识）
    pub lob: Option<String>,
    pub bereich: Option<String>,
    pub cc: Option<String>,
    pub team: Option<String>,
    pub lbs: Option<String>,
}

/// 生成外部持久化标识: person + "__" + team + "__" + cc
pub fn composite_key(person: &str, team: Option<&str>, cc: Option<&str>) -> String {
    let segment = |v: Option<&str>| match v.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "unknown".to_string(),
    };
    let person = if person.trim().is_empty() {
        "unknown".to_string()
    } else {
        person.to_string()
    };
    format!("{}__{}__{}", person, segment(team), segment(cc))
}

// ==========================================
// ConsolidationStatus - 合并状态摘要
// ==========================================
// 用途: 部分合并不报错，以状态告知调用方
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationStatus {
    pub can_fully_consolidate: bool,
    pub missing_source: Option<SourceKind>,
    pub source_a_rows: usize,
    pub source_b_rows: usize,
    pub message: String,
}

// ==========================================
// IngestBatch - 上传批次记录
// ==========================================
// 对齐: ingest_batch 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestBatch {
    pub batch_id: String,             // 批次 ID（UUID）
    pub source: SourceKind,           // 数据源
    pub file_name: String,            // 源文件名
    pub row_count: usize,             // 保留行数
    pub is_valid: bool,               // 解析是否成功
    pub error: Option<String>,        // 失败原因
    pub diagnostics: Vec<String>,     // 解析诊断
    pub imported_at: DateTime<Utc>,   // 导入时间
    pub imported_by: String,          // 导入人
    pub elapsed_ms: i64,              // 耗时（毫秒）
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> NormalizedRow {
        let mut row = NormalizedRow::new("Anna Muster", "Anna Muster (extern)");
        row.team = Some("Core".to_string());
        row.cc = Some("4711".to_string());
        row.values.insert(WeekKey::new(1, 2025).unwrap(), 75.0);
        row.values.insert(WeekKey::new(2, 2025).unwrap(), 80.5);
        row
    }

    #[test]
    fn test_flat_record_has_week_fields() {
        let record = sample_row().to_flat_record();
        assert_eq!(record.get("person").and_then(Value::as_str), Some("Anna Muster"));
        assert_eq!(record.get("25/01").and_then(Value::as_f64), Some(75.0));
        assert_eq!(record.get("25/02").and_then(Value::as_f64), Some(80.5));
        assert!(record.get("lob").is_none());
        assert_eq!(record.get("team").and_then(Value::as_str), Some("Core"));
    }

    #[test]
    fn test_from_flat_record_restores_row() {
        let row = sample_row();
        let restored = NormalizedRow::from_flat_record(&row.to_flat_record()).unwrap();
        assert_eq!(restored, row);
    }

    #[test]
    fn test_from_flat_record_without_person() {
        let mut record = FlatRecord::new();
        record.insert("25/01".to_string(), Value::from(10.0));
        assert!(NormalizedRow::from_flat_record(&record).is_none());
    }

    #[test]
    fn test_composite_key_fallback() {
        assert_eq!(composite_key("Anna", Some("Core"), Some("4711")), "Anna__Core__4711");
        assert_eq!(composite_key("Anna", None, Some("  ")), "Anna__unknown__unknown");
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = ConsolidatedEntry {
            person: "Anna".to_string(),
            week: WeekKey::new(3, 2025).unwrap(),
            year: 2025,
            week_number: 3,
            source_a_value: None,
            source_b_value: Some(40.0),
            final_value: 40.0,
            is_historical: true,
            is_partial: true,
            missing_source: Some(SourceKind::CurrentUtilization),
            source: SourceKind::DeploymentPlan,
            composite_key: "Anna__unknown__unknown".to_string(),
            lob: None,
            bereich: None,
            cc: None,
            team: None,
            lbs: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sourceBValue"], 40.0);
        assert_eq!(json["missingSource"], "A");
        assert_eq!(json["source"], "B");
        assert_eq!(json["week"], "25/03");
    }
}
