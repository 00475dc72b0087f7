// ==========================================
// 导入引擎测试
// ==========================================
// 测试目标: 字节 → 网格 → 列映射 → NormalizedRow 的完整解析链路
// ==========================================


use utilization_consolidator::config::IngestConfig;
use utilization_consolidator::domain::{SourceKind, WeekKey};
use utilization_consolidator::importer::*;
use utilization_consolidator::logging;

fn key(week: u32, year: i32) -> WeekKey {
    WeekKey::new(week, year).expect("合法周号")
}

fn extract(source: SourceKind, file_name: &str, bytes: &[u8]) -> ExtractionResult {
    logging::init_test();
    let grid = UniversalFileParser
        .load_grid(file_name, bytes)
        .expect("CSV 应可读取");
    extractor_for(source, &IngestConfig::default()).extract(&grid)
}

// ==========================================
// 固定布局（当前利用率）
// ==========================================

#[test]
fn test_fixed_layout_inverse_value_end_to_end() {
    let bytes = test_helpers::fixed_layout_csv(&[
        "Digital;Nord;4711;Core;Anna Muster (extern);25;",
        "Digital;Nord;4711;Total;Max Mustermann;300;300",
        ";;;;;;",
    ]);
    let result = extract(SourceKind::CurrentUtilization, "auslastung.csv", &bytes);

    assert!(result.is_valid(), "解析应成功: {:?}", result.error_message());
    let sheet = result.expect("有效结果");
    assert_eq!(sheet.rows.len(), 1, "Total 团队行与空行应跳过");

    let row = &sheet.rows[0];
    assert_eq!(row.person, "Anna Muster");
    assert_eq!(row.person_display, "Anna Muster (extern)");
    assert_eq!(row.value_for(&key(1, 2025)), Some(75.0), "NKV 口径 25 → 75");
    assert_eq!(row.value_for(&key(2, 2025)), None, "空单元格不是 0");
    assert_eq!(row.lob.as_deref(), Some("Digital"));
    assert_eq!(row.bereich.as_deref(), Some("Nord"));
}

#[test]
fn test_fixed_layout_direct_value_and_fraction() {
    let bytes = test_helpers::fixed_layout_csv(&[
        "Digital;Nord;4711;Core;Erika;30;0,8",
        "Digital;Nord;4711;Core;Jonas;0%;80,5%",
    ]);
    let sheet = extract(SourceKind::CurrentUtilization, "auslastung.csv", &bytes)
        .expect("有效结果");

    let erika = sheet.rows.iter().find(|r| r.person == "Erika").expect("Erika");
    assert_eq!(erika.value_for(&key(1, 2025)), Some(70.0), "NKV 口径 30 → 70");
    assert_eq!(erika.value_for(&key(2, 2025)), Some(80.0), "0,8 视为比例");

    let jonas = sheet.rows.iter().find(|r| r.person == "Jonas").expect("Jonas");
    assert_eq!(jonas.value_for(&key(1, 2025)), Some(100.0));
    assert_eq!(jonas.value_for(&key(2, 2025)), Some(80.5));
}

#[test]
fn test_summary_rows_never_extracted() {
    let bytes = test_helpers::fixed_layout_csv(&[
        "Digital;Nord;4711;Core;Total;50;50",
        "Digital;Nord;4711;Core;Summe;50;50",
        "Digital;Nord;4711;Total;Lena;50;50",
        "Digital;Nord;4711;Core;Subtotal;50;50",
        "Digital;Nord;4711;Core;Totals;50;50",
        "Digital;Nord;4711;Core;Teamtotal;50;50",
        "Digital;Nord;4711;Core;Summen;50;50",
        "Digital;Nord;4711;Core;Zwischensumme;50;50",
        "Digital;Nord;4711;Core;Lukas;50;50",
        "Digital;Nord;4711;Core;Summer, Anna;50;50",
    ]);
    let sheet = extract(SourceKind::CurrentUtilization, "auslastung.csv", &bytes)
        .expect("有效结果");
    let people: Vec<&str> = sheet.rows.iter().map(|r| r.person.as_str()).collect();
    assert_eq!(people, vec!["Lukas", "Summer, Anna"]);
}

#[test]
fn test_fixed_layout_csv_keeps_blank_line_positions() {
    // 第 2-3 行与第 6-8 行是真正的空行（不含分隔符）
    let bytes = test_helpers::fixed_layout_csv(&["Digital;Nord;4711;Core;Anna;25;80"]);
    let grid = UniversalFileParser
        .load_grid("auslastung.csv", &bytes)
        .expect("CSV 应可读取");
    assert_eq!(grid.row_count(), 9);
    assert_eq!(grid.text(3, 4), "Name", "表头在第 4 行");
    assert_eq!(grid.text(8, 4), "Anna", "数据自第 9 行");

    let sheet = extract(SourceKind::CurrentUtilization, "auslastung.csv", &bytes)
        .expect("有效结果");
    assert_eq!(sheet.rows.len(), 1);
    assert_eq!(sheet.rows[0].value_for(&key(1, 2025)), Some(75.0));
    assert_eq!(sheet.rows[0].value_for(&key(2, 2025)), Some(80.0));
}

#[test]
fn test_fixed_layout_without_person_rows_is_invalid() {
    let bytes = test_helpers::fixed_layout_csv(&["Digital;Nord;4711;Core;Bernd;;"]);
    let result = extract(SourceKind::CurrentUtilization, "auslastung.csv", &bytes);

    assert!(!result.is_valid());
    let failure = result.expect_err("应失败");
    assert_eq!(failure.kind(), ImportErrorKind::NoPersonRowsFound);
    assert!(
        failure.diagnostics.iter().any(|l| l.contains("Bernd")),
        "诊断应记录无周值的行"
    );
}

// ==========================================
// Excel 工作簿（xlsx）
// ==========================================

#[test]
fn test_fixed_layout_xlsx_end_to_end() {
    let bytes = test_helpers::fixed_layout_xlsx(&[
        "Digital;Nord;4711;Core;Anna Muster (extern);25;0,8",
        "Digital;Nord;4711;Total;Max Mustermann;300;300",
    ]);
    let result = extract(SourceKind::CurrentUtilization, "auslastung.xlsx", &bytes);

    assert!(result.is_valid(), "解析应成功: {:?}", result.error_message());
    let sheet = result.expect("有效结果");
    assert!(sheet.diagnostics.iter().any(|l| l.contains("Auslastung")), "诊断记录工作表名");
    assert_eq!(sheet.rows.len(), 1, "Total 团队行应跳过");

    let row = &sheet.rows[0];
    assert_eq!(row.person, "Anna Muster");
    assert_eq!(row.cc.as_deref(), Some("4711"), "数值单元格按整数文本读取");
    assert_eq!(row.value_for(&key(1, 2025)), Some(75.0), "NKV 口径 25 → 75");
    assert_eq!(row.value_for(&key(2, 2025)), Some(80.0));
}

#[test]
fn test_xlsx_with_empty_sheet() {
    let err = UniversalFileParser
        .load_grid("leer.xlsx", &test_helpers::empty_sheet_xlsx())
        .expect_err("应失败");
    assert_eq!(err.kind(), ImportErrorKind::EmptySheet);
    assert!(err.to_string().contains("Leer"));
}

#[test]
fn test_xlsx_without_sheets() {
    let err = UniversalFileParser
        .load_grid("ohne_blatt.xlsx", &test_helpers::sheetless_xlsx())
        .expect_err("应失败");
    assert_eq!(err.kind(), ImportErrorKind::NoSheetsFound);
}

// ==========================================
// 动态布局（部署计划）
// ==========================================

#[test]
fn test_deployment_plan_triplets() {
    let bytes = test_helpers::deployment_plan_csv(&[
        "Muster, Anna (TL);Core;Alpha;80%;Berlin;Beta;30;Remote;Gamma;0,5;Köln",
        "Gesamt;;;300%;;;;;;;",
    ]);
    let sheet = extract(SourceKind::DeploymentPlan, "einsatzplanung.csv", &bytes)
        .expect("有效结果");

    assert_eq!(sheet.rows.len(), 1);
    let row = &sheet.rows[0];
    assert_eq!(row.person, "Muster, Anna");
    assert_eq!(row.team.as_deref(), Some("Core"));
    assert_eq!(row.value_for(&key(1, 2025)), Some(80.0));
    assert_eq!(row.value_for(&key(2, 2025)), Some(70.0));
    assert_eq!(row.value_for(&key(3, 2025)), Some(50.0));
}

#[test]
fn test_deployment_plan_header_not_found() {
    let result = extract(
        SourceKind::DeploymentPlan,
        "plan.csv",
        b"Name;Wert\nAnna;50\n",
    );
    assert_eq!(
        result.expect_err("应失败").kind(),
        ImportErrorKind::HeaderNotFound
    );
}

#[test]
fn test_deployment_plan_no_week_columns() {
    let bytes = b"Name;KW1/2025;KW2/2025;KW3/2025\n;Projekt;Ort;Kunde\nAnna;A;B;C\n";
    let result = extract(SourceKind::DeploymentPlan, "plan.csv", bytes);
    let failure = result.expect_err("应失败");
    assert_eq!(failure.kind(), ImportErrorKind::NoWeekColumnsFound);
    assert!(failure.message().contains("周"));
}

#[test]
fn test_empty_file_reports_empty_sheet() {
    let err = UniversalFileParser
        .load_grid("leer.csv", b"")
        .expect_err("应失败");
    assert_eq!(err.kind(), ImportErrorKind::EmptySheet);
}

// ==========================================
// 周键 / 百分比性质
// ==========================================

#[test]
fn test_week_formats_round_trip() {
    let cases = [
        ("KW5(2025)", "25/05"),
        ("kw 5 ( 2025 )", "25/05"),
        ("KW05/2025", "25/05"),
        ("KW5-2025", "25/05"),
        ("KW25/05", "25/05"),
        ("KW53/2026", "26/53"),
    ];
    for (text, expected) in cases {
        let resolved = WeekKeyResolver::resolve_key(text);
        assert_eq!(
            resolved.as_ref().map(WeekKey::as_str),
            Some(expected),
            "'{}' 应解析为 {}",
            text,
            expected
        );
    }
    assert!(WeekKeyResolver::resolve("KW54/2025").is_none());
    assert!(WeekKeyResolver::resolve("KW0(2025)").is_none());
}

#[test]
fn test_reversed_operand_format() {
    let week = WeekKeyResolver::resolve("KW25/01").expect("应识别");
    assert_eq!(week.week, 1);
    assert_eq!(week.year, 2025);
}

#[test]
fn test_percent_idempotence() {
    let parser = PercentValueParser::default();
    for raw in ["0", "0.8", "80", "80%", "80,5"] {
        let once = parser.parse_str(raw).expect("可解析");
        let twice = parser.parse_str(&format!("{}%", once)).expect("可解析");
        assert_eq!(once, twice, "'{}' 二次解析应不变", raw);
    }
}
