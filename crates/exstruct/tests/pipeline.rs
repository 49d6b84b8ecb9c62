//! End-to-end runs over a real `.xlsx` package with scripted automation.

mod common;

use common::{
    corrupt_flow_workbook, sales_workbook, ScriptedConnector, SessionLog, UnavailableConnector,
};
use exstruct::{
    AreaRect, CellRow, CellValue, Error, ExtractionMode, ExtractionOptions, Extractor,
    FallbackReason, Graphic, PageBreakLayout, PrintArea, RawChart, RawSeries, RawShape,
    TableDetectionConfig,
};
use pretty_assertions::assert_eq;

fn options(mode: ExtractionMode) -> ExtractionOptions {
    ExtractionOptions {
        table_config: Some(TableDetectionConfig::default()),
        ..ExtractionOptions::new(mode)
    }
}

fn flow_shapes() -> Vec<RawShape> {
    vec![
        RawShape {
            id: Some(1),
            name: "Rectangle 1".into(),
            text: " Start ".into(),
            left: 10.0,
            top: 5.0,
            width: 60.0,
            height: 20.0,
            mso_type: 1,
            autoshape_type: Some(1),
            autoshape_name: Some("Rectangle".into()),
            ..RawShape::default()
        },
        RawShape {
            id: Some(2),
            name: "Elbow Connector 2".into(),
            left: 70.0,
            top: 15.0,
            width: 40.0,
            height: 0.0,
            mso_type: 1,
            is_connector: true,
            end_arrow_style: Some(2),
            begin_connected_id: Some(1),
            end_connected_id: Some(3),
            ..RawShape::default()
        },
        RawShape {
            id: Some(3),
            name: "Rectangle 3".into(),
            left: 110.0,
            top: 5.0,
            width: 60.0,
            height: 20.0,
            mso_type: 1,
            autoshape_type: Some(1),
            ..RawShape::default()
        },
        RawShape {
            id: Some(4),
            name: "Picture 4".into(),
            left: 0.0,
            top: 100.0,
            width: 30.0,
            height: 30.0,
            mso_type: 13,
            ..RawShape::default()
        },
    ]
}

fn sales_chart() -> RawChart {
    RawChart {
        name: "Chart 1".into(),
        chart_type: 51,
        title: Some("Stock".into()),
        series: vec![RawSeries {
            name: "Qty".into(),
            formula: "=SERIES(Sales!$B$1,Sales!$A$2:$A$3,Sales!$B$2:$B$3,1)".into(),
        }],
        left: 200.0,
        top: 10.0,
        width: 300.0,
        height: 180.0,
        ..RawChart::default()
    }
}

#[test]
fn test_standard_without_automation_keeps_file_data() {
    let fixture = sales_workbook();
    let connector = UnavailableConnector::default();
    let seen = connector.seen.clone();

    let extraction = Extractor::new(options(ExtractionMode::Standard))
        .with_connector(connector)
        .extract(&fixture.path)
        .unwrap();

    assert_eq!(seen.connects.get(), 1);
    let fallback = extraction.fallback.unwrap();
    assert_eq!(fallback.reason, FallbackReason::AutomationUnavailable);
    assert!(fallback.detail.contains("Excel is not installed"));

    let workbook = &extraction.workbook;
    assert_eq!(workbook.book_name, "sales.xlsx");
    let names: Vec<&str> = workbook.sheets.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["Sales", "Flow"]);

    let sales = workbook.sheets.get("Sales").unwrap();
    assert!(sales.shapes.is_empty());
    assert!(sales.charts.is_empty());
    assert_eq!(sales.rows.iter().map(|r| r.r).collect::<Vec<_>>(), vec![1, 2, 3, 6]);
    assert_eq!(sales.table_candidates, vec!["A1:B3".to_string()]);
    assert_eq!(sales.print_areas, vec![PrintArea { r1: 1, c1: 0, r2: 2, c2: 1 }]);
}

#[test]
fn test_light_never_connects() {
    let fixture = sales_workbook();
    let connector = ScriptedConnector {
        shapes: flow_shapes(),
        ..ScriptedConnector::default()
    };
    let seen = connector.seen.clone();

    let extraction = Extractor::new(options(ExtractionMode::Light))
        .with_connector(connector)
        .extract(&fixture.path)
        .unwrap();

    assert_eq!(seen.connects.get(), 0);
    assert_eq!(
        extraction.fallback.map(|f| f.reason),
        Some(FallbackReason::DisabledByMode)
    );
    let sales = extraction.workbook.sheets.get("Sales").unwrap();
    assert!(sales.shapes.is_empty());
    assert_eq!(sales.print_areas, vec![PrintArea { r1: 1, c1: 0, r2: 2, c2: 1 }]);
    assert_eq!(sales.table_candidates, vec!["A1:B3".to_string()]);
}

#[test]
fn test_light_with_page_breaks_uses_automation_for_breaks_only() {
    let fixture = sales_workbook();
    let connector = ScriptedConnector {
        shapes: flow_shapes(),
        page_breaks: PageBreakLayout {
            areas: vec![AreaRect {
                first_row: 1,
                first_col: 1,
                last_row: 6,
                last_col: 2,
            }],
            row_breaks: vec![4],
            col_breaks: Vec::new(),
        },
        ..ScriptedConnector::default()
    };
    let seen = connector.seen.clone();
    let options = ExtractionOptions {
        include_auto_page_breaks: true,
        ..options(ExtractionMode::Light)
    };

    let extraction = Extractor::new(options)
        .with_connector(connector)
        .extract(&fixture.path)
        .unwrap();

    assert!(extraction.fallback.is_none());
    assert!(seen.closed.get());
    assert_eq!(
        seen.calls(),
        vec!["auto_page_breaks:Sales", "auto_page_breaks:Flow"]
    );
    let sales = extraction.workbook.sheets.get("Sales").unwrap();
    assert!(sales.shapes.is_empty());
    assert_eq!(
        sales.auto_print_areas,
        vec![
            PrintArea { r1: 1, c1: 0, r2: 3, c2: 1 },
            PrintArea { r1: 4, c1: 0, r2: 6, c2: 1 },
        ]
    );
}

#[test]
fn test_standard_with_automation() {
    let fixture = sales_workbook();
    let connector = ScriptedConnector {
        shapes: flow_shapes(),
        charts: vec![sales_chart()],
        ..ScriptedConnector::default()
    };
    let seen = connector.seen.clone();

    let extraction = Extractor::new(options(ExtractionMode::Standard))
        .with_connector(connector)
        .extract(&fixture.path)
        .unwrap();

    assert!(extraction.fallback.is_none());
    assert_eq!(seen.connects.get(), 1);
    assert!(seen.closed.get());
    assert!(!seen.calls().iter().any(|c| c.starts_with("auto_page_breaks")));

    let flow = extraction.workbook.sheets.get("Flow").unwrap();
    // The blank rectangle and the picture are dropped.
    let kinds: Vec<&str> = flow.shapes.iter().map(Graphic::kind).collect();
    assert_eq!(kinds, vec!["Shape", "Arrow"]);
    assert_eq!(flow.shapes[0].base().text, "Start");
    assert_eq!(
        flow.shapes[0].base().shape_type.as_deref(),
        Some("AutoShape-Rectangle")
    );
    match &flow.shapes[1] {
        Graphic::Arrow(arrow) => {
            assert_eq!(arrow.begin_id, Some(1));
            assert_eq!(arrow.end_id, Some(3));
            assert_eq!(arrow.end_arrow_style, Some(2));
        }
        other => panic!("expected an arrow, got {other:?}"),
    }

    let chart = &flow.charts[0];
    assert_eq!(chart.chart_type, "ColumnClustered");
    assert_eq!(chart.title.as_deref(), Some("Stock"));
    assert_eq!(chart.series[0].y_range.as_deref(), Some("Sales!$B$2:$B$3"));
    assert!(chart.error.is_none());

    // File data is untouched by automation.
    let sales = extraction.workbook.sheets.get("Sales").unwrap();
    assert_eq!(sales.table_candidates, vec!["A1:B3".to_string()]);
    assert!(sales.auto_print_areas.is_empty());
}

#[test]
fn test_verbose_keeps_blank_shapes() {
    let fixture = sales_workbook();
    let connector = ScriptedConnector {
        shapes: flow_shapes(),
        ..ScriptedConnector::default()
    };

    let extraction = Extractor::new(options(ExtractionMode::Verbose))
        .with_connector(connector)
        .extract(&fixture.path)
        .unwrap();

    let flow = extraction.workbook.sheets.get("Flow").unwrap();
    let ids: Vec<Option<u32>> = flow.shapes.iter().map(|g| g.base().id).collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn test_failure_mid_session_discards_automation_output() {
    let fixture = sales_workbook();
    let connector = ScriptedConnector {
        shapes: flow_shapes(),
        charts: vec![sales_chart()],
        fail_on: Some("charts"),
        ..ScriptedConnector::default()
    };
    let seen: SessionLog = connector.seen.clone();

    let extraction = Extractor::new(options(ExtractionMode::Standard))
        .with_connector(connector)
        .extract(&fixture.path)
        .unwrap();

    let fallback = extraction.fallback.unwrap();
    assert_eq!(fallback.reason, FallbackReason::AutomationFailed);
    assert!(fallback.detail.contains("RPC server is unavailable"));
    assert!(seen.closed.get());
    assert_eq!(seen.calls().last().map(String::as_str), Some("charts:Flow"));

    // Sales succeeded before the failure, but nothing from the session is kept.
    for (_, sheet) in extraction.workbook.sheets.iter() {
        assert!(sheet.shapes.is_empty());
        assert!(sheet.charts.is_empty());
    }
    let sales = extraction.workbook.sheets.get("Sales").unwrap();
    assert_eq!(sales.rows.len(), 4);
}

#[test]
fn test_colors_map_from_file() {
    let fixture = sales_workbook();
    let options = ExtractionOptions {
        include_colors_map: true,
        ..options(ExtractionMode::Light)
    };

    let extraction = Extractor::new(options)
        .with_connector(UnavailableConnector::default())
        .extract(&fixture.path)
        .unwrap();

    let sales = extraction.workbook.sheets.get("Sales").unwrap();
    assert_eq!(sales.colors_map.len(), 1);
    assert_eq!(sales.colors_map.get("FFFF00"), Some(&vec![(1, 0), (1, 1)]));
}

#[test]
fn test_print_area_views_of_extraction() {
    let fixture = sales_workbook();
    let extractor = Extractor::new(options(ExtractionMode::Standard))
        .with_connector(UnavailableConnector::default());
    let extraction = extractor.extract(&fixture.path).unwrap();
    let workbook = extractor.filter(&extraction.workbook);

    let views = extractor.print_area_views(&workbook);
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.sheet_name, "Sales");
    assert_eq!(view.rows.iter().map(|r| r.r).collect::<Vec<_>>(), vec![1, 2]);
    // A1:B3 reaches past row 2.
    assert!(view.table_candidates.is_empty());
}

#[test]
fn test_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.xls");
    std::fs::write(&path, b"not a workbook").unwrap();

    let err = Extractor::new(options(ExtractionMode::Light))
        .with_connector(UnavailableConnector::default())
        .extract(&path)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.xlsx");

    let err = Extractor::new(options(ExtractionMode::Standard))
        .with_connector(UnavailableConnector::default())
        .extract(&path)
        .unwrap_err();
    match err {
        Error::Open { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected an open error, got {other:?}"),
    }
}

#[test]
fn test_unreadable_sheet_filled_from_automation() {
    let fixture = corrupt_flow_workbook();
    let mut title = CellRow::new(1);
    title.c.insert(0, CellValue::from("Process overview"));
    let connector = ScriptedConnector {
        rows: vec![title],
        table_candidates: vec!["A1:A1".into()],
        ..ScriptedConnector::default()
    };
    let seen = connector.seen.clone();

    let extraction = Extractor::new(options(ExtractionMode::Standard))
        .with_connector(connector)
        .extract(&fixture.path)
        .unwrap();

    assert!(extraction.fallback.is_none());
    let calls = seen.calls();
    for gap in ["cells:Flow", "metrics:Flow", "table_candidates:Flow"] {
        assert!(calls.iter().any(|c| c == gap), "missing {gap} in {calls:?}");
    }
    // Sales parsed fine and is not asked for again.
    assert!(!calls.iter().any(|c| c == "cells:Sales"));

    let flow = extraction.workbook.sheets.get("Flow").unwrap();
    assert_eq!(flow.rows.len(), 1);
    assert_eq!(
        flow.rows[0].c.get(&0),
        Some(&CellValue::from("Process overview"))
    );
    assert_eq!(flow.table_candidates, vec!["A1:A1".to_string()]);

    let sales = extraction.workbook.sheets.get("Sales").unwrap();
    assert_eq!(sales.table_candidates, vec!["A1:B3".to_string()]);
}

#[test]
fn test_unreadable_sheet_without_automation_stays_empty() {
    let fixture = corrupt_flow_workbook();

    let extraction = Extractor::new(options(ExtractionMode::Standard))
        .with_connector(UnavailableConnector::default())
        .extract(&fixture.path)
        .unwrap();

    assert_eq!(
        extraction.fallback.map(|f| f.reason),
        Some(FallbackReason::AutomationUnavailable)
    );
    let flow = extraction.workbook.sheets.get("Flow").unwrap();
    assert!(flow.rows.is_empty());
    assert!(flow.table_candidates.is_empty());
    let sales = extraction.workbook.sheets.get("Sales").unwrap();
    assert_eq!(sales.rows.len(), 4);
}
