//! Charts from automation data: type labels and series references.

use exstruct_core::{Chart, ChartSeries};
use exstruct_excel_com::{RawChart, RawSeries};

/// Label for an `XlChartType` code, `unknown_<code>` when unlisted.
pub fn chart_type_label(code: i32) -> String {
    let label = match code {
        -4098 => "3DArea",
        -4100 => "3DColumn",
        -4101 => "3DLine",
        -4102 => "3DPie",
        -4120 => "Doughnut",
        -4151 => "Radar",
        -4169 => "XYScatter",
        1 => "Area",
        4 => "Line",
        5 => "Pie",
        15 => "Bubble",
        51 => "ColumnClustered",
        52 => "ColumnStacked",
        53 => "ColumnStacked100",
        54 => "3DColumnClustered",
        55 => "3DColumnStacked",
        56 => "3DColumnStacked100",
        57 => "BarClustered",
        58 => "BarStacked",
        59 => "BarStacked100",
        60 => "3DBarClustered",
        61 => "3DBarStacked",
        62 => "3DBarStacked100",
        63 => "LineStacked",
        64 => "LineStacked100",
        65 => "LineMarkers",
        66 => "LineMarkersStacked",
        67 => "LineMarkersStacked100",
        68 => "PieOfPie",
        69 => "PieExploded",
        70 => "3DPieExploded",
        71 => "BarOfPie",
        72 => "XYScatterSmooth",
        73 => "XYScatterSmoothNoMarkers",
        74 => "XYScatterLines",
        75 => "XYScatterLinesNoMarkers",
        76 => "AreaStacked",
        77 => "AreaStacked100",
        78 => "3DAreaStacked",
        79 => "3DAreaStacked100",
        80 => "DoughnutExploded",
        81 => "RadarMarkers",
        82 => "RadarFilled",
        83 => "Surface",
        84 => "SurfaceWireframe",
        85 => "SurfaceTopView",
        86 => "SurfaceTopViewWireframe",
        87 => "Bubble3DEffect",
        88 => "StockHLC",
        89 => "StockOHLC",
        90 => "StockVHLC",
        91 => "StockVOHLC",
        _ => return format!("unknown_{code}"),
    };
    label.to_string()
}

/// The references of a `=SERIES(name, categories, values, order)` formula.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesRefs {
    pub name_range: Option<String>,
    pub x_range: Option<String>,
    pub y_range: Option<String>,
}

/// Parse a series formula. Literal or empty arguments give `None`.
///
/// ```
/// use exstruct::charts::parse_series_formula;
///
/// let refs = parse_series_formula("=SERIES(Sheet1!$B$1,Sheet1!$A$2:$A$5,Sheet1!$B$2:$B$5,1)").unwrap();
/// assert_eq!(refs.y_range.as_deref(), Some("Sheet1!$B$2:$B$5"));
/// ```
pub fn parse_series_formula(formula: &str) -> Option<SeriesRefs> {
    let body = formula.trim().trim_start_matches('=').trim();
    let open = body.find('(')?;
    if !body[..open].trim().eq_ignore_ascii_case("SERIES") || !body.ends_with(')') {
        return None;
    }
    let args = split_arguments(&body[open + 1..body.len() - 1]);
    let arg = |i: usize| args.get(i).and_then(|a| reference(a));
    Some(SeriesRefs {
        name_range: arg(0),
        x_range: arg(1),
        y_range: arg(2),
    })
}

/// Split on top-level commas, keeping quoted text and parenthesized
/// multi-area references together.
fn split_arguments(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_single = false;
    let mut in_double = false;

    for ch in args.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '(' | '{' if !in_single && !in_double => depth += 1,
            ')' | '}' if !in_single && !in_double => depth = depth.saturating_sub(1),
            ',' if depth == 0 && !in_single && !in_double => {
                out.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    out.push(current.trim().to_string());
    out
}

fn reference(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let literal = arg.is_empty()
        || arg.starts_with('"')
        || arg.starts_with('{')
        || arg.parse::<f64>().is_ok();
    (!literal).then(|| arg.to_string())
}

fn series_from_raw(raw: &RawSeries) -> ChartSeries {
    let refs = parse_series_formula(&raw.formula).unwrap_or_default();
    ChartSeries {
        name: raw.name.clone(),
        name_range: refs.name_range,
        x_range: refs.x_range,
        y_range: refs.y_range,
    }
}

/// Map a chart read over automation. A chart whose details failed to load
/// keeps only its name, position and the error.
pub fn chart_from_raw(raw: &RawChart) -> Chart {
    if let Some(error) = &raw.error {
        return Chart::failed(raw.name.clone(), raw.left as i32, raw.top as i32, error.clone());
    }
    let y_axis_range = match (raw.y_axis_min, raw.y_axis_max) {
        (Some(min), Some(max)) => vec![min, max],
        _ => Vec::new(),
    };
    Chart {
        name: raw.name.clone(),
        chart_type: chart_type_label(raw.chart_type),
        title: raw.title.clone().filter(|t| !t.is_empty()),
        y_axis_title: raw.y_axis_title.clone(),
        y_axis_range,
        series: raw.series.iter().map(series_from_raw).collect(),
        l: raw.left as i32,
        t: raw.top as i32,
        w: Some(raw.width as i32),
        h: Some(raw.height as i32),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chart_type_labels() {
        assert_eq!(chart_type_label(4), "Line");
        assert_eq!(chart_type_label(51), "ColumnClustered");
        assert_eq!(chart_type_label(-4102), "3DPie");
        assert_eq!(chart_type_label(999), "unknown_999");
    }

    #[test]
    fn test_parse_series_with_quoted_sheet() {
        let refs = parse_series_formula(
            "=SERIES('Q1, Sales'!$B$1,'Q1, Sales'!$A$2:$A$5,'Q1, Sales'!$B$2:$B$5,1)",
        )
        .unwrap();
        assert_eq!(refs.name_range.as_deref(), Some("'Q1, Sales'!$B$1"));
        assert_eq!(refs.x_range.as_deref(), Some("'Q1, Sales'!$A$2:$A$5"));
        assert_eq!(refs.y_range.as_deref(), Some("'Q1, Sales'!$B$2:$B$5"));
    }

    #[test]
    fn test_parse_series_literals_and_gaps() {
        let refs = parse_series_formula("=SERIES(\"Total, net\",,{1,2,3},2)").unwrap();
        assert_eq!(refs, SeriesRefs::default());
    }

    #[test]
    fn test_parse_series_multi_area_reference() {
        let refs =
            parse_series_formula("=SERIES(,(Sheet1!$A$2:$A$3,Sheet1!$A$5),Sheet1!$B$2:$B$5,1)")
                .unwrap();
        assert_eq!(refs.name_range, None);
        assert_eq!(refs.x_range.as_deref(), Some("(Sheet1!$A$2:$A$3,Sheet1!$A$5)"));
    }

    #[test]
    fn test_not_a_series_formula() {
        assert_eq!(parse_series_formula("=SUM(A1:A3)"), None);
        assert_eq!(parse_series_formula(""), None);
    }

    #[test]
    fn test_chart_from_raw() {
        let raw = RawChart {
            name: "Chart 1".into(),
            chart_type: 51,
            title: Some("Sales".into()),
            y_axis_min: Some(0.0),
            y_axis_max: Some(100.0),
            series: vec![RawSeries {
                name: "Q1".into(),
                formula: "=SERIES(Sheet1!$B$1,Sheet1!$A$2:$A$4,Sheet1!$B$2:$B$4,1)".into(),
            }],
            left: 120.6,
            top: 30.2,
            width: 300.0,
            height: 200.0,
            ..RawChart::default()
        };
        let chart = chart_from_raw(&raw);
        assert_eq!(chart.chart_type, "ColumnClustered");
        assert_eq!(chart.y_axis_range, vec![0.0, 100.0]);
        assert_eq!((chart.l, chart.t, chart.w, chart.h), (120, 30, Some(300), Some(200)));
        assert_eq!(chart.series[0].x_range.as_deref(), Some("Sheet1!$A$2:$A$4"));
    }

    #[test]
    fn test_failed_chart_keeps_only_position_and_error() {
        let raw = RawChart {
            name: "Broken".into(),
            chart_type: 4,
            title: Some("ignored".into()),
            left: 10.0,
            top: 20.0,
            error: Some("SeriesCollection failed".into()),
            ..RawChart::default()
        };
        let chart = chart_from_raw(&raw);
        assert_eq!(chart, Chart::failed("Broken", 10, 20, "SeriesCollection failed"));
        assert!(chart.chart_type.is_empty());
    }
}
