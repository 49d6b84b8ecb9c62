//! Excel object-model queries behind each protocol command.

#![cfg(windows)]

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use windows::Win32::System::Variant::VARIANT;

use excel_com_protocol::{
    AreaRect, CellError, CellValue, PageBreakLayout, RawCell, RawChart, RawGrid, RawLink,
    RawSeries, RawShape, RawSmartArtNode, SheetRef,
};

use crate::dispatch::{
    variant_bool, variant_get_bool, variant_get_date, variant_get_error, variant_get_f64,
    variant_get_string, variant_i32, variant_is_empty, variant_str, DispatchObject,
};

const XL_NONE: i32 = -4142;
const MSO_GROUP: i32 = 6;
const MSO_ARROWHEAD_NONE: i32 = 1;
const XL_VALUE_AXIS: i32 = 2;
const XL_EDGES: [i32; 4] = [7, 8, 9, 10];

/// Manages an Excel.Application COM instance and its open workbooks.
pub struct ExcelApp {
    app: DispatchObject,
    workbooks_collection: DispatchObject,
    /// Map from our handle IDs to workbook dispatch objects.
    workbooks: HashMap<u64, DispatchObject>,
    next_handle: u64,
}

impl ExcelApp {
    /// Create a hidden Excel.Application instance via COM.
    pub fn new() -> Result<Self, String> {
        let app = DispatchObject::create_from_progid("Excel.Application")?;

        app.set_property("Visible", variant_bool(false))?;
        app.set_property("DisplayAlerts", variant_bool(false))?;
        app.set_property("ScreenUpdating", variant_bool(false))?;

        let workbooks_collection = app.get_child("Workbooks")?;

        Ok(Self {
            app,
            workbooks_collection,
            workbooks: HashMap::new(),
            next_handle: 1,
        })
    }

    /// Open a workbook read-only without updating links. Returns the handle ID.
    pub fn open_workbook(&mut self, path: &str) -> Result<u64, String> {
        let wb = self.workbooks_collection.invoke_child(
            "Open",
            &[variant_str(path), variant_i32(0), variant_bool(true)],
        )?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.workbooks.insert(handle, wb);
        Ok(handle)
    }

    fn workbook(&self, wb_handle: u64) -> Result<&DispatchObject, String> {
        self.workbooks
            .get(&wb_handle)
            .ok_or_else(|| format!("Unknown workbook handle: {wb_handle}"))
    }

    fn get_sheet(&self, wb_handle: u64, sheet: &SheetRef) -> Result<DispatchObject, String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        match sheet {
            // Excel worksheets are 1-based, the protocol is 0-based
            SheetRef::Index(idx) => sheets.item(*idx as i32 + 1),
            SheetRef::Name(name) => sheets.get_indexed("Item", &[variant_str(name)]),
        }
    }

    pub fn sheet_names(&self, wb_handle: u64) -> Result<Vec<String>, String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        (1..=sheets.count()?)
            .map(|i| Ok(sheets.item(i)?.get_string("Name")?.unwrap_or_default()))
            .collect()
    }

    pub fn shapes(&self, wb_handle: u64, sheet: &SheetRef) -> Result<Vec<RawShape>, String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        let shapes = ws.get_child("Shapes")?;
        let mut out = Vec::new();
        for i in 1..=shapes.count()? {
            collect_shape(&shapes.item(i)?, &mut out)?;
        }
        Ok(out)
    }

    pub fn charts(&self, wb_handle: u64, sheet: &SheetRef) -> Result<Vec<RawChart>, String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        let objects = ws.invoke_child("ChartObjects", &[])?;
        let mut out = Vec::new();
        for i in 1..=objects.count()? {
            let object = objects.item(i)?;
            let mut raw = RawChart {
                name: object.get_string("Name")?.unwrap_or_default(),
                left: object.get_f64("Left")?.unwrap_or(0.0),
                top: object.get_f64("Top")?.unwrap_or(0.0),
                width: object.get_f64("Width")?.unwrap_or(0.0),
                height: object.get_f64("Height")?.unwrap_or(0.0),
                ..RawChart::default()
            };
            if let Err(e) = read_chart_details(&object, &mut raw) {
                eprintln!("[excel-com-bridge] chart '{}': {e}", raw.name);
                raw.error = Some(e);
            }
            out.push(raw);
        }
        Ok(out)
    }

    pub fn print_area(&self, wb_handle: u64, sheet: &SheetRef) -> Result<String, String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        Ok(ws
            .get_child("PageSetup")?
            .get_string("PrintArea")?
            .unwrap_or_default())
    }

    pub fn page_breaks(&self, wb_handle: u64, sheet: &SheetRef) -> Result<PageBreakLayout, String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        // Automatic breaks are only computed once page breaks are displayed.
        let original_display = optional(ws.get_bool("DisplayPageBreaks"));
        let _ = ws.set_property("DisplayPageBreaks", variant_bool(true));
        let layout = Self::read_page_breaks(&ws);
        if let Some(display) = original_display {
            let _ = ws.set_property("DisplayPageBreaks", variant_bool(display));
        }
        layout
    }

    fn read_page_breaks(ws: &DispatchObject) -> Result<PageBreakLayout, String> {
        let print_area = ws
            .get_child("PageSetup")?
            .get_string("PrintArea")?
            .unwrap_or_default();
        let areas = if print_area.is_empty() {
            vec![area_rect(&ws.get_child("UsedRange")?)?]
        } else {
            let range = ws.get_indexed("Range", &[variant_str(&print_area)])?;
            let parts = range.get_child("Areas")?;
            (1..=parts.count()?)
                .map(|i| area_rect(&parts.item(i)?))
                .collect::<Result<_, _>>()?
        };

        let mut layout = PageBreakLayout {
            areas,
            ..PageBreakLayout::default()
        };
        let h = ws.get_child("HPageBreaks")?;
        for i in 1..=h.count()? {
            if let Some(row) = h.item(i)?.get_child("Location")?.get_i32("Row")? {
                layout.row_breaks.push(row as u32);
            }
        }
        let v = ws.get_child("VPageBreaks")?;
        for i in 1..=v.count()? {
            if let Some(col) = v.item(i)?.get_child("Location")?.get_i32("Column")? {
                layout.col_breaks.push(col as u32);
            }
        }
        Ok(layout)
    }

    pub fn grid(&self, wb_handle: u64, sheet: &SheetRef) -> Result<RawGrid, String> {
        let ws = self.get_sheet(wb_handle, sheet)?;
        let used = area_rect(&ws.get_child("UsedRange")?)?;

        let mut grid = RawGrid {
            default_row_height: ws.get_f64("StandardHeight")?.unwrap_or(15.0),
            default_col_width: ws
                .get_indexed("Columns", &[variant_i32(used.last_col as i32 + 1)])?
                .get_f64("Width")?
                .unwrap_or(48.0),
            ..RawGrid::default()
        };

        for row in used.first_row..=used.last_row {
            let height = ws
                .get_indexed("Rows", &[variant_i32(row as i32)])?
                .get_f64("RowHeight")?
                .unwrap_or(grid.default_row_height);
            if height != grid.default_row_height {
                grid.row_heights.push((row, height));
            }
        }
        for col in used.first_col..=used.last_col {
            let width = ws
                .get_indexed("Columns", &[variant_i32(col as i32)])?
                .get_f64("Width")?
                .unwrap_or(grid.default_col_width);
            if width != grid.default_col_width {
                grid.col_widths.push((col, width));
            }
        }

        for row in used.first_row..=used.last_row {
            for col in used.first_col..=used.last_col {
                let cell = ws.get_indexed("Cells", &[variant_i32(row as i32), variant_i32(col as i32)])?;
                let value = variant_to_cell_value(&cell.get_property("Value")?);
                let fill = interior_rgb(&cell)?;
                let border = has_border(&cell)?;
                if !value.is_null() || fill.is_some() || border {
                    grid.cells.push(RawCell {
                        row,
                        col,
                        value,
                        fill,
                        border,
                    });
                }
            }
        }

        let links = ws.get_child("Hyperlinks")?;
        for i in 1..=links.count()? {
            let link = links.item(i)?;
            let anchor = link.get_child("Range")?;
            let address = link.get_string("Address")?.unwrap_or_default();
            let sub = link.get_string("SubAddress")?.unwrap_or_default();
            let target = match (address.is_empty(), sub.is_empty()) {
                (false, true) => address,
                (false, false) => format!("{address}#{sub}"),
                (true, _) => format!("#{sub}"),
            };
            grid.links.push(RawLink {
                row: anchor.get_i32("Row")?.unwrap_or(1) as u32,
                col: anchor.get_i32("Column")?.unwrap_or(1) as u32,
                target,
            });
        }

        let tables = ws.get_child("ListObjects")?;
        for i in 1..=tables.count()? {
            let range = tables.item(i)?.get_child("Range")?;
            let address = range.get_property_with("Address", &[variant_bool(false), variant_bool(false)])?;
            if let Some(a1) = variant_get_string(&address) {
                grid.list_objects.push(a1);
            }
        }

        Ok(grid)
    }

    /// Close a workbook without saving.
    pub fn close_workbook(&mut self, wb_handle: u64) -> Result<(), String> {
        let wb = self
            .workbooks
            .remove(&wb_handle)
            .ok_or_else(|| format!("Unknown workbook handle: {wb_handle}"))?;
        wb.invoke_method("Close", &[variant_bool(false)])?;
        Ok(())
    }

    /// Shut down: close all workbooks and quit Excel.
    pub fn shutdown(mut self) -> Result<(), String> {
        let handles: Vec<u64> = self.workbooks.keys().copied().collect();
        for h in handles {
            let _ = self.close_workbook(h);
        }
        self.app.invoke_method("Quit", &[])?;
        Ok(())
    }
}

fn area_rect(range: &DispatchObject) -> Result<AreaRect, String> {
    let first_row = range.get_i32("Row")?.unwrap_or(1).max(1) as u32;
    let first_col = range.get_i32("Column")?.unwrap_or(1).max(1) as u32;
    let rows = range.get_child("Rows")?.count()?.max(1) as u32;
    let cols = range.get_child("Columns")?.count()?.max(1) as u32;
    Ok(AreaRect {
        first_row,
        first_col,
        last_row: first_row + rows - 1,
        last_col: first_col + cols - 1,
    })
}

/// Properties that some shape kinds do not support read as `None`.
fn optional<T>(result: Result<Option<T>, String>) -> Option<T> {
    result.ok().flatten()
}

fn shape_text(shape: &DispatchObject) -> String {
    let frame2 = || -> Result<Option<String>, String> {
        shape
            .get_child("TextFrame2")?
            .get_child("TextRange")?
            .get_string("Text")
    };
    let frame = || -> Result<Option<String>, String> {
        shape
            .get_child("TextFrame")?
            .invoke_child("Characters", &[])?
            .get_string("Text")
    };
    optional(frame2())
        .or_else(|| optional(frame()))
        .unwrap_or_default()
}

fn collect_shape(shape: &DispatchObject, out: &mut Vec<RawShape>) -> Result<(), String> {
    let mso_type = shape.get_i32("Type")?.unwrap_or(0);
    if mso_type == MSO_GROUP {
        let items = shape.get_child("GroupItems")?;
        for i in 1..=items.count()? {
            collect_shape(&items.item(i)?, out)?;
        }
        return Ok(());
    }

    let mut raw = RawShape {
        id: optional(shape.get_i32("ID")).map(|id| id as u32),
        name: shape.get_string("Name")?.unwrap_or_default(),
        text: shape_text(shape),
        left: shape.get_f64("Left")?.unwrap_or(0.0),
        top: shape.get_f64("Top")?.unwrap_or(0.0),
        width: shape.get_f64("Width")?.unwrap_or(0.0),
        height: shape.get_f64("Height")?.unwrap_or(0.0),
        mso_type,
        autoshape_type: optional(shape.get_i32("AutoShapeType")),
        rotation: optional(shape.get_f64("Rotation")).unwrap_or(0.0),
        has_smartart: optional(shape.get_bool("HasSmartArt")).unwrap_or(false),
        is_connector: optional(shape.get_bool("Connector")).unwrap_or(false),
        flip_h: optional(shape.get_bool("HorizontalFlip")).unwrap_or(false),
        flip_v: optional(shape.get_bool("VerticalFlip")).unwrap_or(false),
        ..RawShape::default()
    };

    if raw.has_smartart {
        if let Ok(smartart) = shape.get_child("SmartArt") {
            raw.smartart_layout = smartart
                .get_child("Layout")
                .ok()
                .and_then(|layout| optional(layout.get_string("Name")));
            let nodes = smartart.get_child("AllNodes")?;
            for i in 1..=nodes.count()? {
                let node = nodes.item(i)?;
                raw.smartart_nodes.push(RawSmartArtNode {
                    level: node.get_i32("Level")?.unwrap_or(1).max(0) as u32,
                    text: shape_text(&node),
                });
            }
        }
    }

    if let Ok(line) = shape.get_child("Line") {
        let begin = optional(line.get_i32("BeginArrowheadStyle"));
        let end = optional(line.get_i32("EndArrowheadStyle"));
        let has_head = [begin, end]
            .iter()
            .any(|s| matches!(s, Some(style) if *style != MSO_ARROWHEAD_NONE));
        if has_head || raw.is_connector {
            raw.begin_arrow_style = begin;
            raw.end_arrow_style = end;
        }
    }

    if raw.is_connector {
        if let Ok(format) = shape.get_child("ConnectorFormat") {
            let endpoint = |flag: &str, target: &str| -> Option<u32> {
                if optional(format.get_bool(flag)) != Some(true) {
                    return None;
                }
                let other = format.get_child(target).ok()?;
                optional(other.get_i32("ID")).map(|id| id as u32)
            };
            raw.begin_connected_id = endpoint("BeginConnected", "BeginConnectedShape");
            raw.end_connected_id = endpoint("EndConnected", "EndConnectedShape");
        }
    }

    out.push(raw);
    Ok(())
}

fn read_chart_details(object: &DispatchObject, raw: &mut RawChart) -> Result<(), String> {
    let chart = object.get_child("Chart")?;
    raw.chart_type = chart.get_i32("ChartType")?.unwrap_or(0);
    if chart.get_bool("HasTitle")? == Some(true) {
        raw.title = chart.get_child("ChartTitle")?.get_string("Text")?;
    }

    if let Ok(axis) = chart.invoke_child("Axes", &[variant_i32(XL_VALUE_AXIS)]) {
        if axis.get_bool("HasTitle")? == Some(true) {
            raw.y_axis_title = axis
                .get_child("AxisTitle")?
                .get_string("Text")?
                .unwrap_or_default();
        }
        raw.y_axis_min = axis.get_f64("MinimumScale")?;
        raw.y_axis_max = axis.get_f64("MaximumScale")?;
    }

    let series = chart.invoke_child("SeriesCollection", &[])?;
    for i in 1..=series.count()? {
        let s = series.item(i)?;
        raw.series.push(RawSeries {
            name: optional(s.get_string("Name")).unwrap_or_default(),
            formula: optional(s.get_string("Formula")).unwrap_or_default(),
        });
    }
    Ok(())
}

/// Solid interior color as `RRGGBB`, or `None` when the cell has no fill.
fn interior_rgb(cell: &DispatchObject) -> Result<Option<String>, String> {
    let interior = cell.get_child("Interior")?;
    if interior.get_i32("Pattern")? == Some(XL_NONE) {
        return Ok(None);
    }
    // COM colors are BGR packed into a long.
    Ok(interior.get_f64("Color")?.map(|bgr| {
        let bgr = bgr as u32;
        format!(
            "{:02X}{:02X}{:02X}",
            bgr & 0xFF,
            (bgr >> 8) & 0xFF,
            (bgr >> 16) & 0xFF
        )
    }))
}

fn has_border(cell: &DispatchObject) -> Result<bool, String> {
    let borders = cell.get_child("Borders")?;
    for edge in XL_EDGES {
        let style = borders.get_indexed("Item", &[variant_i32(edge)])?.get_i32("LineStyle")?;
        if matches!(style, Some(s) if s != XL_NONE) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ole_date_to_iso(serial: f64) -> Option<String> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    let stamp = epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(seconds))?;
    Some(if seconds == 0 {
        stamp.format("%Y-%m-%d").to_string()
    } else {
        stamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    })
}

fn error_code(scode: i32) -> String {
    match scode & 0xFFFF {
        2000 => "#NULL!",
        2007 => "#DIV/0!",
        2015 => "#VALUE!",
        2023 => "#REF!",
        2029 => "#NAME?",
        2036 => "#NUM!",
        2042 => "#N/A",
        _ => "#ERR",
    }
    .to_string()
}

fn variant_to_cell_value(variant: &VARIANT) -> CellValue {
    if variant_is_empty(variant) {
        CellValue::Null
    } else if let Some(b) = variant_get_bool(variant) {
        CellValue::Bool(b)
    } else if let Some(n) = variant_get_f64(variant) {
        CellValue::Number(n)
    } else if let Some(d) = variant_get_date(variant) {
        ole_date_to_iso(d).map_or(CellValue::Number(d), CellValue::String)
    } else if let Some(s) = variant_get_string(variant) {
        if s.is_empty() {
            CellValue::Null
        } else {
            CellValue::String(s)
        }
    } else if let Some(scode) = variant_get_error(variant) {
        CellValue::Error(CellError {
            code: error_code(scode),
        })
    } else {
        CellValue::Null
    }
}
