//! Shared protocol types for communication between the native client and
//! the Windows COM bridge process that drives Excel.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each direction.
//! All row and column numbers on the wire are 1-based, as Excel reports them.

use serde::{Deserialize, Serialize};

/// A command sent from the client to the bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Initialize COM and create a hidden Excel.Application instance.
    Init,

    /// Open an existing workbook read-only (Windows path). Returns a handle.
    OpenWorkbook { path: String },

    /// Worksheet names in workbook order.
    ListSheets { workbook: u64 },

    /// Every drawing object on a sheet, group members flattened.
    GetShapes { workbook: u64, sheet: SheetRef },

    /// Embedded chart objects on a sheet.
    GetCharts { workbook: u64, sheet: SheetRef },

    /// The sheet's `PageSetup.PrintArea` text.
    GetPrintAreas { workbook: u64, sheet: SheetRef },

    /// Automatic and manual page breaks plus the areas they split.
    GetPageBreaks { workbook: u64, sheet: SheetRef },

    /// Values, fills, borders, hyperlinks, list objects and sizes of the used range.
    GetSheetGrid { workbook: u64, sheet: SheetRef },

    /// Close a workbook without saving.
    CloseWorkbook { workbook: u64 },

    /// Shut down the bridge: close all workbooks, quit Excel, uninitialize COM.
    Shutdown,
}

/// Reference to a worksheet, by 0-based index or by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    Index(u32),
    Name(String),
}

impl From<&str> for SheetRef {
    fn from(s: &str) -> Self {
        SheetRef::Name(s.to_string())
    }
}

/// A cell value read from Excel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Error(CellError),
}

/// Excel error values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellError {
    pub code: String,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, "<empty>"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Error(e) => write!(f, "{}", e.code),
        }
    }
}

/// One SmartArt node as Excel lists it: depth plus text, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSmartArtNode {
    pub level: u32,
    pub text: String,
}

/// A drawing object as reported by Excel, before classification.
///
/// Positions and sizes are in points. Optional properties are absent when
/// the object does not support them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawShape {
    #[serde(default)]
    pub id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub text: String,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// `MsoShapeType` of the object.
    pub mso_type: i32,
    #[serde(default)]
    pub autoshape_type: Option<i32>,
    /// Name of the autoshape type, when the bridge could resolve it.
    #[serde(default)]
    pub autoshape_name: Option<String>,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub has_smartart: bool,
    #[serde(default)]
    pub smartart_layout: Option<String>,
    #[serde(default)]
    pub smartart_nodes: Vec<RawSmartArtNode>,
    #[serde(default)]
    pub begin_arrow_style: Option<i32>,
    #[serde(default)]
    pub end_arrow_style: Option<i32>,
    #[serde(default)]
    pub is_connector: bool,
    #[serde(default)]
    pub begin_connected_id: Option<u32>,
    #[serde(default)]
    pub end_connected_id: Option<u32>,
    #[serde(default)]
    pub flip_h: bool,
    #[serde(default)]
    pub flip_v: bool,
}

/// One series of a chart: its name and its `=SERIES(...)` formula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formula: String,
}

/// An embedded chart as reported by Excel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChart {
    pub name: String,
    /// `XlChartType` code.
    #[serde(default)]
    pub chart_type: i32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub y_axis_title: String,
    #[serde(default)]
    pub y_axis_min: Option<f64>,
    #[serde(default)]
    pub y_axis_max: Option<f64>,
    #[serde(default)]
    pub series: Vec<RawSeries>,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Set when reading this chart's details failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// A rectangle of cells, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRect {
    pub first_row: u32,
    pub first_col: u32,
    pub last_row: u32,
    pub last_col: u32,
}

/// Page-break layout of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageBreakLayout {
    /// The print areas, or the used range when none is defined.
    pub areas: Vec<AreaRect>,
    /// Rows that start a new page.
    #[serde(default)]
    pub row_breaks: Vec<u32>,
    /// Columns that start a new page.
    #[serde(default)]
    pub col_breaks: Vec<u32>,
}

/// One non-default cell of the used range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
    /// Solid fill as `RRGGBB`.
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub border: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLink {
    pub row: u32,
    pub col: u32,
    pub target: String,
}

/// Cell content and layout of a sheet's used range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGrid {
    pub cells: Vec<RawCell>,
    #[serde(default)]
    pub links: Vec<RawLink>,
    /// `ListObject` ranges as A1 text.
    #[serde(default)]
    pub list_objects: Vec<String>,
    pub default_row_height: f64,
    pub default_col_width: f64,
    /// `(row, points)` for rows whose height differs from the default.
    #[serde(default)]
    pub row_heights: Vec<(u32, f64)>,
    /// `(col, points)` for columns whose width differs from the default.
    #[serde(default)]
    pub col_widths: Vec<(u32, f64)>,
}

/// A response sent from the bridge back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Data returned in successful responses.
///
/// Untagged: each variant is recognized by its single required field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Handle to an opened workbook.
    WorkbookHandle { workbook: u64 },
    SheetNames { sheets: Vec<String> },
    Shapes { shapes: Vec<RawShape> },
    Charts { charts: Vec<RawChart> },
    PageBreaks { page_breaks: PageBreakLayout },
    Grid { grid: RawGrid },
    /// `PageSetup.PrintArea`; empty when the sheet has none.
    PrintArea { print_area: String },
}
