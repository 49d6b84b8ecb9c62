//! # exstruct
//!
//! Turns spreadsheet workbooks into a typed, LLM-friendly tree: sparse cell
//! rows, shapes, connectors and SmartArt diagrams, charts, table candidates
//! and print-area views.
//!
//! Two backends feed the tree. The file backend parses the `.xlsx` package
//! and always runs. The automation backend drives a live Excel through the
//! COM bridge and adds what only Excel knows: drawing objects, charts and
//! computed page breaks. When automation is missing or fails, extraction
//! still succeeds with file data and reports a [`Fallback`].
//!
//! ## Modes
//!
//! - `light`: cells, table candidates, print areas; no automation
//! - `standard`: adds graphics with text, connectors and charts
//! - `verbose`: adds every graphic, object sizes and cell hyperlinks
//!
//! ## Example
//!
//! ```rust,no_run
//! use exstruct::{extract, ExtractionMode, FallbackReason};
//!
//! let extraction = extract("report.xlsx", ExtractionMode::Standard).unwrap();
//! if let Some(fallback) = &extraction.fallback {
//!     eprintln!("no shapes or charts: {} ({})", fallback.reason, fallback.detail);
//! }
//! for (name, sheet) in extraction.workbook.sheets.iter() {
//!     println!("{name}: {} rows, {} tables", sheet.rows.len(), sheet.table_candidates.len());
//! }
//! ```

pub mod backend;
pub mod charts;
pub mod colors;
pub mod engine;
pub mod error;
pub mod graphics;
pub mod options;
pub mod page_breaks;
pub mod pipeline;
pub mod smartart;
pub mod table;
pub mod view;

pub use backend::{
    AutomationBackend, AutomationConnector, Backend, ComBackend, ExcelComConnector, FileBackend,
    NoAutomation,
};
pub use engine::{extract, Extractor, OutputFilter};
pub use error::{BackendError, BackendResult, Error, Result};
pub use options::{ColorsOptions, ExtractionMode, ExtractionOptions};
pub use pipeline::{
    run_pipeline, AutomationRequirement, Extraction, Fallback, FallbackReason, Stage,
};
pub use smartart::{build_tree, flatten_nodes};
pub use table::{
    reset_table_detection_params, set_table_detection_params, table_detection_config,
    TableDetectionConfig, TableParams,
};
pub use view::{print_area_views, PrintAreaView, ViewOptions};

pub use exstruct_core::{
    parse_range, Arrow, Bounds, CellRow, CellValue, Chart, ChartSeries, ColorsMap, Direction,
    Graphic, PrintArea, Shape, ShapeBase, SheetData, SmartArt, SmartArtNode, WorkbookData,
};
pub use exstruct_excel_com::{
    AreaRect, ExcelBridgeConfig, PageBreakLayout, RawChart, RawSeries, RawShape, RawSmartArtNode,
};
