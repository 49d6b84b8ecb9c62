//! # exstruct-core
//!
//! Core data model for exstruct, the workbook-to-semantic-tree extractor.
//!
//! This crate provides the types shared by every backend and by the pipeline:
//! - [`CellRow`] and [`CellValue`] - Sparse cell rows
//! - [`Graphic`] - Tagged union over [`Shape`], [`Arrow`] and [`SmartArt`]
//! - [`Chart`] and [`ChartSeries`] - Chart metadata with range references
//! - [`PrintArea`] - Print-area rectangles (rows 1-based, columns 0-based)
//! - [`SheetData`] and [`WorkbookData`] - Per-sheet and per-workbook aggregates
//! - [`SheetGrid`] - Backend-neutral sparse grid consumed by the detectors
//! - [`parse_range`] - The single place where A1 text becomes integers
//!
//! ## Example
//!
//! ```rust
//! use exstruct_core::{parse_range, Bounds, PrintArea};
//!
//! let bounds = parse_range("'Sales Q1'!$A$1:$B$2").unwrap();
//! assert_eq!(bounds, Bounds::new(0, 0, 1, 1));
//!
//! let area = PrintArea::from_zero_based(bounds);
//! assert_eq!((area.r1, area.c1, area.r2, area.c2), (1, 0, 2, 1));
//! ```

pub mod address;
pub mod cell;
pub mod chart;
pub mod error;
pub mod grid;
pub mod print_area;
pub mod range;
pub mod shape;
pub mod sheet;

pub use address::CellAddress;
pub use cell::{CellRow, CellValue};
pub use chart::{Chart, ChartSeries};
pub use error::{Error, Result};
pub use grid::SheetGrid;
pub use print_area::PrintArea;
pub use range::{parse_range, split_area_list, split_sheet_prefix, strip_sheet_prefix, Bounds};
pub use shape::{Arrow, Direction, Graphic, Shape, ShapeBase, SmartArt, SmartArtNode};
pub use sheet::{ColorsMap, SheetData, SheetMetrics, Sheets, WorkbookData};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u32 = 16_384;
