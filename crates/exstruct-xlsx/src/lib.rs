//! # exstruct-xlsx
//!
//! Reads the parts of an XLSX package that extraction needs: cell values,
//! hyperlinks, fills, borders, row and column sizes, table parts and
//! `_xlnm.Print_Area` defined names. The result is one
//! [`exstruct_core::SheetGrid`] per worksheet.

pub mod error;
pub mod reader;

mod numfmt;
mod styles;

pub use error::{SheetUnreadable, XlsxError, XlsxResult};
pub use reader::{DefinedPrintArea, XlsxReader, XlsxSheet, XlsxWorkbook};
