//! The two interchangeable backends.
//!
//! [`FileBackend`] parses the workbook package directly and works
//! everywhere. An [`AutomationBackend`] drives a live spreadsheet
//! application; it additionally sees drawing objects, charts and computed
//! page breaks, but may be unavailable or fail part-way.

mod automation;
mod file;

use std::path::Path;

use exstruct_core::{
    parse_range, split_area_list, strip_sheet_prefix, CellRow, ColorsMap, PrintArea, SheetMetrics,
};
use exstruct_excel_com::{PageBreakLayout, RawChart, RawShape};

pub use automation::{grid_from_raw, ComBackend, ExcelComConnector, NoAutomation};
pub use file::FileBackend;

use crate::error::BackendResult;
use crate::options::ColorsOptions;
use crate::table::TableDetectionConfig;

/// What every backend can read.
pub trait Backend {
    /// Worksheet names in workbook order.
    fn sheet_names(&self) -> BackendResult<Vec<String>>;

    fn cells(&self, sheet: &str, include_links: bool) -> BackendResult<Vec<CellRow>>;

    fn print_areas(&self, sheet: &str) -> BackendResult<Vec<PrintArea>>;

    fn colors_map(&self, sheet: &str, options: &ColorsOptions) -> BackendResult<ColorsMap>;

    fn table_candidates(
        &self,
        sheet: &str,
        config: &TableDetectionConfig,
    ) -> BackendResult<Vec<String>>;

    /// Row heights and column widths.
    fn metrics(&self, sheet: &str) -> BackendResult<SheetMetrics>;
}

/// What only a live application can read.
pub trait AutomationBackend: Backend {
    /// Drawing objects, unclassified.
    fn graphics(&self, sheet: &str) -> BackendResult<Vec<RawShape>>;

    fn charts(&self, sheet: &str) -> BackendResult<Vec<RawChart>>;

    fn auto_page_breaks(&self, sheet: &str) -> BackendResult<PageBreakLayout>;
}

/// Opens automation sessions. Dropping the returned backend ends its session.
pub trait AutomationConnector {
    fn connect(&self, path: &Path) -> BackendResult<Box<dyn AutomationBackend>>;
}

/// Print areas of `sheet` from a print-area list such as
/// `'My Sheet'!$A$1:$B$2,'My Sheet'!$D$1:$E$4`.
///
/// Parts naming another sheet and unparseable parts are skipped.
pub(crate) fn print_areas_from_text(text: &str, sheet: &str) -> Vec<PrintArea> {
    let mut areas: Vec<PrintArea> = Vec::new();
    for part in split_area_list(text) {
        let Some(range) = strip_sheet_prefix(&part, sheet) else {
            continue;
        };
        match parse_range(range) {
            Some(bounds) => {
                let area = PrintArea::from_zero_based(bounds);
                if !areas.contains(&area) {
                    areas.push(area);
                }
            }
            None => log::debug!("skipping print area part {part:?} on {sheet:?}"),
        }
    }
    areas
}
