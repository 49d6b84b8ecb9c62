//! Backend over a live Excel instance reached through the COM bridge.

use std::path::Path;

use exstruct_core::{
    parse_range, CellRow, CellValue, ColorsMap, PrintArea, SheetGrid, SheetMetrics,
};
use exstruct_excel_com::{
    BridgeError, CellValue as RawValue, ExcelBridgeConfig, ExcelSession, PageBreakLayout,
    RawChart, RawGrid, RawShape,
};

use super::{print_areas_from_text, AutomationBackend, AutomationConnector, Backend};
use crate::colors::colors_map;
use crate::error::{BackendError, BackendResult};
use crate::options::ColorsOptions;
use crate::table::{detect_tables, TableDetectionConfig};

/// A connector that never connects, for runs without automation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAutomation;

impl AutomationConnector for NoAutomation {
    fn connect(&self, _path: &Path) -> BackendResult<Box<dyn AutomationBackend>> {
        Err(BackendError::AutomationUnavailable(
            "automation is not configured".to_string(),
        ))
    }
}

/// Connects by starting the Excel COM bridge.
#[derive(Debug, Clone, Default)]
pub struct ExcelComConnector {
    config: ExcelBridgeConfig,
}

impl ExcelComConnector {
    pub fn new(config: ExcelBridgeConfig) -> Self {
        Self { config }
    }

    /// Bridge configuration from the environment, see [`ExcelBridgeConfig::from_env`].
    pub fn from_env() -> Self {
        Self::new(ExcelBridgeConfig::from_env())
    }
}

impl AutomationConnector for ExcelComConnector {
    fn connect(&self, path: &Path) -> BackendResult<Box<dyn AutomationBackend>> {
        let session = ExcelSession::open(self.config.clone(), path)
            .map_err(|e| BackendError::AutomationUnavailable(e.to_string()))?;
        Ok(Box::new(ComBackend::new(session)))
    }
}

/// One open workbook in Excel. Dropping it closes the workbook and stops
/// the bridge.
pub struct ComBackend {
    session: ExcelSession,
}

fn call<T>(operation: &'static str, result: Result<T, BridgeError>) -> BackendResult<T> {
    result.map_err(|e| BackendError::AutomationCall {
        operation,
        message: e.to_string(),
    })
}

impl ComBackend {
    pub fn new(session: ExcelSession) -> Self {
        Self { session }
    }

    fn grid(&self, sheet: &str) -> BackendResult<SheetGrid> {
        call("GetSheetGrid", self.session.grid(sheet)).map(grid_from_raw)
    }
}

impl Backend for ComBackend {
    fn sheet_names(&self) -> BackendResult<Vec<String>> {
        call("ListSheets", self.session.sheet_names())
    }

    fn cells(&self, sheet: &str, include_links: bool) -> BackendResult<Vec<CellRow>> {
        Ok(self.grid(sheet)?.to_rows(include_links))
    }

    fn print_areas(&self, sheet: &str) -> BackendResult<Vec<PrintArea>> {
        let text = call("GetPrintAreas", self.session.print_area(sheet))?;
        Ok(print_areas_from_text(&text, sheet))
    }

    fn colors_map(&self, sheet: &str, options: &ColorsOptions) -> BackendResult<ColorsMap> {
        Ok(colors_map(&self.grid(sheet)?, options))
    }

    fn table_candidates(
        &self,
        sheet: &str,
        config: &TableDetectionConfig,
    ) -> BackendResult<Vec<String>> {
        Ok(detect_tables(&self.grid(sheet)?, config))
    }

    fn metrics(&self, sheet: &str) -> BackendResult<SheetMetrics> {
        Ok(self.grid(sheet)?.metrics)
    }
}

impl AutomationBackend for ComBackend {
    fn graphics(&self, sheet: &str) -> BackendResult<Vec<RawShape>> {
        call("GetShapes", self.session.shapes(sheet))
    }

    fn charts(&self, sheet: &str) -> BackendResult<Vec<RawChart>> {
        call("GetCharts", self.session.charts(sheet))
    }

    fn auto_page_breaks(&self, sheet: &str) -> BackendResult<PageBreakLayout> {
        call("GetPageBreaks", self.session.page_breaks(sheet))
    }
}

/// Convert the bridge's 1-based grid to a zero-based [`SheetGrid`].
pub fn grid_from_raw(raw: RawGrid) -> SheetGrid {
    let mut grid = SheetGrid::new();
    let zero = |row: u32, col: u32| (row.saturating_sub(1), col.saturating_sub(1));

    for cell in raw.cells {
        let (r, c) = zero(cell.row, cell.col);
        match cell.value {
            RawValue::Null => {
                grid.styled.insert((r, c));
            }
            RawValue::Bool(b) => grid.set_value(r, c, CellValue::Bool(b)),
            RawValue::Number(n) => grid.set_value(r, c, CellValue::number(n)),
            RawValue::String(s) => grid.set_value(r, c, CellValue::Text(s)),
            RawValue::Error(e) => grid.set_value(r, c, CellValue::Text(e.code)),
        }
        if let Some(fill) = cell.fill {
            grid.fills.insert((r, c), fill.to_ascii_uppercase());
        }
        if cell.border {
            grid.borders.insert((r, c));
        }
    }

    for link in raw.links {
        grid.links.insert(zero(link.row, link.col), link.target);
    }

    for reference in raw.list_objects {
        match parse_range(&reference) {
            Some(bounds) => grid.declared_tables.push(bounds.to_a1()),
            None => log::debug!("ignoring list object range {reference:?}"),
        }
    }

    grid.metrics.default_row_height = raw.default_row_height;
    grid.metrics.default_col_width = raw.default_col_width;
    grid.metrics.row_heights.extend(raw.row_heights);
    grid.metrics
        .col_widths
        .extend(raw.col_widths.into_iter().map(|(c, w)| (c.saturating_sub(1), w)));
    grid
}
