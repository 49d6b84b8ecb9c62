//! Backend over the parsed workbook package.

use std::path::Path;

use exstruct_core::{CellRow, ColorsMap, PrintArea, SheetGrid, SheetMetrics};
use exstruct_xlsx::{XlsxError, XlsxReader, XlsxWorkbook};

use super::{print_areas_from_text, Backend};
use crate::colors::colors_map;
use crate::error::{BackendError, BackendResult};
use crate::options::ColorsOptions;
use crate::table::{detect_tables, TableDetectionConfig};

/// Reads everything from the `.xlsx`/`.xlsm` package, parsed once up front.
#[derive(Debug)]
pub struct FileBackend {
    workbook: XlsxWorkbook,
}

impl FileBackend {
    pub fn open(path: &Path) -> Result<Self, XlsxError> {
        let workbook = XlsxReader::read_file(path)?;
        log::debug!(
            "parsed {} with {} sheet(s)",
            path.display(),
            workbook.sheets.len()
        );
        Ok(Self::from_workbook(workbook))
    }

    pub fn from_workbook(workbook: XlsxWorkbook) -> Self {
        Self { workbook }
    }

    /// The parsed grid of `sheet`. Fails when the sheet's part was unreadable.
    pub fn grid(&self, sheet: &str) -> BackendResult<&SheetGrid> {
        let entry = self
            .workbook
            .sheet(sheet)
            .ok_or_else(|| BackendError::UnknownSheet(sheet.to_string()))?;
        entry.grid.as_ref().map_err(|e| e.clone().into())
    }

    fn sheet_index(&self, sheet: &str) -> BackendResult<usize> {
        self.workbook
            .sheets
            .iter()
            .position(|s| s.name == sheet)
            .ok_or_else(|| BackendError::UnknownSheet(sheet.to_string()))
    }
}

impl Backend for FileBackend {
    fn sheet_names(&self) -> BackendResult<Vec<String>> {
        Ok(self.workbook.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn cells(&self, sheet: &str, include_links: bool) -> BackendResult<Vec<CellRow>> {
        Ok(self.grid(sheet)?.to_rows(include_links))
    }

    /// `_xlnm.Print_Area` names scoped to the sheet, or workbook-scoped ones
    /// that reference it when the sheet has none.
    fn print_areas(&self, sheet: &str) -> BackendResult<Vec<PrintArea>> {
        let index = self.sheet_index(sheet)?;
        let defined = &self.workbook.print_areas;

        let local: Vec<&str> = defined
            .iter()
            .filter(|d| d.local_sheet == Some(index))
            .map(|d| d.formula.as_str())
            .collect();
        let formulas = if local.is_empty() {
            defined
                .iter()
                .filter(|d| d.local_sheet.is_none())
                .map(|d| d.formula.as_str())
                .collect()
        } else {
            local
        };

        let mut areas = Vec::new();
        for formula in formulas {
            for area in print_areas_from_text(formula, sheet) {
                if !areas.contains(&area) {
                    areas.push(area);
                }
            }
        }
        Ok(areas)
    }

    fn colors_map(&self, sheet: &str, options: &ColorsOptions) -> BackendResult<ColorsMap> {
        Ok(colors_map(self.grid(sheet)?, options))
    }

    fn table_candidates(
        &self,
        sheet: &str,
        config: &TableDetectionConfig,
    ) -> BackendResult<Vec<String>> {
        Ok(detect_tables(self.grid(sheet)?, config))
    }

    fn metrics(&self, sheet: &str) -> BackendResult<SheetMetrics> {
        Ok(self.grid(sheet)?.metrics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exstruct_core::CellValue;
    use exstruct_xlsx::{DefinedPrintArea, SheetUnreadable, XlsxSheet};
    use pretty_assertions::assert_eq;

    fn backend() -> FileBackend {
        let mut summary = SheetGrid::new();
        summary.set_value(0, 0, "Item".into());
        summary.set_value(0, 1, "Total".into());
        summary.set_value(1, 0, "Rent".into());
        summary.set_value(1, 1, CellValue::Int(1200));
        summary.fills.insert((0, 0), "D9E1F2".into());

        FileBackend::from_workbook(XlsxWorkbook {
            sheets: vec![
                XlsxSheet {
                    name: "Summary".into(),
                    grid: Ok(summary),
                },
                XlsxSheet {
                    name: "Data 2".into(),
                    grid: Ok(SheetGrid::new()),
                },
                XlsxSheet {
                    name: "Broken".into(),
                    grid: Err(SheetUnreadable {
                        part: "xl/worksheets/sheet3.xml".into(),
                        message: "Parse error: bad cell".into(),
                    }),
                },
            ],
            print_areas: vec![
                DefinedPrintArea {
                    local_sheet: Some(0),
                    formula: "Summary!$A$1:$B$2".into(),
                },
                DefinedPrintArea {
                    local_sheet: None,
                    formula: "'Data 2'!$C$3:$D$9,Summary!$A$1:$Z$99".into(),
                },
            ],
            date1904: false,
        })
    }

    #[test]
    fn test_sheet_local_print_areas_win() {
        let backend = backend();
        assert_eq!(
            backend.print_areas("Summary").unwrap(),
            vec![PrintArea { r1: 1, c1: 0, r2: 2, c2: 1 }]
        );
    }

    #[test]
    fn test_workbook_scoped_print_areas_as_fallback() {
        let backend = backend();
        assert_eq!(
            backend.print_areas("Data 2").unwrap(),
            vec![PrintArea { r1: 3, c1: 2, r2: 9, c2: 3 }]
        );
    }

    #[test]
    fn test_cells_and_colors() {
        let backend = backend();
        assert_eq!(
            backend.sheet_names().unwrap(),
            vec!["Summary", "Data 2", "Broken"]
        );
        let rows = backend.cells("Summary", false).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].c.get(&1), Some(&CellValue::Int(1200)));

        let colors = backend
            .colors_map("Summary", &ColorsOptions::default())
            .unwrap();
        assert_eq!(colors["D9E1F2"], vec![(1, 0)]);
    }

    #[test]
    fn test_unknown_sheet() {
        assert!(matches!(
            backend().cells("Missing", false),
            Err(BackendError::UnknownSheet(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_unreadable_sheet_fails_grid_steps_only() {
        let backend = backend();
        assert!(matches!(
            backend.cells("Broken", false),
            Err(BackendError::FileUnreadable(ref e)) if e.part == "xl/worksheets/sheet3.xml"
        ));
        assert!(backend
            .table_candidates("Broken", &TableDetectionConfig::default())
            .is_err());
        // Print areas come from workbook.xml, not the sheet part.
        assert_eq!(backend.print_areas("Broken").unwrap(), Vec::new());
    }
}
