//! The extraction pipeline.
//!
//! The file backend always runs first and owns cells, print areas, colors
//! and table candidates. Automation runs next when the mode needs it and
//! contributes graphics, charts and page-break areas. An automation problem
//! never fails the run: it discards whatever automation produced, is logged,
//! and comes back as a [`Fallback`] on the result.
//!
//! A file-backend step that fails for one sheet, typically because that
//! sheet's part is unreadable, leaves a gap. A live automation session
//! fills it; otherwise the field stays empty.

use std::fmt;
use std::path::Path;

use exstruct_core::{SheetData, WorkbookData};
use serde::{Deserialize, Serialize};

use crate::backend::{AutomationBackend, AutomationConnector, Backend, FileBackend};
use crate::charts::chart_from_raw;
use crate::error::{BackendResult, Error, Result};
use crate::graphics::graphics_for_mode;
use crate::options::{ExtractionMode, ExtractionOptions};
use crate::page_breaks::auto_print_areas;

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    SelectBackends,
    RunFileBackend,
    RunAutomationBackend,
    SkipAutomation,
    Merge,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::SelectBackends => "select-backends",
            Stage::RunFileBackend => "run-file-backend",
            Stage::RunAutomationBackend => "run-automation-backend",
            Stage::SkipAutomation => "skip-automation",
            Stage::Merge => "merge",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// How much a run depends on automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationRequirement {
    /// Graphics and charts need it.
    Required,
    /// Only page breaks need it; the run is complete without them.
    Optional,
    Unused,
}

impl AutomationRequirement {
    pub fn for_options(options: &ExtractionOptions) -> Self {
        match options.mode {
            ExtractionMode::Standard | ExtractionMode::Verbose => AutomationRequirement::Required,
            ExtractionMode::Light if options.include_auto_page_breaks => {
                AutomationRequirement::Optional
            }
            ExtractionMode::Light => AutomationRequirement::Unused,
        }
    }
}

/// Why automation output is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No session could be started.
    AutomationUnavailable,
    /// A session started but a call failed.
    AutomationFailed,
    /// The mode does not use automation.
    DisabledByMode,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FallbackReason::AutomationUnavailable => "automation unavailable",
            FallbackReason::AutomationFailed => "automation failed",
            FallbackReason::DisabledByMode => "disabled by mode",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fallback {
    pub reason: FallbackReason,
    pub detail: String,
}

/// Result of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub workbook: WorkbookData,
    /// Set when automation output is missing.
    pub fallback: Option<Fallback>,
}

/// File-backend steps that failed for a sheet and that automation can redo.
#[derive(Debug, Clone, Copy, Default)]
struct Gaps {
    /// Rows and metrics.
    cells: bool,
    print_areas: bool,
    colors: bool,
    tables: bool,
}

impl Gaps {
    fn any(&self) -> bool {
        self.cells || self.print_areas || self.colors || self.tables
    }
}

/// What automation produced for one sheet.
#[derive(Debug, Default)]
struct AutomationSheet {
    data: SheetData,
    filled: Gaps,
}

/// Run the pipeline on the workbook at `path`.
pub fn run_pipeline(
    path: &Path,
    options: &ExtractionOptions,
    connector: &dyn AutomationConnector,
) -> Result<Extraction> {
    Pipeline::new(options, connector).run(path)
}

struct Pipeline<'a> {
    options: &'a ExtractionOptions,
    connector: &'a dyn AutomationConnector,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    fn new(options: &'a ExtractionOptions, connector: &'a dyn AutomationConnector) -> Self {
        Self {
            options,
            connector,
            stage: Stage::Init,
        }
    }

    fn enter(&mut self, next: Stage) {
        log::debug!("pipeline: {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn run(mut self, path: &Path) -> Result<Extraction> {
        check_format(path)?;

        self.enter(Stage::SelectBackends);
        let requirement = AutomationRequirement::for_options(self.options);
        log::debug!(
            "mode {} needs automation: {:?}",
            self.options.mode,
            requirement
        );

        self.enter(Stage::RunFileBackend);
        let file = FileBackend::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut sheets = self.run_file_backend(&file);

        let (automation, fallback) = if requirement == AutomationRequirement::Unused {
            self.enter(Stage::SkipAutomation);
            log::info!("automation skipped in {} mode", self.options.mode);
            let fallback = Fallback {
                reason: FallbackReason::DisabledByMode,
                detail: format!("automation is not used in {} mode", self.options.mode),
            };
            (Vec::new(), Some(fallback))
        } else {
            self.enter(Stage::RunAutomationBackend);
            match self.run_automation(path, requirement, &sheets) {
                Ok(results) => (results, None),
                Err(fallback) => {
                    if requirement == AutomationRequirement::Required {
                        log::warn!("{}: {}", fallback.reason, fallback.detail);
                    } else {
                        log::info!("{}: {}", fallback.reason, fallback.detail);
                    }
                    (Vec::new(), Some(fallback))
                }
            }
        };

        self.enter(Stage::Merge);
        for ((_, data, gaps), auto) in sheets.iter_mut().zip(automation) {
            merge(data, gaps, auto);
        }

        let workbook = WorkbookData {
            book_name: book_name(path),
            sheets: sheets
                .into_iter()
                .map(|(name, data, _)| (name, data))
                .collect(),
        };

        self.enter(Stage::Done);
        Ok(Extraction { workbook, fallback })
    }

    fn run_file_backend(&self, file: &FileBackend) -> Vec<(String, SheetData, Gaps)> {
        let options = self.options;
        let config = options.table_config();
        let names = match file.sheet_names() {
            Ok(names) => names,
            Err(e) => {
                log::warn!("sheet names unavailable from file: {e}");
                Vec::new()
            }
        };

        names
            .into_iter()
            .map(|name| {
                let mut data = SheetData::default();
                let mut gaps = Gaps::default();

                let rows = step(&name, "cells", file.cells(&name, options.cell_links_enabled()));
                let metrics = step(&name, "metrics", file.metrics(&name));
                match (rows, metrics) {
                    (Some(rows), Some(metrics)) => {
                        data.rows = rows;
                        data.metrics = metrics;
                    }
                    _ => gaps.cells = true,
                }
                match step(&name, "table candidates", file.table_candidates(&name, &config)) {
                    Some(tables) => data.table_candidates = tables,
                    None => gaps.tables = true,
                }
                if options.include_print_areas {
                    match step(&name, "print areas", file.print_areas(&name)) {
                        Some(areas) => data.print_areas = areas,
                        None => gaps.print_areas = true,
                    }
                }
                if options.include_colors_map {
                    match step(&name, "colors map", file.colors_map(&name, &options.colors)) {
                        Some(colors) => data.colors_map = colors,
                        None => gaps.colors = true,
                    }
                }
                (name, data, gaps)
            })
            .collect()
    }

    /// Everything automation contributes, or the fallback describing why
    /// there is nothing. The session ends when this returns.
    fn run_automation(
        &self,
        path: &Path,
        requirement: AutomationRequirement,
        sheets: &[(String, SheetData, Gaps)],
    ) -> std::result::Result<Vec<AutomationSheet>, Fallback> {
        let backend = self.connector.connect(path).map_err(|e| Fallback {
            reason: FallbackReason::AutomationUnavailable,
            detail: e.to_string(),
        })?;

        let results = sheets
            .iter()
            .map(|(name, _, gaps)| self.automation_sheet(backend.as_ref(), name, requirement, gaps))
            .collect::<BackendResult<Vec<_>>>()
            .map_err(|e| Fallback {
                reason: FallbackReason::AutomationFailed,
                detail: e.to_string(),
            });

        drop(backend);
        log::debug!("automation session closed");
        results
    }

    fn automation_sheet(
        &self,
        backend: &dyn AutomationBackend,
        sheet: &str,
        requirement: AutomationRequirement,
        gaps: &Gaps,
    ) -> BackendResult<AutomationSheet> {
        let options = self.options;
        let mut out = AutomationSheet::default();

        if requirement == AutomationRequirement::Required {
            let raw = backend.graphics(sheet)?;
            out.data.shapes = graphics_for_mode(&raw, options.mode);
            out.data.charts = backend.charts(sheet)?.iter().map(chart_from_raw).collect();
        }
        if options.include_auto_page_breaks {
            out.data.auto_print_areas = auto_print_areas(&backend.auto_page_breaks(sheet)?);
        }

        if gaps.any() {
            log::debug!("filling file-backend gaps on {sheet:?} from automation: {gaps:?}");
        }
        if gaps.cells {
            out.data.rows = backend.cells(sheet, options.cell_links_enabled())?;
            out.data.metrics = backend.metrics(sheet)?;
            out.filled.cells = true;
        }
        if gaps.print_areas {
            out.data.print_areas = backend.print_areas(sheet)?;
            out.filled.print_areas = true;
        }
        if gaps.colors {
            out.data.colors_map = backend.colors_map(sheet, &options.colors)?;
            out.filled.colors = true;
        }
        if gaps.tables {
            out.data.table_candidates =
                backend.table_candidates(sheet, &options.table_config())?;
            out.filled.tables = true;
        }
        Ok(out)
    }
}

fn check_format(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(()),
        _ => Err(Error::UnsupportedFormat(path.display().to_string())),
    }
}

fn book_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Log a failed file-backend step and turn it into `None`.
fn step<T>(sheet: &str, what: &str, result: BackendResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{what} of sheet {sheet:?} unavailable from file: {e}");
            None
        }
    }
}

fn merge(data: &mut SheetData, gaps: &Gaps, auto: AutomationSheet) {
    let AutomationSheet {
        data: from_automation,
        filled,
    } = auto;
    data.shapes = from_automation.shapes;
    data.charts = from_automation.charts;
    data.auto_print_areas = from_automation.auto_print_areas;
    if gaps.cells && filled.cells {
        data.rows = from_automation.rows;
        data.metrics = from_automation.metrics;
    }
    if gaps.print_areas && filled.print_areas {
        data.print_areas = from_automation.print_areas;
    }
    if gaps.colors && filled.colors {
        data.colors_map = from_automation.colors_map;
    }
    if gaps.tables && filled.tables {
        data.table_candidates = from_automation.table_candidates;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_by_mode() {
        let mut options = ExtractionOptions::new(ExtractionMode::Light);
        assert_eq!(
            AutomationRequirement::for_options(&options),
            AutomationRequirement::Unused
        );
        options.include_auto_page_breaks = true;
        assert_eq!(
            AutomationRequirement::for_options(&options),
            AutomationRequirement::Optional
        );
        for mode in [ExtractionMode::Standard, ExtractionMode::Verbose] {
            assert_eq!(
                AutomationRequirement::for_options(&ExtractionOptions::new(mode)),
                AutomationRequirement::Required
            );
        }
    }

    #[test]
    fn test_check_format() {
        assert!(check_format(Path::new("/tmp/Book1.XLSX")).is_ok());
        assert!(check_format(Path::new("macro.xlsm")).is_ok());
        assert!(matches!(
            check_format(Path::new("legacy.xls")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(check_format(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_merge_only_fills_failed_steps() {
        let mut data = SheetData {
            table_candidates: vec!["A1:B3".into()],
            ..SheetData::default()
        };
        let gaps = Gaps {
            print_areas: true,
            ..Gaps::default()
        };
        let mut auto = AutomationSheet::default();
        auto.data.print_areas = vec![exstruct_core::PrintArea { r1: 1, c1: 0, r2: 5, c2: 2 }];
        auto.data.table_candidates = vec!["Z1:Z9".into()];
        auto.filled.print_areas = true;

        merge(&mut data, &gaps, auto);
        assert_eq!(data.print_areas.len(), 1);
        assert_eq!(data.table_candidates, vec!["A1:B3".to_string()]);
    }

    #[test]
    fn test_fallback_reason_serializes_snake_case() {
        let json = serde_json::to_string(&FallbackReason::AutomationUnavailable).unwrap();
        assert_eq!(json, "\"automation_unavailable\"");
    }
}
