//! High-level entry point.
//!
//! ```rust,no_run
//! use exstruct::{Extractor, ExtractionMode, ExtractionOptions, NoAutomation};
//!
//! let extractor = Extractor::new(ExtractionOptions::new(ExtractionMode::Light))
//!     .with_connector(NoAutomation);
//! let extraction = extractor.extract("book.xlsx").unwrap();
//! let workbook = extractor.filter(&extraction.workbook);
//! for view in extractor.print_area_views(&workbook) {
//!     println!("{} {:?}: {} rows", view.sheet_name, view.area, view.rows.len());
//! }
//! ```

use std::path::Path;

use exstruct_core::{Chart, WorkbookData};

use crate::backend::{AutomationConnector, ExcelComConnector};
use crate::error::Result;
use crate::options::{ExtractionMode, ExtractionOptions};
use crate::pipeline::{run_pipeline, Extraction};
use crate::view::{print_area_views, PrintAreaView, ViewOptions};

/// What to keep in the output. `None` fields follow the mode.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFilter {
    pub include_rows: bool,
    pub include_shapes: bool,
    pub include_charts: bool,
    pub include_tables: bool,
    /// Default: on except in `light`.
    pub include_print_areas: Option<bool>,
    /// Default: on in `verbose` only.
    pub include_shape_size: Option<bool>,
    /// Default: on in `verbose` only.
    pub include_chart_size: Option<bool>,
    /// Re-base print-area views to their top-left corner.
    pub normalize_views: bool,
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self {
            include_rows: true,
            include_shapes: true,
            include_charts: true,
            include_tables: true,
            include_print_areas: None,
            include_shape_size: None,
            include_chart_size: None,
            normalize_views: false,
        }
    }
}

/// Extraction options, output filter and automation connector in one place.
pub struct Extractor {
    options: ExtractionOptions,
    filter: OutputFilter,
    connector: Box<dyn AutomationConnector>,
}

impl Extractor {
    /// An extractor that automates Excel through the COM bridge, configured
    /// from the environment.
    pub fn new(options: ExtractionOptions) -> Self {
        Self {
            options,
            filter: OutputFilter::default(),
            connector: Box::new(ExcelComConnector::from_env()),
        }
    }

    pub fn with_connector(mut self, connector: impl AutomationConnector + 'static) -> Self {
        self.connector = Box::new(connector);
        self
    }

    pub fn with_filter(mut self, filter: OutputFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    pub fn output_filter(&self) -> &OutputFilter {
        &self.filter
    }

    /// Run the pipeline. The result is unfiltered.
    pub fn extract(&self, path: impl AsRef<Path>) -> Result<Extraction> {
        run_pipeline(path.as_ref(), &self.options, self.connector.as_ref())
    }

    /// Copy of `workbook` with the output filter applied.
    pub fn filter(&self, workbook: &WorkbookData) -> WorkbookData {
        let mode = self.options.mode;
        let f = &self.filter;
        let print_areas = f.include_print_areas.unwrap_or(mode != ExtractionMode::Light);
        let shape_size = f.include_shape_size.unwrap_or(mode == ExtractionMode::Verbose);
        let chart_size = f.include_chart_size.unwrap_or(mode == ExtractionMode::Verbose);

        let mut out = workbook.clone();
        for (_, sheet) in out.sheets.iter_mut() {
            if !f.include_rows {
                sheet.rows.clear();
            }
            if !f.include_shapes {
                sheet.shapes.clear();
            } else if !shape_size {
                sheet.shapes = sheet.shapes.iter().map(|g| g.without_size()).collect();
            }
            if !f.include_charts {
                sheet.charts.clear();
            } else if !chart_size {
                sheet.charts.iter_mut().for_each(strip_chart_size);
            }
            if !f.include_tables {
                sheet.table_candidates.clear();
            }
            if !print_areas {
                sheet.print_areas.clear();
            }
        }
        out
    }

    /// Views of every print area (and page-break area when enabled).
    pub fn print_area_views<'a>(&self, workbook: &'a WorkbookData) -> Vec<PrintAreaView<'a>> {
        print_area_views(
            workbook,
            ViewOptions {
                normalize: self.filter.normalize_views,
                include_auto_page_breaks: self.options.include_auto_page_breaks,
            },
        )
    }
}

fn strip_chart_size(chart: &mut Chart) {
    chart.w = None;
    chart.h = None;
}

/// Extract `path` in `mode` with default options, automating Excel when
/// the bridge is available.
pub fn extract(path: impl AsRef<Path>, mode: ExtractionMode) -> Result<Extraction> {
    Extractor::new(ExtractionOptions::new(mode)).extract(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NoAutomation;
    use exstruct_core::{Graphic, PrintArea, SheetData, Shape, ShapeBase};

    fn workbook() -> WorkbookData {
        let sheet = SheetData {
            shapes: vec![Graphic::Shape(Shape {
                base: ShapeBase {
                    text: "Box".into(),
                    w: Some(10),
                    h: Some(20),
                    ..Default::default()
                },
            })],
            charts: vec![Chart {
                name: "Chart 1".into(),
                w: Some(300),
                h: Some(200),
                ..Chart::default()
            }],
            table_candidates: vec!["A1:B3".into()],
            print_areas: vec![PrintArea { r1: 1, c1: 0, r2: 3, c2: 1 }],
            ..SheetData::default()
        };
        let mut workbook = WorkbookData::default();
        workbook.sheets.insert("Sheet1", sheet);
        workbook
    }

    fn extractor(mode: ExtractionMode) -> Extractor {
        Extractor::new(ExtractionOptions::new(mode)).with_connector(NoAutomation)
    }

    #[test]
    fn test_sizes_dropped_outside_verbose() {
        let filtered = extractor(ExtractionMode::Standard).filter(&workbook());
        let sheet = filtered.sheets.get("Sheet1").unwrap();
        assert_eq!(sheet.shapes[0].base().w, None);
        assert_eq!(sheet.charts[0].h, None);
        assert_eq!(sheet.print_areas.len(), 1);

        let verbose = extractor(ExtractionMode::Verbose).filter(&workbook());
        let sheet = verbose.sheets.get("Sheet1").unwrap();
        assert_eq!(sheet.shapes[0].base().w, Some(10));
        assert_eq!(sheet.charts[0].h, Some(200));
    }

    #[test]
    fn test_print_areas_dropped_in_light_by_default() {
        let light = extractor(ExtractionMode::Light);
        assert!(light.filter(&workbook()).sheets.get("Sheet1").unwrap().print_areas.is_empty());

        let keep = extractor(ExtractionMode::Light).with_filter(OutputFilter {
            include_print_areas: Some(true),
            ..OutputFilter::default()
        });
        let filtered = keep.filter(&workbook());
        assert_eq!(filtered.sheets.get("Sheet1").unwrap().print_areas.len(), 1);
        assert_eq!(keep.print_area_views(&filtered).len(), 1);
    }

    #[test]
    fn test_exclusions() {
        let extractor = extractor(ExtractionMode::Verbose).with_filter(OutputFilter {
            include_shapes: false,
            include_charts: false,
            include_tables: false,
            ..OutputFilter::default()
        });
        let filtered = extractor.filter(&workbook());
        let sheet = filtered.sheets.get("Sheet1").unwrap();
        assert!(sheet.shapes.is_empty());
        assert!(sheet.charts.is_empty());
        assert!(sheet.table_candidates.is_empty());
        assert_eq!(sheet.print_areas.len(), 1);
    }
}
