//! Shared fixtures: a small workbook on disk and scripted automation.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use exstruct::{
    AutomationBackend, AutomationConnector, Backend, BackendError, BackendResult, CellRow,
    ColorsMap, ColorsOptions, PageBreakLayout, PrintArea, RawChart, RawShape,
    TableDetectionConfig,
};
use exstruct_core::SheetMetrics;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
</Types>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Sales" sheetId="1" r:id="rId1"/>
    <sheet name="Flow" sheetId="2" r:id="rId2"/>
  </sheets>
  <definedNames>
    <definedName name="_xlnm.Print_Area" localSheetId="0">Sales!$A$1:$B$2</definedName>
  </definedNames>
</workbook>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

// xf 1: yellow fill with borders, xf 2: borders only
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border>
  </borders>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="0" fillId="2" borderId="1"/>
    <xf numFmtId="0" fontId="0" fillId="0" borderId="1"/>
  </cellXfs>
</styleSheet>"#;

const SALES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1">
      <c r="A1" s="1" t="inlineStr"><is><t>Item</t></is></c>
      <c r="B1" s="1" t="inlineStr"><is><t>Qty</t></is></c>
    </row>
    <row r="2">
      <c r="A2" s="2" t="inlineStr"><is><t>apple</t></is></c>
      <c r="B2" s="2"><v>3</v></c>
    </row>
    <row r="3">
      <c r="A3" s="2" t="inlineStr"><is><t>pear</t></is></c>
      <c r="B3" s="2"><v>5</v></c>
    </row>
    <row r="6">
      <c r="A6" t="inlineStr"><is><t>checked by finance</t></is></c>
    </row>
  </sheetData>
</worksheet>"#;

// The cell reference `1A` cannot be parsed.
const FLOW_CORRUPT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="1A" t="inlineStr"><is><t>Process overview</t></is></c></row>
  </sheetData>
</worksheet>"#;

const FLOW: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="inlineStr"><is><t>Process overview</t></is></c></row>
  </sheetData>
</worksheet>"#;

/// A two-sheet workbook in a temporary directory.
pub struct Fixture {
    _dir: tempfile::TempDir,
    pub path: PathBuf,
}

/// `Sales` holds a bordered 3x2 table at A1:B3, a loose note in A6 and the
/// print area A1:B2. `Flow` holds one title cell.
pub fn sales_workbook() -> Fixture {
    fixture(FLOW)
}

/// Like [`sales_workbook`], but the `Flow` worksheet part is unreadable.
pub fn corrupt_flow_workbook() -> Fixture {
    fixture(FLOW_CORRUPT)
}

fn fixture(flow: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.xlsx");
    write_package(&path, flow);
    Fixture { _dir: dir, path }
}

fn write_package(path: &Path, flow: &str) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", RELS),
        ("xl/styles.xml", STYLES),
        ("xl/worksheets/sheet1.xml", SALES),
        ("xl/worksheets/sheet2.xml", flow),
    ];
    for (name, body) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// What a scripted automation session saw.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub connects: Rc<Cell<usize>>,
    pub closed: Rc<Cell<bool>>,
    pub calls: Rc<RefCell<Vec<String>>>,
}

impl SessionLog {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

/// A connector that always fails to connect.
#[derive(Debug, Default)]
pub struct UnavailableConnector {
    pub seen: SessionLog,
}

impl AutomationConnector for UnavailableConnector {
    fn connect(&self, _path: &Path) -> BackendResult<Box<dyn AutomationBackend>> {
        self.seen.connects.set(self.seen.connects.get() + 1);
        Err(BackendError::AutomationUnavailable(
            "Excel is not installed".into(),
        ))
    }
}

/// A connector whose sessions answer from fixed data.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConnector {
    pub shapes: Vec<RawShape>,
    pub charts: Vec<RawChart>,
    pub page_breaks: PageBreakLayout,
    /// Answer to `cells` on every sheet.
    pub rows: Vec<CellRow>,
    /// Answer to `table_candidates` on every sheet.
    pub table_candidates: Vec<String>,
    /// Operation that fails on the `Flow` sheet, e.g. `"charts"`.
    pub fail_on: Option<&'static str>,
    pub seen: SessionLog,
}

impl AutomationConnector for ScriptedConnector {
    fn connect(&self, _path: &Path) -> BackendResult<Box<dyn AutomationBackend>> {
        self.seen.connects.set(self.seen.connects.get() + 1);
        Ok(Box::new(ScriptedSession {
            script: self.clone(),
        }))
    }
}

struct ScriptedSession {
    script: ScriptedConnector,
}

impl ScriptedSession {
    fn record(&self, operation: &'static str, sheet: &str) -> BackendResult<()> {
        self.script
            .seen
            .calls
            .borrow_mut()
            .push(format!("{operation}:{sheet}"));
        if self.script.fail_on == Some(operation) && sheet == "Flow" {
            return Err(BackendError::AutomationCall {
                operation,
                message: "RPC server is unavailable".into(),
            });
        }
        Ok(())
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.script.seen.closed.set(true);
    }
}

impl Backend for ScriptedSession {
    fn sheet_names(&self) -> BackendResult<Vec<String>> {
        Ok(vec!["Sales".into(), "Flow".into()])
    }

    fn cells(&self, sheet: &str, _include_links: bool) -> BackendResult<Vec<CellRow>> {
        self.record("cells", sheet)?;
        Ok(self.script.rows.clone())
    }

    fn print_areas(&self, sheet: &str) -> BackendResult<Vec<PrintArea>> {
        self.record("print_areas", sheet)?;
        Ok(Vec::new())
    }

    fn colors_map(&self, sheet: &str, _options: &ColorsOptions) -> BackendResult<ColorsMap> {
        self.record("colors_map", sheet)?;
        Ok(ColorsMap::new())
    }

    fn table_candidates(
        &self,
        sheet: &str,
        _config: &TableDetectionConfig,
    ) -> BackendResult<Vec<String>> {
        self.record("table_candidates", sheet)?;
        Ok(self.script.table_candidates.clone())
    }

    fn metrics(&self, sheet: &str) -> BackendResult<SheetMetrics> {
        self.record("metrics", sheet)?;
        Ok(SheetMetrics::default())
    }
}

impl AutomationBackend for ScriptedSession {
    fn graphics(&self, sheet: &str) -> BackendResult<Vec<RawShape>> {
        self.record("graphics", sheet)?;
        Ok(self.script.shapes.clone())
    }

    fn charts(&self, sheet: &str) -> BackendResult<Vec<RawChart>> {
        self.record("charts", sheet)?;
        Ok(self.script.charts.clone())
    }

    fn auto_page_breaks(&self, sheet: &str) -> BackendResult<PageBreakLayout> {
        self.record("auto_page_breaks", sheet)?;
        Ok(self.script.page_breaks.clone())
    }
}
