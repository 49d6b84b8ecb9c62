//! XLSX reader

mod worksheet;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use exstruct_core::SheetGrid;

use crate::error::{SheetUnreadable, XlsxError, XlsxResult};
use crate::styles::{read_styles_xml, ParsedStyles};

pub(crate) use worksheet::decode_excel_escapes;

/// A `_xlnm.Print_Area` defined name.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedPrintArea {
    /// Index of the sheet the name is scoped to (`localSheetId`), if any.
    pub local_sheet: Option<usize>,
    /// The raw formula, e.g. `Sheet1!$A$1:$B$2,Sheet1!$D$1:$E$5`.
    pub formula: String,
}

/// One worksheet of the package.
#[derive(Debug, Clone)]
pub struct XlsxSheet {
    pub name: String,
    /// The parsed part, or why it could not be parsed.
    pub grid: Result<SheetGrid, SheetUnreadable>,
}

/// The parts of a workbook that extraction uses.
#[derive(Debug, Clone, Default)]
pub struct XlsxWorkbook {
    pub sheets: Vec<XlsxSheet>,
    pub print_areas: Vec<DefinedPrintArea>,
    /// Whether serial dates count from 1904.
    pub date1904: bool,
}

impl XlsxWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&XlsxSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// A relationship target from a `.rels` part.
#[derive(Debug, Clone)]
pub(crate) struct Relationship {
    pub target: String,
    pub rel_type: String,
    pub external: bool,
}

/// Workbook-level facts from `xl/workbook.xml`.
#[derive(Debug, Default)]
struct WorkbookInfo {
    sheets: Vec<(String, String)>,
    print_areas: Vec<DefinedPrintArea>,
    date1904: bool,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<XlsxWorkbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<XlsxWorkbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let styles = Self::read_styles(&mut archive)?;
        let info = Self::read_workbook_xml(&mut archive)?;
        let rels = read_relationships(&mut archive, "xl/_rels/workbook.xml.rels")?
            .ok_or_else(|| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut sheets = Vec::with_capacity(info.sheets.len());
        for (name, r_id) in &info.sheets {
            let Some(rel) = rels.get(r_id) else {
                log::warn!("sheet '{name}' has no relationship {r_id}; skipped");
                continue;
            };
            if !rel.rel_type.ends_with("/worksheet") {
                log::debug!("sheet '{name}' is not a worksheet ({}); skipped", rel.rel_type);
                continue;
            }
            let path = resolve_target("xl/workbook.xml", &rel.target);
            let grid = worksheet::read_worksheet(
                &mut archive,
                &path,
                &shared_strings,
                &styles,
                info.date1904,
            )
            .map_err(|e| {
                log::warn!("sheet '{name}' ({path}) unreadable: {e}");
                SheetUnreadable {
                    part: path.clone(),
                    message: e.to_string(),
                }
            });
            sheets.push(XlsxSheet {
                name: name.clone(),
                grid,
            });
        }

        log::debug!("read {} worksheet(s)", sheets.len());

        Ok(XlsxWorkbook {
            sheets,
            print_areas: info.print_areas,
            date1904: info.date1904,
        })
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs (<rPh>) repeat text in another script.
        let mut in_rph = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_rph = true,
                    b"t" if in_si && !in_rph => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => {
                    strings.push(String::new());
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        current.clear();
                        in_si = false;
                    }
                    b"rPh" => in_rph = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<ParsedStyles> {
        match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file),
            Err(_) => Ok(ParsedStyles::default()),
        }
    }

    /// Read sheet names, print-area defined names and the date system.
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<WorkbookInfo> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut info = WorkbookInfo::default();
        let mut pending_name: Option<(String, Option<usize>)> = None;
        let mut name_text = String::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let mut name = None;
                    let mut r_id = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => name = attr.unescape_value().ok().map(|s| s.to_string()),
                            b"r:id" => r_id = attr.unescape_value().ok().map(|s| s.to_string()),
                            _ => {}
                        }
                    }
                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        info.sheets.push((name, r_id));
                    }
                }
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"workbookPr" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"date1904" {
                            info.date1904 = attr
                                .unescape_value()
                                .map_or(false, |v| v.as_ref() == "1" || v.as_ref() == "true");
                        }
                    }
                }
                Ok(Event::Start(e)) if e.name().as_ref() == b"definedName" => {
                    let mut name = String::new();
                    let mut local_sheet = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = attr.unescape_value().map(|s| s.to_string()).unwrap_or_default()
                            }
                            b"localSheetId" => {
                                local_sheet = attr
                                    .unescape_value()
                                    .ok()
                                    .and_then(|s| s.parse::<usize>().ok())
                            }
                            _ => {}
                        }
                    }
                    pending_name = Some((name, local_sheet));
                    name_text.clear();
                }
                Ok(Event::Text(e)) if pending_name.is_some() => {
                    if let Ok(text) = e.unescape() {
                        name_text.push_str(&text);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"definedName" => {
                    if let Some((name, local_sheet)) = pending_name.take() {
                        if name.eq_ignore_ascii_case("_xlnm.Print_Area") {
                            info.print_areas.push(DefinedPrintArea {
                                local_sheet,
                                formula: name_text.trim().to_string(),
                            });
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(info)
    }
}

/// Read a relationships part. `Ok(None)` when the part does not exist.
pub(crate) fn read_relationships<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &str,
) -> XlsxResult<Option<HashMap<String, Relationship>>> {
    let file = match archive.by_name(path) {
        Ok(f) => f,
        Err(_) => return Ok(None),
    };

    let mut xml_reader = Reader::from_reader(BufReader::new(file));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                let mut rel_type = String::new();
                let mut external = false;

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Target" => target = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Type" => {
                            rel_type = attr.unescape_value().map(|s| s.to_string()).unwrap_or_default()
                        }
                        b"TargetMode" => {
                            external = attr
                                .unescape_value()
                                .map_or(false, |v| v.eq_ignore_ascii_case("External"))
                        }
                        _ => {}
                    }
                }

                if let (Some(id), Some(target)) = (id, target) {
                    rels.insert(
                        id,
                        Relationship {
                            target,
                            rel_type,
                            external,
                        },
                    );
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(Some(rels))
}

/// Resolve a relationship target against the part that owns it.
///
/// `resolve_target("xl/worksheets/sheet1.xml", "../tables/table1.xml")`
/// gives `xl/tables/table1.xml`; absolute targets drop the leading `/`.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for piece in target.split('/') {
        match piece {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// The `_rels` part path belonging to a package part.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}
