//! Worksheet part parsing

use std::io::{BufReader, Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use exstruct_core::{parse_range, CellAddress, CellValue, SheetGrid};

use super::{read_relationships, rels_path_for, resolve_target};
use crate::error::{XlsxError, XlsxResult};
use crate::numfmt::serial_to_iso;
use crate::styles::{attr_value, ParsedStyles};

/// Decode Excel's `_xHHHH_` escape sequences
///
/// Excel encodes control characters in string content as `_xHHHH_` where
/// HHHH is the Unicode code point in hex, e.g. `_x000d_` for a carriage
/// return. Malformed sequences are kept verbatim.
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' || chars.peek() != Some(&'x') {
            result.push(c);
            continue;
        }
        chars.next();

        let mut hex = String::with_capacity(4);
        while hex.len() < 4 {
            match chars.peek() {
                Some(&h) if h.is_ascii_hexdigit() => {
                    hex.push(h);
                    chars.next();
                }
                _ => break,
            }
        }

        let decoded = if hex.len() == 4 && chars.peek() == Some(&'_') {
            u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
        } else {
            None
        };

        match decoded {
            Some(ch) => {
                chars.next();
                result.push(ch);
            }
            None => {
                result.push_str("_x");
                result.push_str(&hex);
            }
        }
    }

    result
}

/// Column width in characters to points, through Excel's pixel rounding
/// for the default 7px digit width.
pub(crate) fn char_width_to_points(width: f64) -> f64 {
    let px = (((256.0 * width + 18.0) / 256.0) * 7.0).trunc();
    px * 0.75
}

fn is_truthy(value: Option<String>) -> bool {
    value.map_or(false, |v| v == "1" || v == "true")
}

#[derive(Debug, Default)]
struct PendingCell {
    reference: String,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    inline: String,
}

impl PendingCell {
    fn from_element(e: &BytesStart<'_>) -> Option<Self> {
        Some(Self {
            reference: attr_value(e, b"r")?,
            cell_type: attr_value(e, b"t"),
            style: attr_value(e, b"s").and_then(|s| s.parse().ok()),
            ..Self::default()
        })
    }
}

#[derive(Debug)]
struct PendingHyperlink {
    reference: String,
    r_id: Option<String>,
    location: Option<String>,
}

/// Parse one worksheet part into a grid.
pub(crate) fn read_worksheet<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &str,
    shared_strings: &[String],
    styles: &ParsedStyles,
    date1904: bool,
) -> XlsxResult<SheetGrid> {
    let mut grid = SheetGrid::new();
    let mut hyperlinks: Vec<PendingHyperlink> = Vec::new();
    let mut table_ids: Vec<String> = Vec::new();

    {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;

        loop {
            let event = xml_reader.read_event_into(&mut buf);
            let is_empty = matches!(event, Ok(Event::Empty(_)));
            match event {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"sheetFormatPr" => {
                        if let Some(h) = attr_value(&e, b"defaultRowHeight").and_then(|s| s.parse().ok()) {
                            grid.metrics.default_row_height = h;
                        }
                        if let Some(w) = attr_value(&e, b"defaultColWidth").and_then(|s| s.parse().ok()) {
                            grid.metrics.default_col_width = char_width_to_points(w);
                        }
                    }
                    b"col" => read_col(&e, &mut grid),
                    b"row" => read_row(&e, &mut grid),
                    b"c" => {
                        let pending = PendingCell::from_element(&e);
                        if is_empty {
                            if let Some(pending) = pending {
                                finish_cell(&mut grid, pending, shared_strings, styles, date1904)?;
                            }
                        } else {
                            cell = pending;
                        }
                    }
                    b"v" if cell.is_some() => in_value = !is_empty,
                    b"is" if cell.is_some() => in_inline_str = !is_empty,
                    b"t" if in_inline_str => in_inline_text = !is_empty,
                    b"hyperlink" => {
                        if let Some(reference) = attr_value(&e, b"ref") {
                            hyperlinks.push(PendingHyperlink {
                                reference,
                                r_id: attr_value(&e, b"r:id"),
                                location: attr_value(&e, b"location"),
                            });
                        }
                    }
                    b"tablePart" => {
                        if let Some(r_id) = attr_value(&e, b"r:id") {
                            table_ids.push(r_id);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) if in_value || in_inline_text => {
                    if let (Some(pending), Ok(text)) = (cell.as_mut(), e.unescape()) {
                        if in_value {
                            pending.value.get_or_insert_with(String::new).push_str(&text);
                        } else {
                            pending.inline.push_str(&text);
                        }
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            finish_cell(&mut grid, pending, shared_strings, styles, date1904)?;
                        }
                        in_value = false;
                        in_inline_str = false;
                        in_inline_text = false;
                    }
                    b"v" => in_value = false,
                    b"is" => in_inline_str = false,
                    b"t" => in_inline_text = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }
    }

    if hyperlinks.is_empty() && table_ids.is_empty() {
        return Ok(grid);
    }

    let rels = read_relationships(archive, &rels_path_for(path))?.unwrap_or_default();

    for link in hyperlinks {
        let Some(bounds) = parse_range(&link.reference) else {
            log::debug!("unreadable hyperlink ref '{}'", link.reference);
            continue;
        };
        let target = match (&link.r_id, &link.location) {
            (Some(r_id), location) => rels.get(r_id).map(|rel| match location {
                Some(loc) if !loc.is_empty() => format!("{}#{}", rel.target, loc),
                _ => rel.target.clone(),
            }),
            (None, Some(location)) => Some(format!("#{location}")),
            (None, None) => None,
        };
        if let Some(target) = target {
            grid.links.insert((bounds.r1, bounds.c1), target);
        }
    }

    for r_id in table_ids {
        let Some(rel) = rels.get(&r_id) else {
            log::debug!("table part {r_id} has no relationship");
            continue;
        };
        if rel.external {
            continue;
        }
        let table_path = resolve_target(path, &rel.target);
        match read_table_ref(archive, &table_path)? {
            Some(reference) => grid.declared_tables.push(reference),
            None => log::debug!("table part {table_path} has no ref"),
        }
    }

    Ok(grid)
}

fn read_col(e: &BytesStart<'_>, grid: &mut SheetGrid) {
    let min: Option<u32> = attr_value(e, b"min").and_then(|s| s.parse().ok());
    let max: Option<u32> = attr_value(e, b"max").and_then(|s| s.parse().ok());
    let width: Option<f64> = attr_value(e, b"width").and_then(|s| s.parse().ok());
    let hidden = is_truthy(attr_value(e, b"hidden"));

    let (Some(min), Some(max)) = (min, max) else {
        return;
    };
    let points = if hidden {
        Some(0.0)
    } else {
        width.map(char_width_to_points)
    };
    let Some(points) = points else {
        return;
    };
    // min/max are 1-based; a trailing <col> often spans to the last column.
    for col in min.max(1)..=max.min(exstruct_core::MAX_COLS) {
        grid.metrics.col_widths.insert(col - 1, points);
    }
}

fn read_row(e: &BytesStart<'_>, grid: &mut SheetGrid) {
    let Some(row) = attr_value(e, b"r").and_then(|s| s.parse::<u32>().ok()) else {
        return;
    };
    if is_truthy(attr_value(e, b"hidden")) {
        grid.metrics.row_heights.insert(row, 0.0);
    } else if let Some(ht) = attr_value(e, b"ht").and_then(|s| s.parse::<f64>().ok()) {
        grid.metrics.row_heights.insert(row, ht);
    }
}

fn finish_cell(
    grid: &mut SheetGrid,
    cell: PendingCell,
    shared_strings: &[String],
    styles: &ParsedStyles,
    date1904: bool,
) -> XlsxResult<()> {
    let addr = CellAddress::parse(&cell.reference).map_err(|e| {
        XlsxError::Parse(format!("Invalid cell reference '{}': {}", cell.reference, e))
    })?;
    let xf = cell.style.and_then(|s| styles.xf(s));

    if let Some(xf) = xf {
        if let Some(fill) = &xf.fill {
            grid.fills.insert((addr.row, addr.col), fill.clone());
        }
        if xf.has_border {
            grid.borders.insert((addr.row, addr.col));
        }
    }

    let is_date = xf.map_or(false, |xf| xf.is_date);
    let value = match (cell.cell_type.as_deref(), cell.value.as_deref()) {
        (Some("inlineStr"), _) => Some(CellValue::Text(decode_excel_escapes(&cell.inline))),
        (_, None) => None,
        (Some("s"), Some(v)) => {
            let idx: usize = v
                .trim()
                .parse()
                .map_err(|_| XlsxError::Parse(format!("Invalid shared string index: {}", v)))?;
            let s = shared_strings.get(idx).ok_or_else(|| {
                XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
            })?;
            Some(CellValue::Text(s.clone()))
        }
        (Some("b"), Some(v)) => Some(CellValue::Bool(v == "1" || v.eq_ignore_ascii_case("true"))),
        (Some("str"), Some(v)) => Some(CellValue::Text(decode_excel_escapes(v))),
        (Some("e") | Some("d"), Some(v)) => Some(CellValue::Text(v.to_string())),
        (None | Some("n"), Some(v)) => Some(match v.trim().parse::<f64>() {
            Ok(n) if is_date => serial_to_iso(n, date1904)
                .map(CellValue::Text)
                .unwrap_or_else(|| CellValue::number(n)),
            Ok(n) => CellValue::number(n),
            Err(_) => CellValue::Text(v.to_string()),
        }),
        (Some(_), Some(v)) => Some(CellValue::Text(v.to_string())),
    };

    match value {
        Some(value) => grid.set_value(addr.row, addr.col, value),
        None => {
            grid.styled.insert((addr.row, addr.col));
        }
    }
    Ok(())
}

/// The `ref` attribute of a table part's root element.
fn read_table_ref<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &str,
) -> XlsxResult<Option<String>> {
    let file = match archive.by_name(path) {
        Ok(f) => f,
        Err(_) => {
            log::warn!("table part {path} is missing");
            return Ok(None);
        }
    };

    let mut xml_reader = Reader::from_reader(BufReader::new(file));
    xml_reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"table" => {
                return Ok(attr_value(&e, b"ref"));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }
}
