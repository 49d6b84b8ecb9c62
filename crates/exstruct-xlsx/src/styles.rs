//! Cell format table (styles.xml), reduced to what extraction needs

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::numfmt::is_date_format;

/// What one `cellXfs` entry means for extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct XfInfo {
    pub is_date: bool,
    /// Solid background color as uppercase `RRGGBB`.
    pub fill: Option<String>,
    pub has_border: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedStyles {
    pub xfs: Vec<XfInfo>,
}

impl ParsedStyles {
    pub fn xf(&self, idx: u32) -> Option<&XfInfo> {
        self.xfs.get(idx as usize)
    }
}

#[derive(Debug, Default)]
struct FillDef {
    pattern: Option<String>,
    fg_rgb: Option<String>,
}

impl FillDef {
    fn color(&self) -> Option<String> {
        match self.pattern.as_deref() {
            None | Some("none") | Some("gray125") => None,
            Some(_) => self.fg_rgb.clone(),
        }
    }
}

/// Normalize `FFRRGGBB` / `RRGGBB` / `#RRGGBB` to uppercase `RRGGBB`.
pub(crate) fn normalize_rgb(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    let hex = match hex.len() {
        8 => &hex[2..],
        6 => hex,
        _ => return None,
    };
    hex.bytes()
        .all(|b| b.is_ascii_hexdigit())
        .then(|| hex.to_ascii_uppercase())
}

pub(crate) fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

fn attr_u32(e: &BytesStart<'_>, key: &[u8]) -> u32 {
    attr_value(e, key).and_then(|s| s.parse().ok()).unwrap_or(0)
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<ParsedStyles> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();

    let mut numfmts: HashMap<u32, String> = HashMap::new();
    let mut fills: Vec<FillDef> = Vec::new();
    let mut borders: Vec<bool> = Vec::new();
    let mut xfs: Vec<XfInfo> = Vec::new();
    let mut raw_xfs: Vec<(u32, u32, u32)> = Vec::new();

    let mut in_fills = false;
    let mut in_borders = false;
    let mut in_cell_xfs = false;
    let mut in_dxfs = false;
    let mut in_border = false;

    loop {
        let event = xml_reader.read_event_into(&mut buf);
        let is_empty = matches!(event, Ok(Event::Empty(_)));
        match event {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" if !in_dxfs => {
                    let id = attr_u32(&e, b"numFmtId");
                    if let Some(code) = attr_value(&e, b"formatCode") {
                        numfmts.insert(id, code);
                    }
                }
                b"fills" => in_fills = !is_empty,
                b"borders" => in_borders = !is_empty,
                b"cellXfs" => in_cell_xfs = !is_empty,
                b"dxfs" => in_dxfs = !is_empty,
                b"fill" if in_fills && !in_dxfs => fills.push(FillDef::default()),
                b"patternFill" if in_fills && !in_dxfs => {
                    if let Some(fill) = fills.last_mut() {
                        fill.pattern = attr_value(&e, b"patternType");
                    }
                }
                b"fgColor" if in_fills && !in_dxfs => {
                    if let Some(fill) = fills.last_mut() {
                        fill.fg_rgb = attr_value(&e, b"rgb").and_then(|v| normalize_rgb(&v));
                        if fill.fg_rgb.is_none() {
                            log::debug!("ignoring non-rgb fill color (theme/indexed)");
                        }
                    }
                }
                b"border" if in_borders && !in_dxfs => {
                    borders.push(false);
                    in_border = !is_empty;
                }
                b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end" if in_border => {
                    let styled = attr_value(&e, b"style").map_or(false, |s| s != "none");
                    if styled {
                        if let Some(last) = borders.last_mut() {
                            *last = true;
                        }
                    }
                }
                b"xf" if in_cell_xfs => {
                    raw_xfs.push((
                        attr_u32(&e, b"numFmtId"),
                        attr_u32(&e, b"fillId"),
                        attr_u32(&e, b"borderId"),
                    ));
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"fills" => in_fills = false,
                b"borders" => in_borders = false,
                b"border" => in_border = false,
                b"cellXfs" => in_cell_xfs = false,
                b"dxfs" => in_dxfs = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    for (num_fmt_id, fill_id, border_id) in raw_xfs {
        xfs.push(XfInfo {
            is_date: is_date_format(num_fmt_id, numfmts.get(&num_fmt_id).map(String::as_str)),
            fill: fills.get(fill_id as usize).and_then(FillDef::color),
            has_border: borders.get(border_id as usize).copied().unwrap_or(false),
        });
    }

    Ok(ParsedStyles { xfs })
}
