//! Sheet and workbook aggregates

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cell::CellRow;
use crate::chart::Chart;
use crate::print_area::PrintArea;
use crate::shape::Graphic;

/// Fill color (`RRGGBB`) to the cells painted with it, as `(row, col)` with
/// 1-based rows and 0-based columns.
pub type ColorsMap = BTreeMap<String, Vec<(u32, u32)>>;

/// Row heights and column widths in points.
///
/// Used to project a cell rectangle into the coordinate space of shapes
/// and charts. Rows are keyed 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetMetrics {
    pub default_row_height: f64,
    pub default_col_width: f64,
    pub row_heights: BTreeMap<u32, f64>,
    pub col_widths: BTreeMap<u32, f64>,
}

impl Default for SheetMetrics {
    fn default() -> Self {
        Self {
            default_row_height: 15.0,
            default_col_width: 48.0,
            row_heights: BTreeMap::new(),
            col_widths: BTreeMap::new(),
        }
    }
}

impl SheetMetrics {
    /// Distance from the sheet top to the top edge of 1-based row `r`.
    pub fn row_top(&self, r: u32) -> f64 {
        let preceding = r.saturating_sub(1);
        let adjust: f64 = self
            .row_heights
            .range(..r.max(1))
            .map(|(_, h)| h - self.default_row_height)
            .sum();
        preceding as f64 * self.default_row_height + adjust
    }

    /// Distance from the sheet left edge to the left edge of 0-based column `c`.
    pub fn col_left(&self, c: u32) -> f64 {
        let adjust: f64 = self
            .col_widths
            .range(..c)
            .map(|(_, w)| w - self.default_col_width)
            .sum();
        c as f64 * self.default_col_width + adjust
    }

    /// `(left, top, right, bottom)` of a print area.
    pub fn area_rect(&self, area: &PrintArea) -> (f64, f64, f64, f64) {
        (
            self.col_left(area.c1),
            self.row_top(area.r1),
            self.col_left(area.c2 + 1),
            self.row_top(area.r2 + 1),
        )
    }
}

/// Everything extracted from one sheet. Every collection is always present,
/// possibly empty.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SheetData {
    pub rows: Vec<CellRow>,
    pub shapes: Vec<Graphic>,
    pub charts: Vec<Chart>,
    pub table_candidates: Vec<String>,
    pub print_areas: Vec<PrintArea>,
    pub auto_print_areas: Vec<PrintArea>,
    pub colors_map: ColorsMap,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub metrics: SheetMetrics,
}

/// Sheets in workbook order, serialized as a name-keyed map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheets(Vec<(String, SheetData)>);

impl Sheets {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a sheet, replacing an existing one with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, data: SheetData) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = data,
            None => self.0.push((name, data)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SheetData> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SheetData> {
        self.0.iter_mut().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SheetData)> {
        self.0.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut SheetData)> {
        self.0.iter_mut().map(|(n, d)| (n.as_str(), d))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, SheetData)> for Sheets {
    fn from_iter<I: IntoIterator<Item = (String, SheetData)>>(iter: I) -> Self {
        let mut sheets = Sheets::new();
        for (name, data) in iter {
            sheets.insert(name, data);
        }
        sheets
    }
}

#[cfg(feature = "serde")]
impl Serialize for Sheets {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, data) in &self.0 {
            map.serialize_entry(name, data)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Sheets {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SheetsVisitor;

        impl<'de> serde::de::Visitor<'de> for SheetsVisitor {
            type Value = Sheets;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of sheet name to sheet data")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> Result<Sheets, A::Error> {
                let mut sheets = Sheets::new();
                while let Some((name, data)) = access.next_entry::<String, SheetData>()? {
                    sheets.insert(name, data);
                }
                Ok(sheets)
            }
        }

        deserializer.deserialize_map(SheetsVisitor)
    }
}

/// The extraction result for a whole workbook.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorkbookData {
    pub book_name: String,
    pub sheets: Sheets,
}
