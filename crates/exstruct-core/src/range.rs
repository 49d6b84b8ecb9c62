//! Range strings to zero-based rectangles.
//!
//! [`parse_range`] is the only function in the workspace that turns row and
//! column text into integers. Everything downstream works with [`Bounds`] or
//! re-bases those integers; nothing re-parses A1 strings.

use std::fmt;

use crate::address::CellAddress;
use crate::{MAX_COLS, MAX_ROWS};

/// A zero-based, inclusive cell rectangle.
///
/// `r1 <= r2` and `c1 <= c2` always hold for values built through
/// [`Bounds::new`] or [`parse_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bounds {
    pub r1: u32,
    pub c1: u32,
    pub r2: u32,
    pub c2: u32,
}

impl Bounds {
    /// Create bounds, swapping corners so the first one is top-left.
    pub fn new(r1: u32, c1: u32, r2: u32, c2: u32) -> Self {
        Self {
            r1: r1.min(r2),
            c1: c1.min(c2),
            r2: r1.max(r2),
            c2: c1.max(c2),
        }
    }

    /// A one-cell rectangle.
    pub fn cell(row: u32, col: u32) -> Self {
        Self::new(row, col, row, col)
    }

    pub fn row_count(&self) -> u32 {
        self.r2 - self.r1 + 1
    }

    pub fn col_count(&self) -> u32 {
        self.c2 - self.c1 + 1
    }

    /// Number of cells covered.
    pub fn area(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.r1 && row <= self.r2 && col >= self.c1 && col <= self.c2
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.r1 <= other.r2 && self.r2 >= other.r1 && self.c1 <= other.c2 && self.c2 >= other.c1
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            r1: self.r1.min(other.r1),
            c1: self.c1.min(other.c1),
            r2: self.r2.max(other.r2),
            c2: self.c2.max(other.c2),
        }
    }

    /// Format as `A1:B2`. Single cells keep the two-corner form so the output
    /// shape does not depend on the rectangle size.
    pub fn to_a1(&self) -> String {
        format!(
            "{}:{}",
            CellAddress::new(self.r1, self.c1),
            CellAddress::new(self.r2, self.c2)
        )
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

enum Endpoint {
    Cell(CellAddress),
    Column(u32),
    Row(u32),
}

fn parse_endpoint(text: &str) -> Option<Endpoint> {
    let bare: String = text.trim().chars().filter(|&c| c != '$').collect();
    if bare.is_empty() {
        return None;
    }
    if bare.bytes().all(|b| b.is_ascii_alphabetic()) {
        return CellAddress::letters_to_column(&bare).ok().map(Endpoint::Column);
    }
    if bare.bytes().all(|b| b.is_ascii_digit()) {
        return CellAddress::parse_row_number(&bare).map(Endpoint::Row);
    }
    CellAddress::parse(text).ok().map(Endpoint::Cell)
}

/// Parse a range string into zero-based inclusive bounds.
///
/// Accepts `Sheet1!A1:B2`, `'Quoted ''Name'''!$A$1:$B$2`, `A1:B2`, a single
/// cell `C3`, and whole-column or whole-row references such as `$A:$C` or
/// `2:5`. Any sheet prefix is ignored; use [`strip_sheet_prefix`] to check it.
/// Malformed input yields `None`.
///
/// ```
/// use exstruct_core::{parse_range, Bounds};
///
/// assert_eq!(parse_range("Sheet1!B2:A1"), Some(Bounds::new(0, 0, 1, 1)));
/// assert_eq!(parse_range("not a range"), None);
/// ```
pub fn parse_range(range: &str) -> Option<Bounds> {
    let (_, body) = split_sheet_prefix(range.trim());
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let mut parts = body.split(':');
    let first = parts.next()?;
    let second = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let Some(second) = second else {
        let addr = CellAddress::parse(first).ok()?;
        return Some(Bounds::cell(addr.row, addr.col));
    };

    match (parse_endpoint(first)?, parse_endpoint(second)?) {
        (Endpoint::Cell(a), Endpoint::Cell(b)) => Some(Bounds::new(a.row, a.col, b.row, b.col)),
        (Endpoint::Column(a), Endpoint::Column(b)) => Some(Bounds::new(0, a, MAX_ROWS - 1, b)),
        (Endpoint::Row(a), Endpoint::Row(b)) => Some(Bounds::new(a, 0, b, MAX_COLS - 1)),
        _ => None,
    }
}

/// Split `Sheet!Range` at the last `!` outside single quotes.
///
/// The sheet name is returned unquoted (`''` collapsed to `'`). Input without
/// a prefix returns `(None, input)`.
pub fn split_sheet_prefix(reference: &str) -> (Option<String>, &str) {
    let mut in_quote = false;
    let mut bang = None;
    for (idx, ch) in reference.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            '!' if !in_quote => bang = Some(idx),
            _ => {}
        }
    }

    let Some(idx) = bang else {
        return (None, reference);
    };

    let prefix = reference[..idx].trim();
    let name = if prefix.len() >= 2 && prefix.starts_with('\'') && prefix.ends_with('\'') {
        prefix[1..prefix.len() - 1].replace("''", "'")
    } else {
        prefix.to_string()
    };
    (Some(name), &reference[idx + 1..])
}

/// Return the range part of `reference` when it targets `sheet`.
///
/// References without a sheet prefix are assumed to target `sheet`.
/// References naming another sheet return `None`.
pub fn strip_sheet_prefix<'a>(reference: &'a str, sheet: &str) -> Option<&'a str> {
    match split_sheet_prefix(reference) {
        (None, body) => Some(body.trim()),
        (Some(name), body) if name == sheet => Some(body.trim()),
        _ => None,
    }
}

/// Split a comma-separated area list, ignoring commas inside quoted sheet
/// names. Empty parts are dropped.
///
/// ```
/// use exstruct_core::split_area_list;
///
/// let parts = split_area_list("'a,b'!A1:B2, Sheet2!C3");
/// assert_eq!(parts, vec!["'a,b'!A1:B2", "Sheet2!C3"]);
/// ```
pub fn split_area_list(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;

    for ch in list.chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            ',' if !in_quote => {
                let part = current.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }
    parts
}
