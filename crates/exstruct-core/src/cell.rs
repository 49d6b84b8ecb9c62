//! Cell values and sparse rows

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A scalar cell value as it appears in extraction output.
///
/// Numbers that are integral are stored as [`CellValue::Int`] so that
/// `42.0` in the file surfaces as `42`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
pub enum CellValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Build a numeric value, collapsing integral floats to `Int`.
    pub fn number(n: f64) -> Self {
        if n.fract() == 0.0 && n.is_finite() && n.abs() < 9.007_199_254_740_992e15 {
            CellValue::Int(n as i64)
        } else {
            CellValue::Float(n)
        }
    }

    /// Text that is blank after trimming counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// One worksheet row with only its non-empty cells.
///
/// `r` is 1-based. Column keys are 0-based and serialize as strings
/// (`{"0": "Name", "3": 12}`), matching how JSON object keys work.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellRow {
    pub r: u32,
    pub c: BTreeMap<u32, CellValue>,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub links: Option<BTreeMap<u32, String>>,
}

impl CellRow {
    pub fn new(r: u32) -> Self {
        Self {
            r,
            c: BTreeMap::new(),
            links: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }

    /// Copy of this row keeping only columns in `[c1, c2]`.
    pub fn restricted(&self, c1: u32, c2: u32) -> CellRow {
        let c = self
            .c
            .range(c1..=c2)
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        let links = self.links.as_ref().and_then(|links| {
            let kept: BTreeMap<u32, String> = links
                .range(c1..=c2)
                .map(|(k, v)| (*k, v.clone()))
                .collect();
            (!kept.is_empty()).then_some(kept)
        });
        CellRow { r: self.r, c, links }
    }

    /// Whether every column of this row lies in `[c1, c2]`.
    pub fn within_columns(&self, c1: u32, c2: u32) -> bool {
        let in_range = |k: &u32| *k >= c1 && *k <= c2;
        self.c.keys().all(in_range)
            && self
                .links
                .as_ref()
                .map_or(true, |links| links.keys().all(in_range))
    }
}
