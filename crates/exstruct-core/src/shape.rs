//! Graphic objects: plain shapes, connectors and SmartArt diagrams.
//!
//! A sheet's graphics are a [`Graphic`] list. The variant is decided once,
//! when the raw object is ingested; nothing downstream inspects raw
//! attributes again. Only [`Arrow`] has arrow styles and connection ids.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Eight-point compass direction of a line, in screen coordinates
/// (y grows downward, so a line going right and down points `SE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    E,
    SE,
    S,
    SW,
    W,
    NW,
    N,
    NE,
}

impl Direction {
    const ORDER: [Direction; 8] = [
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
        Direction::N,
        Direction::NE,
    ];

    /// Snap an angle in degrees (0 = east, clockwise) to the nearest of the
    /// eight compass points.
    pub fn from_angle(degrees: f64) -> Self {
        let normalized = (degrees + 22.5).rem_euclid(360.0);
        let idx = (normalized / 45.0).floor() as usize % 8;
        Self::ORDER[idx]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
            Direction::N => "N",
            Direction::NE => "NE",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positional and descriptive fields shared by every graphic variant.
///
/// Coordinates are the application's own units (points from the object
/// model), truncated to integers and never rescaled.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeBase {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub id: Option<u32>,
    pub text: String,
    pub l: i32,
    pub t: i32,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub w: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub h: Option<i32>,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "type", default, skip_serializing_if = "Option::is_none")
    )]
    pub shape_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub rotation: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub direction: Option<Direction>,
}

/// A plain shape (rectangle, text box, callout, ...).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub base: ShapeBase,
}

/// A line or connector with line-end markers.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Arrow {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub base: ShapeBase,
    /// MsoArrowheadStyle code of the starting end.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub begin_arrow_style: Option<i32>,
    /// MsoArrowheadStyle code of the finishing end.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub end_arrow_style: Option<i32>,
    /// Id of the shape the connector starts at.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub begin_id: Option<u32>,
    /// Id of the shape the connector ends at.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub end_id: Option<u32>,
}

/// One node of a SmartArt tree.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmartArtNode {
    pub level: u32,
    pub text: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kids: Vec<SmartArtNode>,
}

impl SmartArtNode {
    pub fn new(level: u32, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            kids: Vec::new(),
        }
    }
}

/// A SmartArt diagram owning its whole node tree.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmartArt {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub base: ShapeBase,
    pub layout: String,
    pub nodes: Vec<SmartArtNode>,
}

/// A graphic object on a sheet.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(tag = "kind"))]
pub enum Graphic {
    Shape(Shape),
    Arrow(Arrow),
    SmartArt(SmartArt),
}

impl Graphic {
    /// The fields every variant shares.
    pub fn base(&self) -> &ShapeBase {
        match self {
            Graphic::Shape(s) => &s.base,
            Graphic::Arrow(a) => &a.base,
            Graphic::SmartArt(d) => &d.base,
        }
    }

    fn base_mut(&mut self) -> &mut ShapeBase {
        match self {
            Graphic::Shape(s) => &mut s.base,
            Graphic::Arrow(a) => &mut a.base,
            Graphic::SmartArt(d) => &mut d.base,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Graphic::Shape(_) => "Shape",
            Graphic::Arrow(_) => "Arrow",
            Graphic::SmartArt(_) => "SmartArt",
        }
    }

    /// Bounding box `(left, top, right, bottom)`. A graphic without a size
    /// is a point.
    pub fn bounding_box(&self) -> (i64, i64, i64, i64) {
        let base = self.base();
        let l = base.l as i64;
        let t = base.t as i64;
        (
            l,
            t,
            l + base.w.unwrap_or(0).max(0) as i64,
            t + base.h.unwrap_or(0).max(0) as i64,
        )
    }

    /// Copy shifted by `(-dx, -dy)`.
    pub fn rebased(&self, dx: i32, dy: i32) -> Graphic {
        let mut out = self.clone();
        let base = out.base_mut();
        base.l -= dx;
        base.t -= dy;
        out
    }

    /// Copy with `w`/`h` cleared.
    pub fn without_size(&self) -> Graphic {
        let mut out = self.clone();
        let base = out.base_mut();
        base.w = None;
        base.h = None;
        out
    }
}

impl From<Shape> for Graphic {
    fn from(s: Shape) -> Self {
        Graphic::Shape(s)
    }
}

impl From<Arrow> for Graphic {
    fn from(a: Arrow) -> Self {
        Graphic::Arrow(a)
    }
}

impl From<SmartArt> for Graphic {
    fn from(d: SmartArt) -> Self {
        Graphic::SmartArt(d)
    }
}
