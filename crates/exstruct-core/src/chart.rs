//! Chart metadata

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One chart series. Ranges are references such as `Sheet1!$B$2:$B$10`;
/// values are never resolved.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChartSeries {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name_range: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub x_range: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub y_range: Option<String>,
}

/// A chart embedded in a sheet.
///
/// When `error` is set the chart could not be read and the descriptive
/// fields (`chart_type`, `title`, axes, `series`) stay empty.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chart {
    pub name: String,
    pub chart_type: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub y_axis_title: String,
    /// `[min, max]` of the value axis, or empty when unknown.
    #[cfg_attr(feature = "serde", serde(default))]
    pub y_axis_range: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub series: Vec<ChartSeries>,
    pub l: i32,
    pub t: i32,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub w: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub h: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
}

impl Chart {
    /// A chart that failed to parse: name, position and the error only.
    pub fn failed(name: impl Into<String>, l: i32, t: i32, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            l,
            t,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Bounding box `(left, top, right, bottom)`, a point when size is unknown.
    pub fn bounding_box(&self) -> (i64, i64, i64, i64) {
        let l = self.l as i64;
        let t = self.t as i64;
        (
            l,
            t,
            l + self.w.unwrap_or(0).max(0) as i64,
            t + self.h.unwrap_or(0).max(0) as i64,
        )
    }

    /// Copy shifted by `(-dx, -dy)`.
    pub fn rebased(&self, dx: i32, dy: i32) -> Chart {
        Chart {
            l: self.l - dx,
            t: self.t - dy,
            ..self.clone()
        }
    }
}
