//! Extraction modes and options

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::table::TableDetectionConfig;

/// How much to extract.
///
/// - `Light`: cells, table candidates and print areas from the file only;
///   automation is not started.
/// - `Standard`: adds graphics with text, connectors and charts.
/// - `Verbose`: every graphic, sizes and cell hyperlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Light,
    #[default]
    Standard,
    Verbose,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Light => "light",
            ExtractionMode::Standard => "standard",
            ExtractionMode::Verbose => "verbose",
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ExtractionMode::Light),
            "standard" => Ok(ExtractionMode::Standard),
            "verbose" => Ok(ExtractionMode::Verbose),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for the colors map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorsOptions {
    /// Report cells without a fill under `FFFFFF`.
    pub include_default_background: bool,
    /// Colors to leave out, as `RRGGBB`, `#RRGGBB` or `AARRGGBB` in any case.
    pub ignore_colors: Vec<String>,
}

/// Options for one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOptions {
    pub mode: ExtractionMode,
    /// Collect cell hyperlinks. `None` means on in `verbose` only.
    pub include_cell_links: Option<bool>,
    pub include_print_areas: bool,
    /// Split print areas at page breaks (needs automation).
    pub include_auto_page_breaks: bool,
    pub include_colors_map: bool,
    pub colors: ColorsOptions,
    /// Detector thresholds. `None` reads the process-wide configuration.
    pub table_config: Option<TableDetectionConfig>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self::new(ExtractionMode::default())
    }
}

impl ExtractionOptions {
    pub fn new(mode: ExtractionMode) -> Self {
        Self {
            mode,
            include_cell_links: None,
            include_print_areas: true,
            include_auto_page_breaks: false,
            include_colors_map: false,
            colors: ColorsOptions::default(),
            table_config: None,
        }
    }

    pub fn cell_links_enabled(&self) -> bool {
        self.include_cell_links
            .unwrap_or(self.mode == ExtractionMode::Verbose)
    }

    /// The detector thresholds for this run.
    pub fn table_config(&self) -> TableDetectionConfig {
        self.table_config
            .clone()
            .unwrap_or_else(crate::table::table_detection_config)
    }
}
