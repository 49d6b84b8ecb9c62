//! Excel COM automation for exstruct, via a WINE bridge process.
//!
//! This crate spawns a Windows `.exe` under WINE that automates Excel through COM,
//! communicating over JSON-over-stdio. It reads what only a live Excel knows:
//! drawing objects with their SmartArt and connector details, charts, and
//! computed page breaks.
//!
//! # Architecture
//!
//! ```text
//! exstruct automation backend (native Linux)
//!     └── ExcelSession / ExcelBridge (this crate)
//!           └── spawns: wine excel-com-bridge.exe
//!                 └── COM: Excel.Application
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use exstruct_excel_com::{ExcelBridgeConfig, ExcelSession};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = ExcelSession::open(ExcelBridgeConfig::default(), Path::new("book.xlsx"))?;
//!     for sheet in session.sheet_names()? {
//!         println!("{sheet}: {} shapes", session.shapes(&sheet)?.len());
//!     }
//!     session.close()?;
//!     Ok(())
//! }
//! ```

mod bridge;
mod session;

pub use bridge::{linux_to_wine_path, BridgeError, ExcelBridge, ExcelBridgeConfig};
pub use excel_com_protocol::{
    AreaRect, CellValue, PageBreakLayout, RawCell, RawChart, RawGrid, RawLink, RawSeries,
    RawShape, RawSmartArtNode, SheetRef,
};
pub use session::ExcelSession;
