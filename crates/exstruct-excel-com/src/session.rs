//! A workbook opened in Excel, bound to the bridge that owns it.

use std::path::Path;

use excel_com_protocol::{PageBreakLayout, RawChart, RawGrid, RawShape, SheetRef};

use crate::bridge::{linux_to_wine_path, BridgeError, ExcelBridge, ExcelBridgeConfig};

/// One workbook opened read-only through its own bridge process.
///
/// The workbook is closed and Excel shut down when the session is closed or
/// dropped, whichever comes first.
pub struct ExcelSession {
    bridge: Option<ExcelBridge>,
    handle: u64,
}

impl ExcelSession {
    /// Start a bridge and open `path` in it.
    pub fn open(config: ExcelBridgeConfig, path: &Path) -> Result<Self, BridgeError> {
        let bridge = ExcelBridge::start(config)?;
        let handle = match bridge.open_workbook(&linux_to_wine_path(path)) {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop) = bridge.shutdown() {
                    log::debug!("bridge shutdown after failed open: {stop}");
                }
                return Err(e);
            }
        };
        log::debug!("opened {} as workbook {handle}", path.display());
        Ok(Self {
            bridge: Some(bridge),
            handle,
        })
    }

    /// Get the internal handle ID.
    pub fn handle(&self) -> u64 {
        self.handle
    }

    fn bridge(&self) -> Result<&ExcelBridge, BridgeError> {
        self.bridge.as_ref().ok_or(BridgeError::NotRunning)
    }

    pub fn sheet_names(&self) -> Result<Vec<String>, BridgeError> {
        self.bridge()?.list_sheets(self.handle)
    }

    pub fn shapes(&self, sheet: &str) -> Result<Vec<RawShape>, BridgeError> {
        self.bridge()?.shapes(self.handle, SheetRef::from(sheet))
    }

    pub fn charts(&self, sheet: &str) -> Result<Vec<RawChart>, BridgeError> {
        self.bridge()?.charts(self.handle, SheetRef::from(sheet))
    }

    pub fn print_area(&self, sheet: &str) -> Result<String, BridgeError> {
        self.bridge()?.print_area(self.handle, SheetRef::from(sheet))
    }

    pub fn page_breaks(&self, sheet: &str) -> Result<PageBreakLayout, BridgeError> {
        self.bridge()?.page_breaks(self.handle, SheetRef::from(sheet))
    }

    pub fn grid(&self, sheet: &str) -> Result<RawGrid, BridgeError> {
        self.bridge()?.grid(self.handle, SheetRef::from(sheet))
    }

    /// Close the workbook and shut the bridge down.
    pub fn close(mut self) -> Result<(), BridgeError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), BridgeError> {
        let Some(bridge) = self.bridge.take() else {
            return Ok(());
        };
        let closed = bridge.close_workbook(self.handle);
        let stopped = bridge.shutdown();
        closed.and(stopped)
    }
}

impl Drop for ExcelSession {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::debug!("closing workbook {} failed: {e}", self.handle);
        }
    }
}
