//! Subprocess management and JSON IPC for the WINE bridge process.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use excel_com_protocol::{
    Command as BridgeCommand, PageBreakLayout, RawChart, RawGrid, RawShape, Request, Response,
    ResponseData, ResponseResult, SheetRef,
};

/// Errors from the Excel COM bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to spawn WINE bridge process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Bridge process not running")]
    NotRunning,

    #[error("Failed to send command to bridge: {0}")]
    SendFailed(String),

    #[error("Failed to read response from bridge: {0}")]
    ReadFailed(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Bridge returned error: {0}")]
    BridgeError(String),

    #[error("Unexpected response data")]
    UnexpectedResponse,

    #[error("WINE not found. Install WINE and ensure 'wine' is in PATH.")]
    WineNotFound,

    #[error("Bridge executable not found at: {0}")]
    BridgeExeNotFound(String),
}

/// Configuration for the Excel COM bridge.
#[derive(Debug, Clone)]
pub struct ExcelBridgeConfig {
    /// Path to the `excel-com-bridge.exe` Windows executable.
    /// If None, will search in common locations relative to the current binary.
    pub bridge_exe_path: Option<PathBuf>,

    /// Path to the WINE executable. Defaults to "wine".
    pub wine_path: PathBuf,

    /// Optional WINEPREFIX to use (for isolating the WINE environment).
    pub wine_prefix: Option<PathBuf>,
}

impl Default for ExcelBridgeConfig {
    fn default() -> Self {
        Self {
            bridge_exe_path: None,
            wine_path: PathBuf::from("wine"),
            wine_prefix: None,
        }
    }
}

impl ExcelBridgeConfig {
    /// Defaults, overridden by `EXSTRUCT_BRIDGE_EXE`, `EXSTRUCT_WINE` and `WINEPREFIX`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty());
        let mut config = Self::default();
        if let Some(exe) = var("EXSTRUCT_BRIDGE_EXE") {
            config.bridge_exe_path = Some(PathBuf::from(exe));
        }
        if let Some(wine) = var("EXSTRUCT_WINE") {
            config.wine_path = PathBuf::from(wine);
        }
        config.wine_prefix = var("WINEPREFIX").map(PathBuf::from);
        config
    }
}

/// The handle for communicating with the Excel COM bridge.
///
/// Owns the WINE subprocess. Dropping the bridge without calling
/// [`ExcelBridge::shutdown`] kills the process.
pub struct ExcelBridge {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    next_id: AtomicU64,
}

impl ExcelBridge {
    /// Start the bridge process and initialize Excel.
    pub fn start(config: ExcelBridgeConfig) -> Result<Self, BridgeError> {
        let exe_path = config.bridge_exe_path.unwrap_or_else(find_bridge_exe);

        if !exe_path.exists() {
            return Err(BridgeError::BridgeExeNotFound(
                exe_path.display().to_string(),
            ));
        }

        let mut cmd = std::process::Command::new(&config.wine_path);

        if let Some(prefix) = &config.wine_prefix {
            cmd.env("WINEPREFIX", prefix);
        }

        cmd.arg(&exe_path);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit()); // Bridge diagnostics go to our stderr

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::WineNotFound
            } else {
                BridgeError::SpawnFailed(e)
            }
        })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(BridgeError::NotRunning);
        };

        log::debug!("spawned bridge {} (pid {})", exe_path.display(), child.id());

        let bridge = Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicU64::new(1),
        };

        // Initialize COM and Excel
        bridge.send_command(BridgeCommand::Init)?;

        Ok(bridge)
    }

    /// Send a command to the bridge and wait for the response.
    fn send_command(&self, command: BridgeCommand) -> Result<Option<ResponseData>, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let request = Request { id, command };
        let json = serde_json::to_string(&request)?;

        {
            let mut stdin = self.stdin.lock().map_err(|_| BridgeError::NotRunning)?;
            writeln!(stdin, "{json}").map_err(|e| BridgeError::SendFailed(e.to_string()))?;
            stdin
                .flush()
                .map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        }

        let response: Response = {
            let mut stdout = self.stdout.lock().map_err(|_| BridgeError::NotRunning)?;
            let mut line = String::new();
            stdout
                .read_line(&mut line)
                .map_err(|e| BridgeError::ReadFailed(e.to_string()))?;

            if line.is_empty() {
                return Err(BridgeError::NotRunning);
            }

            serde_json::from_str(&line)?
        };

        if response.id != id {
            log::warn!("bridge answered request {} with id {}", id, response.id);
            return Err(BridgeError::UnexpectedResponse);
        }

        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { message } => Err(BridgeError::BridgeError(message)),
        }
    }

    /// Open an existing workbook read-only and return its handle.
    ///
    /// The path should be a Windows-style path as seen by WINE.
    /// Use [`linux_to_wine_path`] to convert if needed.
    pub fn open_workbook(&self, path: &str) -> Result<u64, BridgeError> {
        match self.send_command(BridgeCommand::OpenWorkbook {
            path: path.to_string(),
        })? {
            Some(ResponseData::WorkbookHandle { workbook }) => Ok(workbook),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub fn list_sheets(&self, workbook: u64) -> Result<Vec<String>, BridgeError> {
        match self.send_command(BridgeCommand::ListSheets { workbook })? {
            Some(ResponseData::SheetNames { sheets }) => Ok(sheets),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub fn shapes(&self, workbook: u64, sheet: SheetRef) -> Result<Vec<RawShape>, BridgeError> {
        match self.send_command(BridgeCommand::GetShapes { workbook, sheet })? {
            Some(ResponseData::Shapes { shapes }) => Ok(shapes),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub fn charts(&self, workbook: u64, sheet: SheetRef) -> Result<Vec<RawChart>, BridgeError> {
        match self.send_command(BridgeCommand::GetCharts { workbook, sheet })? {
            Some(ResponseData::Charts { charts }) => Ok(charts),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    /// The sheet's print-area text; empty when none is set.
    pub fn print_area(&self, workbook: u64, sheet: SheetRef) -> Result<String, BridgeError> {
        match self.send_command(BridgeCommand::GetPrintAreas { workbook, sheet })? {
            Some(ResponseData::PrintArea { print_area }) => Ok(print_area),
            None => Ok(String::new()),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub fn page_breaks(
        &self,
        workbook: u64,
        sheet: SheetRef,
    ) -> Result<PageBreakLayout, BridgeError> {
        match self.send_command(BridgeCommand::GetPageBreaks { workbook, sheet })? {
            Some(ResponseData::PageBreaks { page_breaks }) => Ok(page_breaks),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub fn grid(&self, workbook: u64, sheet: SheetRef) -> Result<RawGrid, BridgeError> {
        match self.send_command(BridgeCommand::GetSheetGrid { workbook, sheet })? {
            Some(ResponseData::Grid { grid }) => Ok(grid),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub fn close_workbook(&self, workbook: u64) -> Result<(), BridgeError> {
        self.send_command(BridgeCommand::CloseWorkbook { workbook })?;
        Ok(())
    }

    /// Shut down the bridge: close all workbooks, quit Excel, and terminate the process.
    pub fn shutdown(self) -> Result<(), BridgeError> {
        self.stop()
    }

    fn stop(&self) -> Result<(), BridgeError> {
        let result = self.send_command(BridgeCommand::Shutdown).map(|_| ());

        let mut child = self.child.lock().map_err(|_| BridgeError::NotRunning)?;
        if result.is_err() {
            let _ = child.kill();
        }
        let _ = child.wait();

        result
    }
}

impl Drop for ExcelBridge {
    fn drop(&mut self) {
        if let Ok(child) = self.child.get_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                log::debug!("bridge still running on drop; killing pid {}", child.id());
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

/// Convert a Linux filesystem path to a WINE (Windows) path.
///
/// WINE maps `/` to `Z:\`, so `/home/user/file.xlsx` becomes `Z:\home\user\file.xlsx`.
pub fn linux_to_wine_path(linux_path: &Path) -> String {
    let abs = if linux_path.is_absolute() {
        linux_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(linux_path)
    };

    format!("Z:{}", abs.display()).replace('/', "\\")
}

/// Attempt to locate the bridge exe relative to the current executable or in common paths.
fn find_bridge_exe() -> PathBuf {
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        let candidate = exe.join("excel-com-bridge.exe");
        if candidate.exists() {
            return candidate;
        }
    }

    for profile in ["release", "debug"] {
        let candidate = PathBuf::from(format!(
            "target/x86_64-pc-windows-gnu/{profile}/excel-com-bridge.exe"
        ));
        if candidate.exists() {
            return candidate;
        }
    }

    PathBuf::from("excel-com-bridge.exe")
}
