//! Excel COM Bridge: a Windows process that reads workbooks through Excel's
//! object model, controlled by JSON commands over stdin/stdout.
//!
//! Designed to be cross-compiled from Linux and run under WINE.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! - Reads `Request` objects from stdin
//! - Writes `Response` objects to stdout
//! - Diagnostic messages go to stderr (never stdout)

#[cfg(windows)]
mod dispatch;
#[cfg(windows)]
mod excel;

#[cfg(not(windows))]
fn main() {
    eprintln!("excel-com-bridge must be compiled for Windows (--target x86_64-pc-windows-gnu)");
    eprintln!("and run under WINE on Linux.");
    std::process::exit(1);
}

#[cfg(windows)]
fn main() {
    use std::io::{self, BufRead, Write};

    use excel_com_protocol::*;

    eprintln!("[excel-com-bridge] Starting up...");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut excel: Option<excel::ExcelApp> = None;

    let mut reply = |response: &Response| {
        match serde_json::to_string(response) {
            Ok(json) => {
                let _ = writeln!(out, "{json}");
            }
            Err(e) => {
                eprintln!("[excel-com-bridge] cannot encode response {}: {e}", response.id);
                let _ = writeln!(
                    out,
                    r#"{{"id":{},"status":"error","message":"response encoding failed"}}"#,
                    response.id
                );
            }
        }
        let _ = out.flush();
    };

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("[excel-com-bridge] stdin read error: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[excel-com-bridge] JSON parse error: {e}");
                reply(&Response {
                    id: 0,
                    result: ResponseResult::Error {
                        message: format!("JSON parse error: {e}"),
                    },
                });
                continue;
            }
        };

        let response = handle_command(&mut excel, &request);
        reply(&response);

        if matches!(request.command, Command::Shutdown)
            && matches!(response.result, ResponseResult::Ok { .. })
        {
            eprintln!("[excel-com-bridge] Shutdown complete, exiting.");
            break;
        }
    }

    // stdin closed without a Shutdown
    if let Some(app) = excel {
        eprintln!("[excel-com-bridge] stdin closed, shutting down Excel...");
        let _ = app.shutdown();
        uninit_com();
    }

    eprintln!("[excel-com-bridge] Process exiting.");
}

#[cfg(windows)]
fn handle_command(
    excel: &mut Option<excel::ExcelApp>,
    request: &excel_com_protocol::Request,
) -> excel_com_protocol::Response {
    use excel_com_protocol::*;

    let ok = |data: ResponseData| ResponseResult::Ok { data: Some(data) };

    let result = match &request.command {
        Command::Init => init_com_and_excel(excel),
        Command::OpenWorkbook { path } => with_excel(excel, |app| {
            let workbook = app.open_workbook(path)?;
            Ok(ok(ResponseData::WorkbookHandle { workbook }))
        }),
        Command::ListSheets { workbook } => with_excel(excel, |app| {
            let sheets = app.sheet_names(*workbook)?;
            Ok(ok(ResponseData::SheetNames { sheets }))
        }),
        Command::GetShapes { workbook, sheet } => with_excel(excel, |app| {
            let shapes = app.shapes(*workbook, sheet)?;
            Ok(ok(ResponseData::Shapes { shapes }))
        }),
        Command::GetCharts { workbook, sheet } => with_excel(excel, |app| {
            let charts = app.charts(*workbook, sheet)?;
            Ok(ok(ResponseData::Charts { charts }))
        }),
        Command::GetPrintAreas { workbook, sheet } => with_excel(excel, |app| {
            let print_area = app.print_area(*workbook, sheet)?;
            Ok(ok(ResponseData::PrintArea { print_area }))
        }),
        Command::GetPageBreaks { workbook, sheet } => with_excel(excel, |app| {
            let page_breaks = app.page_breaks(*workbook, sheet)?;
            Ok(ok(ResponseData::PageBreaks { page_breaks }))
        }),
        Command::GetSheetGrid { workbook, sheet } => with_excel(excel, |app| {
            let grid = app.grid(*workbook, sheet)?;
            Ok(ok(ResponseData::Grid { grid }))
        }),
        Command::CloseWorkbook { workbook } => with_excel(excel, |app| {
            app.close_workbook(*workbook)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::Shutdown => match excel.take() {
            Some(app) => match app.shutdown() {
                Ok(()) => {
                    uninit_com();
                    ResponseResult::Ok { data: None }
                }
                Err(e) => ResponseResult::Error {
                    message: format!("Shutdown failed: {e}"),
                },
            },
            None => ResponseResult::Ok { data: None },
        },
    };

    Response {
        id: request.id,
        result,
    }
}

#[cfg(windows)]
fn init_com_and_excel(excel: &mut Option<excel::ExcelApp>) -> excel_com_protocol::ResponseResult {
    use excel_com_protocol::ResponseResult;
    use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

    if excel.is_some() {
        return ResponseResult::Ok { data: None };
    }

    // Excel requires a single-threaded apartment
    unsafe {
        let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        if let Err(e) = hr.ok() {
            return ResponseResult::Error {
                message: format!("CoInitializeEx failed: {e}"),
            };
        }
    }

    eprintln!("[excel-com-bridge] COM initialized (STA)");

    match excel::ExcelApp::new() {
        Ok(app) => {
            eprintln!("[excel-com-bridge] Excel.Application created");
            *excel = Some(app);
            ResponseResult::Ok { data: None }
        }
        Err(e) => {
            uninit_com();
            ResponseResult::Error {
                message: format!("Failed to create Excel.Application: {e}"),
            }
        }
    }
}

#[cfg(windows)]
fn uninit_com() {
    unsafe {
        windows::Win32::System::Com::CoUninitialize();
    }
    eprintln!("[excel-com-bridge] COM uninitialized");
}

#[cfg(windows)]
fn with_excel(
    excel: &mut Option<excel::ExcelApp>,
    f: impl FnOnce(&mut excel::ExcelApp) -> Result<excel_com_protocol::ResponseResult, String>,
) -> excel_com_protocol::ResponseResult {
    match excel.as_mut() {
        Some(app) => f(app).unwrap_or_else(|message| {
            eprintln!("[excel-com-bridge] {message}");
            excel_com_protocol::ResponseResult::Error { message }
        }),
        None => excel_com_protocol::ResponseResult::Error {
            message: "Excel not initialized. Send 'Init' command first.".to_string(),
        },
    }
}
