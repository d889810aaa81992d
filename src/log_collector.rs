//! Decoupled logging pipeline for the results browser.
//!
//! Every `log::*!` call is routed through a crossbeam channel to a single
//! writer thread, so a slow disk never stalls rendering.
//!
//! ```text
//! log::info!() / log::warn!()
//!        |
//!   [LogCollector]  (non-blocking send)
//!        | crossbeam unbounded channel
//!        v
//!   writer thread ──> logs/bench_browser_<ts>.log
//!        └──────────> stderr (warnings and errors only)
//! ```

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or flush marker
enum LogMessage {
    Line(LogLine),
    /// Signalled once every earlier line has been written
    Flush(std::sync::mpsc::Sender<()>),
}

/// Get the global logs path relative to the current working directory: ./logs
pub fn get_global_logs_path() -> Result<PathBuf, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to get current working directory: {}", e))?;
    Ok(cwd.join("logs"))
}

/// Ensure the logs directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create logs directory: {}", e))
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    /// Wall-clock time the line was produced (HH:MM:SS.mmm)
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        LogLine {
            message: message.into(),
            level,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    fn format(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }
}

/// Logger that persists every line to a session file on a background thread
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    log_path: PathBuf,
    level: LevelFilter,
}

impl LogCollector {
    /// Create the session log file under `log_dir` and start the writer thread.
    pub fn new(log_dir: &Path, level: LevelFilter) -> Result<Self, String> {
        ensure_logs_dir_exists(log_dir)?;

        let log_path = log_dir.join(format!(
            "bench_browser_{}.log",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("Failed to open log file {}: {}", log_path.display(), e))?;

        let (tx, rx) = unbounded::<LogMessage>();

        std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file: File = file;
                while let Ok(msg) = rx.recv() {
                    match msg {
                        LogMessage::Line(line) => {
                            let formatted = line.format();
                            let _ = file.write_all(formatted.as_bytes());
                            if line.level <= Level::Warn {
                                eprint!("{}", formatted);
                            }
                        }
                        LogMessage::Flush(done) => {
                            let _ = file.flush();
                            let _ = done.send(());
                        }
                    }
                }
                let _ = file.flush();
            })
            .map_err(|e| format!("Failed to spawn log writer thread: {}", e))?;

        Ok(LogCollector {
            tx,
            log_path,
            level,
        })
    }

    /// Register a clone of this collector as the global `log` backend.
    pub fn install(&self) -> Result<(), String> {
        log::set_boxed_logger(Box::new(self.clone()))
            .map(|()| log::set_max_level(self.level))
            .map_err(|e| format!("Failed to set global logger: {}", e))
    }

    /// Path of this session's log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Queue a line (never blocks)
    pub fn send(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Block until every line sent before this call is on disk.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.send(LogLine::new(record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
