/// Formatting and sinks: colored console output plus a plain file sink
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Utc;
use colored::Colorize;
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

/// File sink opened once; `None` when the logs directory is unavailable
static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

/// Open the log file sink. Called once from `logger::init()`.
pub fn init_file_sink() {
    let path = crate::paths::get_log_file_path();
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            if let Ok(mut sink) = LOG_FILE.lock() {
                *sink = Some(file);
            }
        }
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
        }
    }
}

/// Flush pending file writes (shutdown path)
pub fn flush_file_sink() {
    if let Ok(mut sink) = LOG_FILE.lock() {
        if let Some(file) = sink.as_mut() {
            let _ = file.flush();
        }
    }
}

fn level_label(level: LogLevel) -> String {
    match level {
        LogLevel::Error => level.as_str().red().bold().to_string(),
        LogLevel::Warning => level.as_str().yellow().bold().to_string(),
        LogLevel::Info => level.as_str().normal().to_string(),
        LogLevel::Debug => level.as_str().purple().to_string(),
        LogLevel::Verbose => level.as_str().dimmed().to_string(),
    }
}

/// Format a line and write it to both sinks
pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let timestamp = Utc::now().format("%H:%M:%S");

    println!(
        "{} {} {} {}",
        format!("[{}]", timestamp).dimmed(),
        level_label(level),
        tag.colored_label(),
        message
    );

    if let Ok(mut sink) = LOG_FILE.lock() {
        if let Some(file) = sink.as_mut() {
            let _ = writeln!(
                file,
                "{} {} {} {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
                level.as_str(),
                tag.as_str(),
                message
            );
        }
    }
}
