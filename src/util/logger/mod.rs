//! Logger module for embedrt
//!
//! Go-style simple logging: `[LEVEL] message`
//!
//! The library itself only emits `tracing` events. A host that already
//! installed a global subscriber keeps it; these helpers only install one
//! when none exists.
//!
//! # Usage
//!
//! ```rust
//! use embedrt::util::logger;
//!
//! logger::init();
//! tracing::info!("Hello, {}", "world");
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Initialize logger with default configuration (INFO level)
pub fn init() -> bool {
    init_with_level(LogLevel::Info)
}

/// Initialize logger with custom level (Go style: `[LEVEL] message`)
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_with_level(level: LogLevel) -> bool {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

    // 显示 [LEVEL] 前缀，不显示时间、不显示模块路径、无颜色
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .with_filter(filter);

    Registry::default().with(layer).try_init().is_ok()
}

/// Initialize logger for CLI use (WARN level unless verbose)
pub fn init_cli(verbose: bool) -> bool {
    if verbose {
        init_debug()
    } else {
        init_with_level(LogLevel::Warn)
    }
}

/// Initialize logger for debug use (DEBUG level)
pub fn init_debug() -> bool {
    init_with_level(LogLevel::Debug)
}
