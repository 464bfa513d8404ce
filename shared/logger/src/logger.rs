//! Thread-safe logger handle.
//!
//! This module provides the main [`Logger`] interface. Every clone shares the
//! same output, so a peer can hand tagged copies to its negotiator, transport
//! and transfer session without opening extra files.

use crate::error::Result;
use crate::log_buffer::LogBuffer;
use crate::log_level::LogLevel;
use crate::log_message::LogMessage;
use crate::log_writer::spawn_writer_thread;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

#[derive(Clone)]
enum Output {
    /// Forwarded to the background file writer.
    File(Sender<LogMessage>),
    /// Kept in memory for inspection.
    Memory(LogBuffer),
    /// Console echo only (when enabled), nothing persisted.
    None,
}

/// Thread-safe, non-blocking logger.
///
/// # Examples
///
/// ```
/// use logging::{LogLevel, Logger};
///
/// let (logger, buffer) = Logger::memory(LogLevel::Info);
/// let initiator = logger.for_component("Initiator");
/// initiator.info("offer created");
/// assert!(buffer.contains("[Initiator]: offer created"));
/// ```
#[derive(Clone)]
pub struct Logger {
    output: Output,
    level: LogLevel,
    component: Option<String>,
    console_output: bool,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("component", &self.component)
            .field("console_output", &self.console_output)
            .finish()
    }
}

impl Logger {
    /// Creates a logger appending to `log_path` through a dedicated writer thread.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn new(log_path: PathBuf, level: LogLevel) -> Result<Self> {
        Self::with_component(log_path, level, None, false)
    }

    /// Creates a file logger with an optional component tag and console echo.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be created or opened.
    pub fn with_component(
        log_path: PathBuf,
        level: LogLevel,
        component: Option<String>,
        console_output: bool,
    ) -> Result<Self> {
        let sender = spawn_writer_thread(&log_path)?;
        Ok(Self {
            output: Output::File(sender),
            level,
            component,
            console_output,
        })
    }

    /// Creates a logger that keeps every line in memory.
    pub fn memory(level: LogLevel) -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        let logger = Self {
            output: Output::Memory(buffer.clone()),
            level,
            component: None,
            console_output: false,
        };
        (logger, buffer)
    }

    /// Creates a logger that only echoes to stderr.
    pub fn console(level: LogLevel) -> Self {
        Self {
            output: Output::None,
            level,
            component: None,
            console_output: true,
        }
    }

    /// Creates a logger that drops everything.
    pub fn discard() -> Self {
        Self {
            output: Output::None,
            level: LogLevel::Error,
            component: None,
            console_output: false,
        }
    }

    /// Returns a handle on the same output tagged with `component`.
    pub fn for_component(&self, component: &str) -> Self {
        Self {
            component: Some(component.to_string()),
            ..self.clone()
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    /// Logs a debug message (only if level is Debug).
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs an info message (only if level is Info or lower).
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Logs a warning message (only if level is Warn or lower).
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Logs an error message (always recorded).
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if level < self.level {
            return;
        }
        let msg = LogMessage::new(level, self.component.as_deref(), message);

        if self.console_output {
            eprintln!("{}", msg.format());
        }

        match &self.output {
            Output::File(sender) => {
                let _ = sender.send(msg);
            }
            Output::Memory(buffer) => buffer.push(msg.format()),
            Output::None => {}
        }
    }
}
