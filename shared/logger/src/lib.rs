//! Leveled, component-tagged logging shared by every PeerLink crate.
//!
//! A [`Logger`] is cheap to clone. File output goes through a dedicated
//! writer thread so callers never block on disk I/O; memory output keeps the
//! formatted lines in a [`LogBuffer`] so tests can assert on them.

pub mod error;
mod log_buffer;
mod log_level;
mod log_message;
mod log_writer;
mod logger;

pub use error::{LoggingError, Result};
pub use log_buffer::LogBuffer;
pub use log_level::LogLevel;
pub use logger::Logger;
