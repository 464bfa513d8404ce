//! Background log file writer.

use crate::error::Result;
use crate::log_message::LogMessage;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Owns the log file on the writer thread.
struct LogWriter {
    file: File,
}

impl LogWriter {
    fn open(log_path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        Ok(Self { file })
    }

    fn write_message(&mut self, message: &LogMessage) {
        let line = message.format() + "\n";
        if let Err(e) = self.file.write_all(line.as_bytes()) {
            eprintln!("Error writing log: {}", e);
            return;
        }
        if let Err(e) = self.file.flush() {
            eprintln!("Error flushing log: {}", e);
        }
    }

    fn run(mut self, receiver: Receiver<LogMessage>) {
        for message in receiver {
            self.write_message(&message);
        }
    }
}

/// Opens `log_path` and spawns the thread that appends every received message.
///
/// The thread exits once every sender clone has been dropped.
pub(crate) fn spawn_writer_thread(log_path: &Path) -> Result<Sender<LogMessage>> {
    let writer = LogWriter::open(log_path)?;
    let (sender, receiver) = channel();
    std::thread::Builder::new()
        .name("log-writer".to_string())
        .spawn(move || writer.run(receiver))?;
    Ok(sender)
}
