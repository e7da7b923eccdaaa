//! Destinations for rendered log lines.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::Result;

/// Accepts one finished line; the sink adds the record separator.
///
/// Writing is best effort: a sink reports its own failures and never
/// propagates them into stream processing.
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line)
    }
}

/// Appends lines to a file.
///
/// Each line is one blocking `write` under a lock, done on the caller's
/// thread.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}
impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(FileSink {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl LogSink for FileSink {
    fn write_line(&self, line: &str) {
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');
        if let Err(e) = self.file.lock().write_all(record.as_bytes()) {
            tracing::warn!(path = ?self.path, error = %e, "failed to write websocket log line");
        }
    }
}

/// Emits lines as `tracing` events on the `ws_stat` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;
impl LogSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "ws_stat", "{}", line);
    }
}
