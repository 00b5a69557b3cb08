use crate::sink::{LogSink, SinkResult};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Permission bits for newly created log files (owner read-write, others read).
#[cfg(unix)]
pub const LOG_FILE_MODE: u32 = 0o644;

/// Sink that appends records to a local file.
///
/// The file is opened with create + append, so concurrent writers from
/// other processes never overwrite each other. No rotation is performed.
pub struct FileSink {
    file: Mutex<Option<File>>,
    path: PathBuf,
}

impl FileSink {
    /// Open `path` for appending, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(LOG_FILE_MODE);
        }
        let file = options.open(&path)?;
        tracing::debug!(target: crate::INTERNAL_TARGET, path = %path.display(), "file log sink opened");
        Ok(FileSink {
            file: Mutex::new(Some(file)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn send(&self, payload: &[u8]) -> SinkResult {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(file) => Ok(file.write_all(payload)?),
            None => Err(io::Error::new(io::ErrorKind::Other, "file log sink is closed").into()),
        }
    }

    fn flush(&self) -> SinkResult {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = guard.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> SinkResult {
        let file = self.file.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(mut file) = file {
            file.flush()?;
            tracing::debug!(target: crate::INTERNAL_TARGET, path = %self.path.display(), "file log sink closed");
        }
        Ok(())
    }
}
