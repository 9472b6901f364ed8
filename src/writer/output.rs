//! Output sink with offset tracking.
//!
//! Every byte of the file passes through [`PdfOutput`]. The first failed
//! write or seek closes the output for good: later calls return
//! [`Error::Closed`] without touching the underlying sink, so a caller can
//! abort cleanly but cannot resume a half-written file.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Any seekable, readable sink (read access is needed to sign the file).
pub trait SeekSink: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> SeekSink for T {}

enum Target {
    Memory(Cursor<Vec<u8>>),
    File(File),
    Custom(Box<dyn SeekSink>),
}

impl Target {
    fn sink(&mut self) -> &mut dyn SeekSink {
        match self {
            Target::Memory(c) => c,
            Target::File(f) => f,
            Target::Custom(s) => s.as_mut(),
        }
    }
}

/// Byte sink for one PDF file.
pub struct PdfOutput {
    target: Target,
    offset: u64,
    open: bool,
}

impl std::fmt::Debug for PdfOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfOutput")
            .field("offset", &self.offset)
            .field("open", &self.open)
            .finish()
    }
}

impl PdfOutput {
    /// Write into an in-memory buffer.
    pub fn memory() -> Self {
        Self::with_target(Target::Memory(Cursor::new(Vec::new())))
    }

    /// Create (or truncate) a file.
    pub fn create_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::with_target(Target::File(file)))
    }

    /// Write into a caller supplied sink.
    pub fn custom(sink: Box<dyn SeekSink>) -> Self {
        Self::with_target(Target::Custom(sink))
    }

    fn with_target(target: Target) -> Self {
        Self {
            target,
            offset: 0,
            open: true,
        }
    }

    /// Current write position (file size so far).
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the output still accepts bytes.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn fail(&mut self, err: std::io::Error) -> Error {
        log::error!("pdf output failed at offset {}: {}", self.offset, err);
        self.open = false;
        Error::Io(err)
    }

    /// Append bytes at the end of the file.
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::Closed);
        }
        match self.target.sink().write_all(data) {
            Ok(()) => {
                self.offset += data.len() as u64;
                Ok(())
            },
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Overwrite already written bytes in place, then return to the end.
    ///
    /// The replacement must not extend past the current end of file.
    pub fn overwrite_at(&mut self, position: u64, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::Closed);
        }
        if position + data.len() as u64 > self.offset {
            return Err(Error::InvalidArgument(format!(
                "overwrite of {} bytes at {} passes end of file {}",
                data.len(),
                position,
                self.offset
            )));
        }
        let end = self.offset;
        let result = (|| -> std::io::Result<()> {
            let sink = self.target.sink();
            sink.seek(SeekFrom::Start(position))?;
            sink.write_all(data)?;
            sink.seek(SeekFrom::Start(end))?;
            Ok(())
        })();
        result.map_err(|e| self.fail(e))
    }

    /// Read back a range of already written bytes.
    pub fn read_range(&mut self, position: u64, len: usize) -> Result<Vec<u8>> {
        if !self.open {
            return Err(Error::Closed);
        }
        let end = self.offset;
        let mut buf = vec![0u8; len];
        let result = (|| -> std::io::Result<()> {
            let sink = self.target.sink();
            sink.flush()?;
            sink.seek(SeekFrom::Start(position))?;
            sink.read_exact(&mut buf)?;
            sink.seek(SeekFrom::Start(end))?;
            Ok(())
        })();
        result.map_err(|e| self.fail(e))?;
        Ok(buf)
    }

    /// Flush buffered bytes to the sink.
    pub fn flush(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::Closed);
        }
        let result = self.target.sink().flush();
        result.map_err(|e| self.fail(e))
    }

    /// Take the bytes of an in-memory output. `None` for file and custom sinks.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self.target {
            Target::Memory(c) => Some(c.into_inner()),
            _ => None,
        }
    }
}
