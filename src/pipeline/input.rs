//! Input resolution: normalise a path, byte buffer or stream into one
//! in-memory byte view.
//!
//! ## Why one resolver for every operation?
//!
//! All six operations accept the same three source shapes. Doing the
//! validate-then-read dance once here means the operations only ever see
//! `&[u8]` and cannot disagree about edge cases (cursor restoration, size
//! checks, error wording).
//!
//! ```text
//! PdfSource ──► validate (exists → size → sniff) ──► materialise ──► Cow<[u8]>
//!                   │                                   │
//!                   └── stream cursor restored ◄────────┘
//! ```

use crate::config::ToolkitConfig;
use crate::error::ToolkitError;
use crate::pipeline::validate::{path_error, stream_error, validate};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Anything that can be read and repositioned.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// A caller-supplied PDF.
///
/// Build it with the `From` impls (`&Path`, `PathBuf`, `&[u8]`, `Vec<u8>`)
/// or [`PdfSource::stream`].
pub enum PdfSource<'a> {
    /// File on disk.
    Path(PathBuf),
    /// Fully materialised content.
    Bytes(Cow<'a, [u8]>),
    /// Seekable handle. Left at its original cursor position after use.
    Stream(&'a mut dyn ReadSeek),
}

impl<'a> PdfSource<'a> {
    pub fn stream(reader: &'a mut dyn ReadSeek) -> Self {
        PdfSource::Stream(reader)
    }

    /// Short noun for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PdfSource::Path(_) => "file",
            PdfSource::Bytes(_) => "bytes",
            PdfSource::Stream(_) => "stream",
        }
    }
}

impl fmt::Debug for PdfSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfSource::Path(p) => f.debug_tuple("Path").field(p).finish(),
            PdfSource::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            PdfSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<PathBuf> for PdfSource<'_> {
    fn from(p: PathBuf) -> Self {
        PdfSource::Path(p)
    }
}

impl From<&Path> for PdfSource<'_> {
    fn from(p: &Path) -> Self {
        PdfSource::Path(p.to_path_buf())
    }
}

impl From<&PathBuf> for PdfSource<'_> {
    fn from(p: &PathBuf) -> Self {
        PdfSource::Path(p.clone())
    }
}

impl<'a> From<&'a [u8]> for PdfSource<'a> {
    fn from(b: &'a [u8]) -> Self {
        PdfSource::Bytes(Cow::Borrowed(b))
    }
}

impl From<Vec<u8>> for PdfSource<'_> {
    fn from(b: Vec<u8>) -> Self {
        PdfSource::Bytes(Cow::Owned(b))
    }
}

/// Validate `source`, then read it fully into memory.
///
/// Byte buffers are passed through without copying.
pub fn resolve<'a>(
    mut source: PdfSource<'a>,
    config: &ToolkitConfig,
) -> Result<Cow<'a, [u8]>, ToolkitError> {
    validate(&mut source, config)?;
    info!("Reading PDF from {}", source.kind());

    let bytes = match source {
        PdfSource::Bytes(bytes) => bytes,
        PdfSource::Path(path) => Cow::Owned(read_path(&path, config.max_file_size)?),
        PdfSource::Stream(stream) => Cow::Owned(read_stream(stream)?),
    };

    // The file may have grown between the size check and the read.
    if bytes.len() as u64 > config.max_file_size {
        return Err(ToolkitError::SizeExceeded {
            size: bytes.len() as u64,
            limit: config.max_file_size,
        });
    }
    Ok(bytes)
}

fn read_path(path: &Path, limit: u64) -> Result<Vec<u8>, ToolkitError> {
    let file = std::fs::File::open(path).map_err(|e| path_error(path, e))?;
    let mut buf = Vec::new();
    // One byte past the limit is enough to detect growth.
    file.take(limit.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|e| path_error(path, e))?;
    Ok(buf)
}

fn read_stream<S: Read + Seek + ?Sized>(stream: &mut S) -> Result<Vec<u8>, ToolkitError> {
    let mut guard = CursorGuard::new(stream).map_err(stream_error)?;
    guard.rewind().map_err(stream_error)?;
    let mut buf = Vec::new();
    guard.read_to_end(&mut buf).map_err(stream_error)?;
    Ok(buf)
}

// ── Cursor guard ─────────────────────────────────────────────────────────

/// Remembers a stream's position and seeks back to it on drop.
///
/// Drop runs on every exit path, so a `?` half-way through inspection
/// still hands the caller their stream exactly as they gave it.
pub(crate) struct CursorGuard<'s, S: Seek + ?Sized> {
    stream: &'s mut S,
    origin: u64,
}

impl<'s, S: Seek + ?Sized> CursorGuard<'s, S> {
    pub(crate) fn new(stream: &'s mut S) -> io::Result<Self> {
        let origin = stream.stream_position()?;
        Ok(Self { stream, origin })
    }

    /// Total length of the stream. Moves the cursor to the end.
    pub(crate) fn measure(&mut self) -> io::Result<u64> {
        self.stream.seek(SeekFrom::End(0))
    }

    pub(crate) fn rewind(&mut self) -> io::Result<()> {
        self.stream.seek(SeekFrom::Start(0)).map(|_| ())
    }
}

impl<S: Read + Seek + ?Sized> Read for CursorGuard<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl<S: Seek + ?Sized> Drop for CursorGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.seek(SeekFrom::Start(self.origin)) {
            warn!("Failed to restore stream position {}: {}", self.origin, e);
        }
    }
}
