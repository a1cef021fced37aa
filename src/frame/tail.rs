use super::{FrameError, LineAssembler};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Reads newly appended lines from a growing file.
///
/// Each `poll` stats the file, reads everything past the stored offset and
/// returns the completed lines; a trailing partial line stays in the
/// assembler until a later append finishes it. A file that shrank (rotation,
/// truncation) restarts the tail from the top. I/O failures are returned to
/// the caller, which logs and retries on the next tick; the reader itself
/// keeps no open handle between polls, so a rotated or briefly locked file
/// never wedges it.
#[derive(Debug)]
pub struct FileTailReader {
    path: PathBuf,
    offset: u64,
    assembler: LineAssembler,
    load_existing: bool,
    initialized: bool,
}

impl FileTailReader {
    /// Creates a tail over `path`. No I/O happens here; the first
    /// successful `poll` establishes the starting offset. With
    /// `load_existing` set, content already in the file is read from the
    /// top; otherwise the tail starts at the current end of file.
    pub fn new(path: impl Into<PathBuf>, load_existing: bool) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            assembler: LineAssembler::new(),
            load_existing,
            initialized: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads any bytes appended since the last poll and returns the lines
    /// they completed.
    pub async fn poll(&mut self) -> Result<Vec<String>, FrameError> {
        let len = tokio::fs::metadata(&self.path).await?.len();

        if !self.initialized {
            self.initialized = true;
            if !self.load_existing {
                self.offset = len;
                return Ok(Vec::new());
            }
        }

        if len < self.offset {
            tracing::warn!(
                "File {} shrank from {} to {len} bytes, restarting from the top",
                self.path.display(),
                self.offset
            );
            self.offset = 0;
            self.assembler.clear();
        }

        if len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut appended = Vec::new();
        file.read_to_end(&mut appended).await?;
        self.offset += appended.len() as u64;

        Ok(self.assembler.push(&appended))
    }
}
