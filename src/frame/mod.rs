//! Frame readers: turn continuous transports into discrete message frames.
//!
//! UDP needs none of this (one datagram is one frame); TCP streams and
//! tailed files are split on newline boundaries with partial-line carry-over
//! handled by `LineAssembler`, and `FileTailReader` adds offset tracking and
//! rotation tolerance on top.

pub mod line;
pub mod tail;

pub use line::LineAssembler;
pub use tail::FileTailReader;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
