//! Stable error ordinals and the public error type for the index engine.
//!
//! Every I/O-capable operation returns [`IndexResult`]. Control signals used
//! internally during insertion (node-full, leaf/internal overflow) are not
//! part of this type — see [`crate::node::NodeResult`] and
//! [`crate::tree::InsertOutcome`].

use thiserror::Error;

/// Stable error ordinals, in the order callers are expected to match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    FileOpenFailed = 0,
    FileReadFailed = 1,
    FileWriteFailed = 2,
    FileSeekFailed = 3,
    InvalidFileFormat = 4,
    NodeFull = 5,
    LeafOverflow = 6,
    EndOfTree = 7,
    InvalidCursor = 8,
    EmptyTree = 9,
    ZeroKey = 10,
}

impl ErrorCode {
    pub fn as_raw(self) -> u16 {
        self as u16
    }
}

/// Errors that can cross the public API boundary of this crate.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to open index file: {0}")]
    FileOpenFailed(#[source] std::io::Error),

    #[error("failed to read page {page_id}: {source}")]
    FileReadFailed {
        page_id: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write page {page_id}: {source}")]
    FileWriteFailed {
        page_id: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to seek to page {page_id}: {source}")]
    FileSeekFailed {
        page_id: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("cursor references an out-of-range entry")]
    InvalidCursor,

    #[error("locate() called on an empty tree")]
    EmptyTree,

    #[error("key 0 is reserved as the in-node sentinel for an unused slot")]
    ZeroKey,
}

impl IndexError {
    pub fn code(&self) -> ErrorCode {
        match self {
            IndexError::FileOpenFailed(_) => ErrorCode::FileOpenFailed,
            IndexError::FileReadFailed { .. } => ErrorCode::FileReadFailed,
            IndexError::FileWriteFailed { .. } => ErrorCode::FileWriteFailed,
            IndexError::FileSeekFailed { .. } => ErrorCode::FileSeekFailed,
            IndexError::InvalidFileFormat(_) => ErrorCode::InvalidFileFormat,
            IndexError::InvalidCursor => ErrorCode::InvalidCursor,
            IndexError::EmptyTree => ErrorCode::EmptyTree,
            IndexError::ZeroKey => ErrorCode::ZeroKey,
        }
    }
}

/// Result type for public index operations.
pub type IndexResult<T> = Result<T, IndexError>;
