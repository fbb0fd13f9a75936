//! Error types for TOC, soundbank and working-set operations.

use thiserror::Error;

/// Coarse classification of [`Error`] used by callers that only care about
/// how to react (abort a decode, skip one entity, report a bug, surface I/O).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Fatal to the decode call that produced it.
    Format,
    /// A referenced id or hash is not loaded. Recoverable per entity.
    Lookup,
    /// A re-encoded record disagrees with its recorded size.
    Integrity,
    /// File system failure.
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOC magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic { expected: u32, found: u32 },

    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {have})")]
    UnexpectedEof { offset: u64, need: u64, have: u64 },

    #[error("unknown TOC type id {0:#018x}")]
    UnknownType(u64),

    #[error("{context}: {message}")]
    Malformed { context: &'static str, message: String },

    #[error("binary layout error: {0}")]
    Binary(#[from] binrw::Error),

    #[error("{kind} {id:#x} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("no {kind} named {name:?}")]
    NameNotFound { kind: &'static str, name: String },

    #[error("a {kind} named {name:?} already exists")]
    NameTaken { kind: &'static str, name: String },

    #[error("hierarchy entry {id} is a {found}, expected {expected}")]
    WrongVariant {
        id: u32,
        expected: &'static str,
        found: &'static str,
    },

    #[error("hierarchy entry {id} encodes to {actual} bytes but its header records {recorded}")]
    SizeMismatch { id: u32, recorded: u32, actual: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::InvalidMagic { .. }
            | Error::UnexpectedEof { .. }
            | Error::UnknownType(_)
            | Error::Malformed { .. }
            | Error::Binary(_) => ErrorKind::Format,
            Error::NotFound { .. }
            | Error::NameNotFound { .. }
            | Error::NameTaken { .. }
            | Error::WrongVariant { .. } => ErrorKind::Lookup,
            Error::SizeMismatch { .. } => ErrorKind::Integrity,
        }
    }

    pub(crate) fn malformed(context: &'static str, message: impl Into<String>) -> Self {
        Error::Malformed {
            context,
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<u64>) -> Self {
        Error::NotFound { kind, id: id.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
