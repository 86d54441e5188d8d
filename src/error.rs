//! Error types for the firmware core.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Top-level error type, generic over the serial transport's error.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("serial communication error")]
    Serial(I),
}

/// Non-volatile storage outcomes.
///
/// Storage failures are never fatal: callers fall back to defaults on load
/// and report a combined failure to the operator on save, with the in-memory
/// records staying authoritative either way.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No record present at the expected location.
    #[error("record not present")]
    Missing,
    /// A record was present but failed validation.
    #[error("record failed validation")]
    Corrupt,
    /// The storage rejected or failed the write.
    #[error("write rejected by storage")]
    WriteFailed,
}
