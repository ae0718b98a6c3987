use thiserror::Error;

/// The engine's two-outcome contract (`Ok` / `Err`) made explicit, with
/// the error-kind taxonomy a caller needs to tell the failure modes
/// apart (spec §7: not-found, allocation failure, duplicate, encoding).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum TrieError {
    #[error("key not found")]
    NotFound,

    #[error("key already exists")]
    Duplicate,

    #[error("allocation failure growing the double array or tail pool")]
    AllocationFailure,

    #[error("byte {byte} is outside the configured alphabet ranges")]
    Encoding { byte: u8 },

    #[error("range {begin}..={end} is invalid (begin must be <= end)")]
    InvalidRange { begin: u8, end: u8 },

    #[error("corrupt serialized data: {0}")]
    Corrupt(&'static str),
}

pub type Result<T> = std::result::Result<T, TrieError>;
