use thiserror::Error;

/// Error type for filekv.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error from the underlying log file.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A key argument was empty. Keys must be at least one byte.
    #[error("key must not be empty")]
    EmptyKey,
    /// A key or value exceeded the width of its length field in the record
    /// header (16 bits for keys, 32 bits for values).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Removing a key that is not present in the index.
    #[error("key not found")]
    KeyNotFound,
    /// The log contained a record with an unrecognized `record_type`, or a
    /// header promised more key bytes than the file actually had.
    #[error("corrupt log: {0}")]
    CorruptLog(String),
    /// The index's probe chain was exhausted without finding a home for a
    /// key. Unreachable in practice given the 0.7 load-factor rehash rule;
    /// kept as a defensive, surfaced outcome rather than a panic.
    #[error("index is full")]
    IndexFull,
    /// The index's slot buffer could not be (re)allocated.
    #[error("allocation failure: {0}")]
    AllocationFailed(String),
}

/// Custom result type for [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
