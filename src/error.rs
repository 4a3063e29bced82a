//! Error types for sorting and scanning.
//!
//! Every failure is reported synchronously to the caller; nothing is retried
//! internally since the pipeline is deterministic.
//!
//! | Error            | Raised by                          |
//! |------------------|------------------------------------|
//! | InvalidConfig    | `allocate`, `SortConfig::validate` |
//! | LengthMismatch   | `run`, `Buffer::upload`            |
//! | Capacity         | `run`, `ExecutionContext::dispatch`|
//! | ThreadPool       | `ExecutionContext::new`            |
//!
//! Wrapping of fixed-width counters is not detected.

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("capacity exceeded: {what} of {requested} exceeds device limit {limit}")]
    Capacity {
        what: &'static str,
        requested: usize,
        limit: usize,
    },
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, SortError>;
