use thiserror::Error;

/// Shared error type for both `browser-pool` and `autoscaled-pool`.
///
/// Mirrors the split the teacher draws in `riptide-types::ports::pool::PoolError`
/// and `riptide-performance::PerformanceError`: a handful of named variants for
/// the faults callers are expected to branch on, plus an escape hatch for
/// anything bubbled up via `anyhow`.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A launch/creation attempt failed (operational fault, spec §7 kind 2).
    #[error("launch failed: {0}")]
    LaunchFailed(String),

    /// A transient external fault: disconnect, probe failure, timeout (spec §7 kind 1).
    #[error("transient fault: {0}")]
    Transient(String),

    /// User-supplied code rejected (spec §7 kind 3).
    #[error("task failed: {0}")]
    TaskFailed(#[source] anyhow::Error),

    /// A supplied function violated its contract (spec §7 kind 4).
    #[error("programmer error: {0}")]
    ProgrammerError(String),

    /// Catch-all for internal aggregation of fallible steps.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PoolError>;
