use async_trait::async_trait;
use futures::future::BoxFuture;
use pool_support::PoolError;

type Result<T> = std::result::Result<T, PoolError>;

/// External collaborator: spec §4.2 `runTaskFunction` — an async factory that
/// either produces one unit of work or reports none is currently available.
///
/// `Ok(None)` is the "no task ready" case (spec: "returns a task future, or
/// `null` if no task currently ready"); `Err` is a user-code fault and is
/// fatal to `AutoscaledPool::run` (error-handling kind 3).
#[async_trait]
pub trait RunTaskFunction: Send + Sync {
    async fn run_task(&self) -> Result<Option<BoxFuture<'static, Result<()>>>>;
}

/// External collaborator: spec §4.2 `isTaskReadyFunction`. Defaults to `true`
/// when not configured (spec config table).
#[async_trait]
pub trait IsTaskReadyFunction: Send + Sync {
    async fn is_task_ready(&self) -> Result<bool>;
}

/// External collaborator: spec §4.2 `isFinishedFunction`. When not
/// configured, the pool finishes as soon as `runningCount == 0`.
#[async_trait]
pub trait IsFinishedFunction: Send + Sync {
    async fn is_finished(&self) -> Result<bool>;
}
