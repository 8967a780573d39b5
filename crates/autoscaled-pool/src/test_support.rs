//! Test doubles for the external collaborators `AutoscaledPool` depends on,
//! kept alongside the code they exercise (SPEC_FULL.md §8, "AMBIENT — test
//! tooling").

use crate::traits::{IsFinishedFunction, IsTaskReadyFunction, RunTaskFunction};
use async_trait::async_trait;
use futures::future::BoxFuture;
use pool_support::{MemoryProbe, MemorySample, PoolError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

type Result<T> = std::result::Result<T, PoolError>;

/// A `MemoryProbe` that always reports the same free/total split, with free
/// bytes mutable at runtime for tests that need to change load mid-run.
pub struct StaticMemoryProbe {
    free_bytes: AtomicU64,
    total_bytes: u64,
}

impl StaticMemoryProbe {
    pub fn new(free_bytes: u64, total_bytes: u64) -> Self {
        Self {
            free_bytes: AtomicU64::new(free_bytes),
            total_bytes,
        }
    }

    pub fn set_free_bytes(&self, free_bytes: u64) {
        self.free_bytes.store(free_bytes, Ordering::SeqCst);
    }
}

#[async_trait]
impl MemoryProbe for StaticMemoryProbe {
    async fn sample(&self) -> Result<MemorySample> {
        Ok(MemorySample {
            free_bytes: self.free_bytes.load(Ordering::SeqCst),
            total_bytes: self.total_bytes,
        })
    }
}

/// A `RunTaskFunction` whose behavior is scripted by call count: produces
/// tasks that sleep for `task_duration` before resolving, up to `max_tasks`
/// (then reports "no task ready" forever), optionally failing on a specific
/// call number.
pub struct ScriptedRunTask {
    calls: AtomicU64,
    task_duration: Duration,
    max_tasks: Option<u64>,
    fail_on_call: Option<u64>,
}

impl ScriptedRunTask {
    pub fn unbounded(task_duration: Duration) -> Self {
        Self {
            calls: AtomicU64::new(0),
            task_duration,
            max_tasks: None,
            fail_on_call: None,
        }
    }

    pub fn never_ready() -> Self {
        Self {
            calls: AtomicU64::new(0),
            task_duration: Duration::from_millis(0),
            max_tasks: Some(0),
            fail_on_call: None,
        }
    }

    pub fn failing_on_call(task_duration: Duration, fail_on_call: u64) -> Self {
        Self {
            calls: AtomicU64::new(0),
            task_duration,
            max_tasks: None,
            fail_on_call: Some(fail_on_call),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunTaskFunction for ScriptedRunTask {
    async fn run_task(&self) -> Result<Option<BoxFuture<'static, Result<()>>>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_on_call == Some(n) {
            return Err(PoolError::TaskFailed(anyhow::anyhow!(
                "scripted task failure on call {n}"
            )));
        }
        if let Some(max) = self.max_tasks {
            if n > max {
                return Ok(None);
            }
        }

        let dur = self.task_duration;
        let fut: BoxFuture<'static, Result<()>> = Box::pin(async move {
            tokio::time::sleep(dur).await;
            Ok(())
        });
        Ok(Some(fut))
    }
}

/// An `IsFinishedFunction` that starts `false` and flips to `true` once told to.
pub struct ToggleFinished {
    finished: AtomicBool,
}

impl ToggleFinished {
    pub fn new() -> Self {
        Self {
            finished: AtomicBool::new(false),
        }
    }

    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IsFinishedFunction for ToggleFinished {
    async fn is_finished(&self) -> Result<bool> {
        Ok(self.finished.load(Ordering::SeqCst))
    }
}

/// An `IsTaskReadyFunction` that is always ready; exists so tests can be
/// explicit about the default rather than relying on `None`.
pub struct AlwaysReady;

#[async_trait]
impl IsTaskReadyFunction for AlwaysReady {
    async fn is_task_ready(&self) -> Result<bool> {
        Ok(true)
    }
}
