use crate::error::{PoolError, Result};
use async_trait::async_trait;

/// One memory sample: free and total bytes, system-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

/// External collaborator: `MemoryProbe` from spec §6.
///
/// `sample()` is async because real implementations (below) refresh OS
/// counters, which can block; `AutoscaledPool`'s tick awaits it and treats a
/// failure as a skipped tick (spec §4.2, "On MemoryProbe failure").
#[async_trait]
pub trait MemoryProbe: Send + Sync {
    async fn sample(&self) -> Result<MemorySample>;
}

/// `MemoryProbe` backed by `sysinfo`, following the pattern in
/// `riptide-core/src/monitoring/collector.rs::get_memory_usage`: build a
/// fresh `System`, refresh just the memory counters, read total/available.
///
/// sysinfo reports memory in KB; values here are converted to bytes so callers
/// never have to know the library's unit convention.
pub struct SystemMemoryProbe {
    /// Optional cap on `total_bytes`, mirroring `maxMemoryMbytes` (spec §4.2
    /// config table) — applied here rather than in `AutoscaledPool` so the
    /// probe and its cap travel together.
    max_total_bytes: Option<u64>,
}

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self {
            max_total_bytes: None,
        }
    }

    pub fn with_max_total_mbytes(max_mbytes: u64) -> Self {
        Self {
            max_total_bytes: Some(max_mbytes * 1024 * 1024),
        }
    }
}

impl Default for SystemMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryProbe for SystemMemoryProbe {
    async fn sample(&self) -> Result<MemorySample> {
        // sysinfo's refresh is synchronous and touches /proc; run it on the
        // blocking pool so the tick timer never stalls behind it.
        let max_total_bytes = self.max_total_bytes;
        tokio::task::spawn_blocking(move || {
            let mut sys = sysinfo::System::new();
            sys.refresh_memory();

            let total_bytes = sys.total_memory() * 1024;
            let free_bytes = sys.available_memory() * 1024;

            let total_bytes = match max_total_bytes {
                Some(cap) => total_bytes.min(cap),
                None => total_bytes,
            };
            let free_bytes = free_bytes.min(total_bytes);

            MemorySample {
                free_bytes,
                total_bytes,
            }
        })
        .await
        .map_err(|e| PoolError::Transient(format!("memory probe task panicked: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_probe_reports_plausible_sample() {
        let probe = SystemMemoryProbe::new();
        let sample = probe.sample().await.unwrap();
        assert!(sample.total_bytes > 0);
        assert!(sample.free_bytes <= sample.total_bytes);
    }

    #[tokio::test]
    async fn max_total_mbytes_clamps_total() {
        let probe = SystemMemoryProbe::with_max_total_mbytes(1);
        let sample = probe.sample().await.unwrap();
        assert_eq!(sample.total_bytes, 1024 * 1024);
        assert!(sample.free_bytes <= sample.total_bytes);
    }
}
