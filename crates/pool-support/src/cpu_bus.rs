use tokio::sync::broadcast;

/// A single `cpuInfo` event from spec §6: "`CpuEventBus` — publish/subscribe
/// for events named `cpuInfo` carrying `{isCpuOverloaded: bool}`."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuInfo {
    pub is_cpu_overloaded: bool,
}

/// Process-wide CPU overload signal bus.
///
/// Grounded in `riptide-events::bus::EventBus`, trimmed to the one event type
/// this system needs: a `broadcast` channel rather than that crate's
/// handler-registry/routing machinery, since every `AutoscaledPool` instance
/// just wants its own receiver appending into its own ring (spec §9,
/// "Process-wide event bus" design note — each pool must remove exactly its
/// own listener on destroy, which dropping a `broadcast::Receiver` does for
/// free).
#[derive(Clone)]
pub struct CpuEventBus {
    sender: broadcast::Sender<CpuInfo>,
}

impl CpuEventBus {
    pub fn new() -> Self {
        // Capacity is generous relative to consumption cadence (pools drain
        // on every MEM_CHECK_INTERVAL_MILLIS tick); a lagged subscriber just
        // skips ahead rather than blocking publishers.
        let (sender, _receiver) = broadcast::channel(64);
        Self { sender }
    }

    pub fn publish(&self, info: CpuInfo) {
        // No subscribers is not an error: matches the teacher's pattern of
        // ignoring `send` errors on fire-and-forget event channels.
        let _ = self.sender.send(info);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CpuInfo> {
        self.sender.subscribe()
    }
}

impl Default for CpuEventBus {
    fn default() -> Self {
        Self::new()
    }
}
