use crate::traits::Tab;
use pool_support::PoolError;
use std::sync::Arc;
use tracing::debug;

type Result<T> = std::result::Result<T, PoolError>;

/// A tab leased from a `BrowserPool` (spec §4.1, `newPage`'s return value).
///
/// On construction, spawns the "per-tab error observer that closes the tab
/// on crash" called for in spec §4.1 newPage step 6.
pub struct LeasedTab {
    instance_id: u64,
    tab: Arc<dyn Tab>,
}

impl LeasedTab {
    pub(crate) fn new(instance_id: u64, tab: Arc<dyn Tab>) -> Self {
        let watched = tab.clone();
        let mut crashed_rx = tab.subscribe_crashed();
        tokio::spawn(async move {
            if crashed_rx.recv().await.is_ok() {
                debug!(tab_id = %watched.id(), "tab crashed, closing");
                let _ = watched.close().await;
            }
        });

        Self { instance_id, tab }
    }

    /// The `BrowserPool` instance this tab was leased from.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn id(&self) -> &str {
        self.tab.id()
    }

    pub async fn close(&self) -> Result<()> {
        self.tab.close().await
    }
}
