use async_trait::async_trait;
use pool_support::{OsProcessHandle, PoolError};
use tokio::sync::broadcast;

type Result<T> = std::result::Result<T, PoolError>;

/// External collaborator: spec §6 `BrowserLauncher` — `launch(config) -> Future<Browser>`.
///
/// Grounded in `riptide-browser::abstraction::traits::BrowserEngine`: a trait
/// with no concrete CDP type in its signature, so `BrowserPool` never knows
/// (or needs a feature flag to know) whether it's driving `spider_chrome`,
/// chromiumoxide, or a test fake.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>>;
}

/// A live browser process: one `Instance`'s `browserHandle` once resolved.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new logical tab.
    async fn new_page(&self) -> Result<Box<dyn Tab>>;

    /// Number of currently open tabs, for the reaper's tab-count check.
    async fn pages(&self) -> Result<usize>;

    /// Cooperative shutdown.
    async fn close(&self) -> Result<()>;

    /// Fires once when the browser process disconnects unexpectedly.
    fn subscribe_disconnect(&self) -> broadcast::Receiver<()>;

    /// Fires once per tab closed, anywhere in this browser (spec: `targetdestroyed`).
    fn subscribe_target_destroyed(&self) -> broadcast::Receiver<()>;

    /// The OS process backing this browser, if one was recorded at launch time.
    fn process_handle(&self) -> Option<OsProcessHandle>;
}

/// A logical tab/page inside a `Browser`.
#[async_trait]
pub trait Tab: Send + Sync {
    fn id(&self) -> &str;

    async fn close(&self) -> Result<()>;

    /// Fires if the tab's renderer process crashes; `BrowserPool` subscribes
    /// to this to implement spec §4.1 newPage step 6 ("attach a per-tab error
    /// observer that closes the tab on crash").
    fn subscribe_crashed(&self) -> broadcast::Receiver<()>;
}
