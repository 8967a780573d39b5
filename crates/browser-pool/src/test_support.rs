//! Test doubles for `BrowserLauncher`/`Browser`/`Tab`, kept alongside the
//! code they exercise rather than in a separate integration suite, since
//! `BrowserPool` has no external process boundary worth integration-testing
//! against (SPEC_FULL.md §8, "AMBIENT — test tooling").

use crate::traits::{Browser, BrowserLauncher, Tab};
use async_trait::async_trait;
use pool_support::{OsProcessHandle, PoolError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

type Result<T> = std::result::Result<T, PoolError>;

struct FakeTabInner {
    id: String,
    crashed_tx: broadcast::Sender<()>,
    close_calls: AtomicUsize,
}

#[derive(Clone)]
pub struct FakeTab {
    inner: Arc<FakeTabInner>,
}

impl FakeTab {
    pub fn new(id: impl Into<String>) -> Self {
        let (crashed_tx, _) = broadcast::channel(4);
        Self {
            inner: Arc::new(FakeTabInner {
                id: id.into(),
                crashed_tx,
                close_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn fire_crashed(&self) {
        let _ = self.inner.crashed_tx.send(());
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tab for FakeTab {
    fn id(&self) -> &str {
        &self.inner.id
    }

    async fn close(&self) -> Result<()> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe_crashed(&self) -> broadcast::Receiver<()> {
        self.inner.crashed_tx.subscribe()
    }
}

struct FakeBrowserInner {
    page_count: AtomicUsize,
    disconnect_tx: broadcast::Sender<()>,
    destroyed_tx: broadcast::Sender<()>,
    close_calls: AtomicUsize,
    pages_should_error: AtomicBool,
    new_page_should_error: AtomicBool,
    process_handle: Option<OsProcessHandle>,
}

#[derive(Clone)]
pub struct FakeBrowser {
    inner: Arc<FakeBrowserInner>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        let (disconnect_tx, _) = broadcast::channel(4);
        let (destroyed_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(FakeBrowserInner {
                page_count: AtomicUsize::new(0),
                disconnect_tx,
                destroyed_tx,
                close_calls: AtomicUsize::new(0),
                pages_should_error: AtomicBool::new(false),
                new_page_should_error: AtomicBool::new(false),
                process_handle: Some(OsProcessHandle::from_pid(4242)),
            }),
        }
    }

    pub fn fire_disconnect(&self) {
        let _ = self.inner.disconnect_tx.send(());
    }

    pub fn fire_target_destroyed(&self) {
        let _ = self.inner.destroyed_tx.send(());
    }

    pub fn set_pages_error(&self, should_error: bool) {
        self.inner.pages_should_error.store(should_error, Ordering::SeqCst);
    }

    pub fn set_new_page_error(&self, should_error: bool) {
        self.inner
            .new_page_should_error
            .store(should_error, Ordering::SeqCst);
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn Tab>> {
        if self.inner.new_page_should_error.load(Ordering::SeqCst) {
            return Err(PoolError::Transient("new_page failed".into()));
        }
        let n = self.inner.page_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeTab::new(format!("tab-{n}"))))
    }

    async fn pages(&self) -> Result<usize> {
        if self.inner.pages_should_error.load(Ordering::SeqCst) {
            return Err(PoolError::Transient("pages() probe failed".into()));
        }
        Ok(self.inner.page_count.load(Ordering::SeqCst))
    }

    async fn close(&self) -> Result<()> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe_disconnect(&self) -> broadcast::Receiver<()> {
        self.inner.disconnect_tx.subscribe()
    }

    fn subscribe_target_destroyed(&self) -> broadcast::Receiver<()> {
        self.inner.destroyed_tx.subscribe()
    }

    fn process_handle(&self) -> Option<OsProcessHandle> {
        self.inner.process_handle
    }
}

enum Outcome {
    Ok(FakeBrowser),
    Err(String),
}

/// A `BrowserLauncher` whose outcomes are scripted in advance; falls back to
/// launching a fresh healthy `FakeBrowser` once the script is exhausted.
pub struct ScriptedLauncher {
    outcomes: Mutex<VecDeque<Outcome>>,
    launched: Mutex<Vec<FakeBrowser>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            launched: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_ok(&self, browser: FakeBrowser) {
        self.outcomes.lock().unwrap().push_back(Outcome::Ok(browser));
    }

    pub fn queue_failure(&self, message: impl Into<String>) {
        self.outcomes.lock().unwrap().push_back(Outcome::Err(message.into()));
    }

    pub fn launched_browsers(&self) -> Vec<FakeBrowser> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>> {
        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(Outcome::Err(message)) => Err(PoolError::LaunchFailed(message)),
            Some(Outcome::Ok(browser)) => {
                self.launched.lock().unwrap().push(browser.clone());
                Ok(Box::new(browser))
            }
            None => {
                let browser = FakeBrowser::new();
                self.launched.lock().unwrap().push(browser.clone());
                Ok(Box::new(browser))
            }
        }
    }
}
