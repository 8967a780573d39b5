use crate::test_support::{FakeBrowser, ScriptedLauncher};
use crate::{BrowserPool, BrowserPoolConfig};
use std::sync::Arc;
use std::time::Duration;

async fn let_actor_catch_up() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Scenario 1, "Retire by usage": `maxOpenPagesPerInstance=2`,
/// `abortInstanceAfterRequestCount=3`, four `newPage` calls.
#[tokio::test]
async fn retire_by_usage() {
    let config = BrowserPoolConfig {
        max_open_pages_per_instance: 2,
        abort_instance_after_request_count: 3,
        ..BrowserPoolConfig::default()
    };
    let launcher = Arc::new(ScriptedLauncher::new());
    let pool = BrowserPool::new(config, launcher.clone());

    for _ in 0..4 {
        pool.new_page().await.expect("new_page should succeed");
    }

    let stats = pool.stats().await;
    assert_eq!(stats.active_instances, 1);
    assert_eq!(stats.retired_instances, 1);
    assert_eq!(launcher.launched_browsers().len(), 2);
}

/// Scenario 2, "Kill idle retired": a retired instance past
/// `killInstanceAfterMillis` is reaped and its browser closed exactly once.
#[tokio::test(start_paused = true)]
async fn kill_idle_retired_instance() {
    let config = BrowserPoolConfig {
        abort_instance_after_request_count: 1,
        instance_killer_interval: Duration::from_millis(50),
        kill_instance_after: Duration::from_millis(100),
        ..BrowserPoolConfig::default()
    };
    let launcher = Arc::new(ScriptedLauncher::new());
    let pool = BrowserPool::new(config, launcher.clone());

    let tab = pool.new_page().await.expect("new_page should succeed");
    tab.close().await.expect("tab close should succeed");

    // abortInstanceAfterRequestCount=1 retires the instance synchronously.
    let stats = pool.stats().await;
    assert_eq!(stats.active_instances, 0);
    assert_eq!(stats.retired_instances, 1);

    let browser = launcher
        .launched_browsers()
        .into_iter()
        .next()
        .expect("one browser should have been launched");

    tokio::time::advance(Duration::from_millis(250)).await;
    let_actor_catch_up().await;

    let stats = pool.stats().await;
    assert_eq!(stats.retired_instances, 0, "idle-past-deadline instance should be reaped");
    assert_eq!(browser.close_calls(), 1);
}

/// Scenario 3, "Disconnect path": an unexpected `disconnected` event retires
/// the instance even though no usage/age threshold was crossed.
#[tokio::test]
async fn disconnect_retires_instance() {
    let config = BrowserPoolConfig::default();
    let launcher = Arc::new(ScriptedLauncher::new());
    let pool = BrowserPool::new(config, launcher.clone());

    let _tab = pool.new_page().await.expect("new_page should succeed");
    let_actor_catch_up().await;

    let browser = launcher
        .launched_browsers()
        .into_iter()
        .next()
        .expect("one browser should have been launched");
    browser.fire_disconnect();
    let_actor_catch_up().await;

    let stats = pool.stats().await;
    assert_eq!(stats.active_instances, 0);
    assert_eq!(stats.retired_instances, 1);
}

/// Spec §8 invariant: a single `newPage` failure retires exactly one instance.
#[tokio::test]
async fn new_page_failure_retires_single_instance() {
    let config = BrowserPoolConfig::default();
    let launcher = Arc::new(ScriptedLauncher::new());
    let browser = FakeBrowser::new();
    browser.set_new_page_error(true);
    launcher.queue_ok(browser);
    let pool = BrowserPool::new(config, launcher.clone());

    let result = pool.new_page().await;
    assert!(result.is_err());

    let stats = pool.stats().await;
    assert_eq!(stats.active_instances, 0);
    assert_eq!(stats.retired_instances, 1);
}

/// Spec §8 invariant: a launch failure also retires exactly one instance, and
/// the caller sees the failure (error-handling kind 2, operational fault).
#[tokio::test]
async fn launch_failure_retires_instance_and_surfaces_error() {
    let config = BrowserPoolConfig::default();
    let launcher = Arc::new(ScriptedLauncher::new());
    launcher.queue_failure("no display available");
    let pool = BrowserPool::new(config, launcher.clone());

    let result = pool.new_page().await;
    assert!(result.is_err());

    let stats = pool.stats().await;
    assert_eq!(stats.active_instances, 0);
    assert_eq!(stats.retired_instances, 1);
}

/// Spec §4.1 `destroy`: idempotent, never rejects, and leaves the pool empty.
#[tokio::test]
async fn destroy_is_idempotent_and_never_rejects() {
    let config = BrowserPoolConfig::default();
    let launcher = Arc::new(ScriptedLauncher::new());
    let pool = BrowserPool::new(config, launcher);

    let _tab = pool.new_page().await.expect("new_page should succeed");

    pool.destroy().await;
    pool.destroy().await;

    let stats = pool.stats().await;
    assert_eq!(stats.active_instances, 0);
    assert_eq!(stats.retired_instances, 0);
}

/// `totalPages` is monotone and never decreases across grants to the same
/// instance, even once it has been retired (spec §8).
#[tokio::test]
async fn total_pages_is_monotone_non_decreasing() {
    let config = BrowserPoolConfig {
        max_open_pages_per_instance: 10,
        abort_instance_after_request_count: 10_000,
        ..BrowserPoolConfig::default()
    };
    let launcher = Arc::new(ScriptedLauncher::new());
    let pool = BrowserPool::new(config, launcher);

    let mut seen = 0u64;
    for _ in 0..5 {
        pool.new_page().await.expect("new_page should succeed");
        let stats = pool.stats().await;
        assert!(stats.total_pages_opened >= seen);
        seen = stats.total_pages_opened;
    }
    assert_eq!(seen, 5);
}

/// Eagerly-launched instances (`initial_pool_size`) are available for
/// `newPage` without forcing a fresh launch.
#[tokio::test]
async fn initial_pool_size_launches_eagerly() {
    let config = BrowserPoolConfig {
        initial_pool_size: 2,
        ..BrowserPoolConfig::default()
    };
    let launcher = Arc::new(ScriptedLauncher::new());
    let pool = BrowserPool::new(config, launcher.clone());
    let_actor_catch_up().await;

    let stats = pool.stats().await;
    assert_eq!(stats.active_instances, 2);

    pool.new_page().await.expect("new_page should succeed");
    assert_eq!(launcher.launched_browsers().len(), 2, "reused an eagerly-launched instance");
}
