// Background loop keeping the per-source fact cache warm.
use crate::screening::Screener;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};

/// Refreshes every source, then waits for the interval or a manual trigger.
/// With an interval of 0 only manual triggers start a refresh.
pub fn spawn_refresher(
    screener: Arc<Screener>,
    interval_seconds: u64,
    refresh_notify: Arc<Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interval_seconds == 0 {
            info!("Periodic refresh disabled; waiting for manual refreshes.");
            refresh_notify.notified().await;
        }

        loop {
            info!("Refreshing information sources...");
            match screener.refresh_all().await {
                Ok(summary) => info!(
                    "Refresh done: {} sources, {} live, {} cached, {} failed, {} facts",
                    summary.sources, summary.live, summary.cached, summary.failed, summary.facts
                ),
                Err(e) => warn!("Refresh failed: {}", e),
            }

            if interval_seconds == 0 {
                refresh_notify.notified().await;
                info!("Manual refresh triggered.");
                continue;
            }

            info!("Waiting for timer ({}s) or manual refresh...", interval_seconds);
            tokio::select! {
                _ = sleep(Duration::from_secs(interval_seconds)) => {
                    info!("Timer triggered.");
                }
                _ = refresh_notify.notified() => {
                    info!("Manual refresh triggered.");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewInfoSource;
    use crate::screening::tests::{MINISTERS_PAGE, MINISTERS_URL, StubFetcher, screener, storage};

    #[tokio::test]
    async fn manual_trigger_fills_the_fact_cache() {
        let (dir, storage) = storage();
        let source = storage
            .lock()
            .await
            .add_source(
                &NewInfoSource {
                    title: "Governo".into(),
                    category: "governo_ministro".into(),
                    url: Some(MINISTERS_URL.into()),
                    ..Default::default()
                },
                dir.path(),
            )
            .unwrap();
        let fetcher = Arc::new(StubFetcher::default().with_page(MINISTERS_URL, MINISTERS_PAGE));
        let screener = Arc::new(screener(fetcher, storage.clone()));
        let notify = Arc::new(Notify::new());

        let handle = spawn_refresher(screener, 0, notify.clone());
        assert!(storage.lock().await.cached_facts(source.id).unwrap().is_empty());

        notify.notify_one();
        let mut cached = 0;
        for _ in 0..50 {
            cached = storage.lock().await.cached_facts(source.id).unwrap().len();
            if cached > 0 {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        handle.abort();
        assert_eq!(cached, 2);
    }
}
