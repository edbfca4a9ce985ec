//! Periodic TTL eviction for a `DbStore`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use super::DbStore;

/// Evict once immediately, then every `interval` until `shutdown` resolves.
///
/// The startup pass clears entries that aged out while the process was down.
/// Each pass runs on the blocking pool; a pass already in flight when
/// shutdown fires is allowed to finish.
pub async fn run_evictor<F>(store: Arc<DbStore>, interval: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    info!(interval_secs = interval.as_secs(), "Evictor started");

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let store = store.clone();
                if let Err(err) = tokio::task::spawn_blocking(move || store.evict()).await {
                    error!(%err, "Eviction task panicked");
                }
            }
        }
    }

    info!("Evictor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Label, MetricSample, Record};
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_startup_eviction_runs_before_first_interval() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(DbStore::open(temp_dir.path(), Duration::from_millis(1)).unwrap());

        let key = store
            .write_signal(&Record::Metric(MetricSample {
                labels: vec![Label::new("__name__", "up")],
                timestamp_ms: 0,
                value: 1.0,
            }))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(run_evictor(
            store.clone(),
            Duration::from_secs(3600),
            async move {
                let _ = rx.await;
            },
        ));

        for _ in 0..100 {
            if store.metrics().evictions.count > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(store.get_signal(key), None);
        assert_eq!(store.metrics().evictions.count, 1);
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(DbStore::open(temp_dir.path(), Duration::from_secs(60)).unwrap());

        time::timeout(
            Duration::from_secs(5),
            run_evictor(store, Duration::from_millis(5), async {
                time::sleep(Duration::from_millis(30)).await;
            }),
        )
        .await
        .unwrap();
    }
}
