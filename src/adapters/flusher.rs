//! Periodic result flushing
//!
//! Buffers results coming out of the pipeline and hands them to a
//! [`ResultSink`] in batches: once per interval, immediately when shutdown is
//! raised, and a final time when the result channel closes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::domain::{DispatchOutcome, DispatchResult, ResultSink};

/// Counters reported when the flusher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub batches: usize,
    pub results: usize,
}

pub struct ResultFlusher {
    interval: Duration,
    sink: Arc<dyn ResultSink>,
}

impl ResultFlusher {
    pub fn new(interval: Duration, sink: Arc<dyn ResultSink>) -> Self {
        Self { interval, sink }
    }

    /// Start flushing in the background until `results` closes.
    pub fn spawn(
        self,
        results: mpsc::Receiver<DispatchResult>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<FlushStats> {
        tokio::spawn(async move { self.run(results, shutdown).await })
    }

    async fn run(
        self,
        mut results: mpsc::Receiver<DispatchResult>,
        mut shutdown: watch::Receiver<bool>,
    ) -> FlushStats {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        let mut buffer = Vec::new();
        let mut stats = FlushStats::default();
        let mut watching = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush(&mut buffer, &mut stats).await;
                }
                received = results.recv() => match received {
                    Some(result) => buffer.push(result),
                    None => {
                        debug!("Result channel closed");
                        break;
                    }
                },
                changed = shutdown.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    let stopping = *shutdown.borrow();
                    if stopping {
                        // results still arrive until the pipeline has drained
                        while let Ok(result) = results.try_recv() {
                            buffer.push(result);
                        }
                        info!("Shutdown requested, flushing buffered results");
                        self.flush(&mut buffer, &mut stats).await;
                        watching = false;
                    }
                }
            }
        }

        self.flush(&mut buffer, &mut stats).await;
        info!(
            "Flushed {} results in {} batches",
            stats.results, stats.batches
        );
        stats
    }

    async fn flush(&self, buffer: &mut Vec<DispatchResult>, stats: &mut FlushStats) {
        if buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(buffer);
        match self.sink.flush(&batch).await {
            Ok(()) => {
                stats.batches += 1;
                stats.results += batch.len();
            }
            Err(e) => error!("Failed to flush {} results: {}", batch.len(), e),
        }
    }
}

/// Sink that reports each batch through `tracing`.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn flush(&self, batch: &[DispatchResult]) -> anyhow::Result<()> {
        let succeeded = batch.iter().filter(|r| r.is_success()).count();
        info!(
            "Flushing batch of {} results ({} with a response)",
            batch.len(),
            succeeded
        );
        for result in batch {
            match &result.outcome {
                DispatchOutcome::Success { .. } => debug!(
                    operation = %result.operation,
                    status = result.status.unwrap_or_default(),
                    "response recorded"
                ),
                DispatchOutcome::Failed { kind, message } => {
                    info!(operation = %result.operation, kind = %kind, "{}", message)
                }
                DispatchOutcome::Cancelled => debug!(operation = %result.operation, "cancelled"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationKey;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        batches: Mutex<Vec<Vec<DispatchResult>>>,
    }

    #[async_trait]
    impl ResultSink for CollectingSink {
        async fn flush(&self, batch: &[DispatchResult]) -> anyhow::Result<()> {
            self.batches.lock().unwrap().push(batch.to_vec());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl ResultSink for FailingSink {
        async fn flush(&self, _batch: &[DispatchResult]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    fn result(route: &str) -> DispatchResult {
        DispatchResult::cancelled(OperationKey {
            route: route.to_string(),
            method: "GET".to_string(),
        })
    }

    #[tokio::test]
    async fn test_final_flush_when_channel_closes() {
        let sink = Arc::new(CollectingSink::default());
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = ResultFlusher::new(Duration::from_secs(3600), sink.clone())
            .spawn(rx, shutdown_rx);
        for route in ["/a", "/b", "/c"] {
            tx.send(result(route)).await.unwrap();
        }
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats, FlushStats { batches: 1, results: 3 });
        assert_eq!(sink.batches.lock().unwrap()[0].len(), 3);
    }

    #[tokio::test]
    async fn test_flushes_on_interval() {
        let sink = Arc::new(CollectingSink::default());
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = ResultFlusher::new(Duration::from_millis(20), sink.clone())
            .spawn(rx, shutdown_rx);
        tx.send(result("/a")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(result("/b")).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats.results, 2);
        assert_eq!(stats.batches, 2);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_immediately() {
        let sink = Arc::new(CollectingSink::default());
        let (tx, rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = ResultFlusher::new(Duration::from_secs(3600), sink.clone())
            .spawn(rx, shutdown_rx);
        tx.send(result("/a")).await.unwrap();
        tx.send(result("/b")).await.unwrap();
        shutdown_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.batches.lock().unwrap().len(), 1);

        // cancelled results emitted after shutdown still reach the sink
        tx.send(result("/c")).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats, FlushStats { batches: 2, results: 3 });
    }

    #[tokio::test]
    async fn test_sink_errors_do_not_stop_the_flusher() {
        let (tx, rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = ResultFlusher::new(Duration::from_secs(3600), Arc::new(FailingSink))
            .spawn(rx, shutdown_rx);
        tx.send(result("/a")).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats, FlushStats::default());
    }

    #[tokio::test]
    async fn test_log_sink_accepts_every_outcome() {
        let key = OperationKey {
            route: "/pets".to_string(),
            method: "POST".to_string(),
        };
        let batch = vec![
            DispatchResult::from_response(
                key.clone(),
                Ok(crate::domain::DispatchResponse {
                    status: 201,
                    body: String::new(),
                }),
                Duration::from_millis(3),
            ),
            DispatchResult::from_response(
                key.clone(),
                Err(crate::domain::ProbeError::Transport("refused".to_string())),
                Duration::ZERO,
            ),
            DispatchResult::cancelled(key),
        ];
        assert!(LogSink.flush(&batch).await.is_ok());
    }
}
