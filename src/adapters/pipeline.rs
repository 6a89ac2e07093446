//! Bounded-concurrency dispatch pipeline
//!
//! Each run spawns a pool of at most `concurrency_limit` workers that pull
//! operations from a shared queue. Concurrency tokens belong to the pipeline,
//! not the run: a worker holds one token while it prepares the payload *and*
//! performs the HTTP call, so the limit bounds network concurrency across
//! every run sharing the pipeline. Results funnel through a single channel
//! into one consumer, which records them in arrival order and forwards them
//! to the optional result sink.
//!
//! # Lifecycle of an operation
//!
//! `Pending → TokenAcquired → Enqueued → Dispatched → Completed`
//!
//! An operation that never leaves `Pending` before shutdown, or whose worker is
//! aborted after the shutdown timeout, is reported as `Cancelled`. Every
//! operation handed to [`DispatchPipeline::run`] yields exactly one
//! [`DispatchResult`].
//!
//! # Shutdown
//!
//! Raising the `watch` shutdown signal stops workers from pulling new
//! operations. In-flight requests get `shutdown_timeout` to finish; after that
//! the worker tasks are aborted.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::request_builder::prepare_request;
use super::synthesizer::DEFAULT_MAX_DEPTH;
use crate::domain::{
    Definitions, DispatchPhase, DispatchResult, OperationDescriptor, OperationKey,
    RequestDispatcher,
};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub concurrency_limit: usize,
    pub max_schema_depth: usize,
    pub shutdown_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            max_schema_depth: DEFAULT_MAX_DEPTH,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

pub struct DispatchPipeline {
    dispatcher: Arc<dyn RequestDispatcher>,
    definitions: Arc<Definitions>,
    settings: PipelineSettings,
    tokens: Arc<Semaphore>,
    sink: Option<mpsc::Sender<DispatchResult>>,
}

impl DispatchPipeline {
    pub fn new(
        dispatcher: Arc<dyn RequestDispatcher>,
        definitions: Arc<Definitions>,
        settings: PipelineSettings,
    ) -> Self {
        let tokens = Arc::new(Semaphore::new(settings.concurrency_limit.max(1)));
        Self {
            dispatcher,
            definitions,
            settings,
            tokens,
            sink: None,
        }
    }

    /// Forward every result to `sink` as it is recorded.
    pub fn with_sink(mut self, sink: mpsc::Sender<DispatchResult>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Dispatch every operation and return one result per operation.
    pub async fn run(&self, operations: Vec<OperationDescriptor>) -> Vec<DispatchResult> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        self.run_until(operations, shutdown_rx).await
    }

    /// Like [`run`](Self::run), but stops early once `shutdown` turns `true`.
    pub async fn run_until(
        &self,
        operations: Vec<OperationDescriptor>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Vec<DispatchResult> {
        let run_id = Uuid::new_v4();
        let limit = self.settings.concurrency_limit.max(1);
        let expected: Vec<OperationKey> = operations.iter().map(OperationDescriptor::key).collect();
        info!(
            %run_id,
            "Dispatching {} operations with concurrency limit {}",
            expected.len(),
            limit
        );

        let (results_tx, results_rx) = mpsc::channel(limit * 2);
        let consumer = tokio::spawn(consume_results(results_rx, self.sink.clone(), expected.len()));

        let ctx = WorkerContext {
            queue: Arc::new(Mutex::new(VecDeque::from(operations))),
            tokens: self.tokens.clone(),
            results: results_tx,
            dispatcher: self.dispatcher.clone(),
            definitions: self.definitions.clone(),
            max_schema_depth: self.settings.max_schema_depth,
            shutdown: shutdown.clone(),
        };
        let workers = spawn_workers(ctx, limit.min(expected.len()));
        let abort_handles: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();

        let mut all_workers = Box::pin(join_all(workers));
        let joined = tokio::select! {
            joined = &mut all_workers => joined,
            _ = cancelled(&mut shutdown) => {
                info!(%run_id, "Shutdown requested, draining in-flight operations");
                let timeout = self.settings.shutdown_timeout;
                match tokio::time::timeout(timeout, &mut all_workers).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(%run_id, "In-flight operations did not finish within {:?}, aborting", timeout);
                        abort_handles.iter().for_each(|handle| handle.abort());
                        all_workers.await
                    }
                }
            }
        };
        log_worker_failures(run_id, &joined);

        let mut results = match consumer.await {
            Ok(results) => results,
            Err(e) => {
                error!(%run_id, "Result consumer failed: {}", e);
                Vec::new()
            }
        };

        let seen: HashSet<&OperationKey> = results.iter().map(|r| &r.operation).collect();
        let missing: Vec<OperationKey> = expected
            .iter()
            .filter(|key| !seen.contains(key))
            .cloned()
            .collect();
        for key in missing {
            debug!(%run_id, operation = %key, phase = %DispatchPhase::Cancelled);
            let result = DispatchResult::cancelled(key);
            if let Some(sink) = &self.sink {
                if sink.send(result.clone()).await.is_err() {
                    debug!("Result sink closed");
                }
            }
            results.push(result);
        }

        info!(%run_id, "Pipeline finished with {} results", results.len());
        results
    }
}

/// Aborted workers are expected after a shutdown timeout; anything else
/// (a panic) is reported.
fn log_worker_failures(run_id: Uuid, joined: &[Result<(), JoinError>]) {
    for (worker, outcome) in joined.iter().enumerate() {
        if let Err(e) = outcome {
            if !e.is_cancelled() {
                error!(%run_id, worker, "Worker failed: {}", e);
            }
        }
    }
}

/// Resolves once the shutdown flag is raised. A dropped sender never cancels.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let raised = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !raised {
        std::future::pending::<()>().await;
    }
}

#[derive(Clone)]
struct WorkerContext {
    queue: Arc<Mutex<VecDeque<OperationDescriptor>>>,
    tokens: Arc<Semaphore>,
    results: mpsc::Sender<DispatchResult>,
    dispatcher: Arc<dyn RequestDispatcher>,
    definitions: Arc<Definitions>,
    max_schema_depth: usize,
    shutdown: watch::Receiver<bool>,
}

fn spawn_workers(ctx: WorkerContext, workers: usize) -> Vec<JoinHandle<()>> {
    (0..workers)
        .map(|worker| {
            let ctx = ctx.clone();
            tokio::spawn(async move { worker_loop(worker, ctx).await })
        })
        .collect()
}

async fn worker_loop(worker: usize, ctx: WorkerContext) {
    loop {
        let stopping = *ctx.shutdown.borrow();
        if stopping {
            debug!(worker, "Worker stopping on shutdown");
            break;
        }
        let Some(operation) = ctx.queue.lock().await.pop_front() else {
            break;
        };
        let key = operation.key();
        debug!(worker, operation = %key, phase = %DispatchPhase::Pending);

        let Ok(permit) = ctx.tokens.clone().acquire_owned().await else {
            break;
        };
        debug!(worker, operation = %key, phase = %DispatchPhase::TokenAcquired);

        let result = process(&ctx, &operation).await;
        drop(permit);

        debug!(worker, operation = %key, phase = %DispatchPhase::Completed);
        if ctx.results.send(result).await.is_err() {
            break;
        }
    }
}

async fn process(ctx: &WorkerContext, operation: &OperationDescriptor) -> DispatchResult {
    let key = operation.key();
    let started = Instant::now();

    let response = match prepare_request(operation, &ctx.definitions, ctx.max_schema_depth) {
        Ok(request) => {
            debug!(operation = %key, phase = %DispatchPhase::Enqueued, has_payload = request.payload.is_some());
            if let Some(payload) = &request.payload {
                debug!(operation = %key, "Payload: {}", payload);
            }
            debug!(operation = %key, phase = %DispatchPhase::Dispatched);
            ctx.dispatcher.dispatch(request).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &response {
        warn!("Operation {} failed: {}", key, e);
    }
    DispatchResult::from_response(key, response, started.elapsed())
}

/// Single consumer: records results in arrival order and forwards them.
async fn consume_results(
    mut results: mpsc::Receiver<DispatchResult>,
    mut sink: Option<mpsc::Sender<DispatchResult>>,
    expected: usize,
) -> Vec<DispatchResult> {
    let mut recorded = Vec::with_capacity(expected);

    while let Some(result) = results.recv().await {
        match result.status {
            Some(status) => info!(
                "Response for {}: {} ({} ms)",
                result.operation,
                status,
                result.elapsed.as_millis()
            ),
            None => debug!("No response for {}", result.operation),
        }

        if let Some(tx) = &sink {
            if tx.send(result.clone()).await.is_err() {
                warn!("Result sink closed, further results are kept in memory only");
                sink = None;
            }
        }
        recorded.push(result);
    }

    recorded
}
