use clap::Parser;
use std::sync::Arc;
use swagger_probe::adapters::extractor::extract_operations;
use swagger_probe::adapters::flusher::{LogSink, ResultFlusher};
use swagger_probe::adapters::http_dispatcher::HttpDispatcher;
use swagger_probe::adapters::pipeline::DispatchPipeline;
use swagger_probe::adapters::request_builder::prepare_request;
use swagger_probe::adapters::spec_loader::source_for;
use swagger_probe::adapters::summary::RunSummary;
use swagger_probe::cli::Cli;
use swagger_probe::config::Settings;
use swagger_probe::domain::{Definitions, OperationDescriptor};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    let client = reqwest::Client::builder()
        .timeout(settings.target.timeout())
        .build()?;

    let document = match source_for(&settings.spec.url, client.clone()).load().await {
        Ok(document) => document,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    let operations = extract_operations(&document);
    info!(
        "Loaded {} operations and {} definitions",
        operations.len(),
        document.definitions.len()
    );

    if cli.dry_run {
        dry_run(&operations, &document.definitions, settings.dispatch.max_schema_depth);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let dispatcher = Arc::new(HttpDispatcher::new(client, &settings.target.base_url));
    info!("Dispatching against {}", dispatcher.base_url());
    let mut pipeline = DispatchPipeline::new(
        dispatcher,
        Arc::new(document.definitions),
        settings.pipeline_settings(),
    );

    let flusher = if settings.flush.enabled {
        let (tx, rx) = mpsc::channel(256);
        pipeline = pipeline.with_sink(tx);
        let flusher = ResultFlusher::new(settings.flush.interval(), Arc::new(LogSink));
        Some(flusher.spawn(rx, shutdown_rx.clone()))
    } else {
        None
    };

    let results = pipeline.run_until(operations, shutdown_rx).await;
    // closes the result channel so the flusher performs its final flush
    drop(pipeline);

    if let Some(handle) = flusher {
        match handle.await {
            Ok(stats) => info!("Result flusher wrote {} batches", stats.batches),
            Err(e) => error!("Result flusher failed: {}", e),
        }
    }

    info!("{}", RunSummary::from_results(&results));
    Ok(())
}

fn dry_run(operations: &[OperationDescriptor], definitions: &Definitions, max_depth: usize) {
    for operation in operations {
        match prepare_request(operation, definitions, max_depth) {
            Ok(request) => match &request.payload {
                Some(payload) => info!("{} {} payload: {}", operation.method, request.path, payload),
                None => info!("{} {}", operation.method, request.path),
            },
            Err(e) => warn!("{}: {}", operation.key(), e),
        }
    }
}
