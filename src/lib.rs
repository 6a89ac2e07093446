//! # Swagger Probe - API smoke tester
//!
//! Swagger Probe reads a Swagger v2 document, extracts every (route, method)
//! operation, synthesizes a sample JSON payload for each body parameter from the
//! document's schema definitions, and calls every operation against a target
//! API with bounded concurrency.
//!
//! ## Features
//!
//! - **Schema synthesis**: deterministic sample values for every JSON schema type,
//!   with `$ref` resolution and cycle detection
//! - **Bounded concurrency**: a fixed worker pool never exceeds the configured limit
//! - **Graceful shutdown**: Ctrl-C stops new dispatches and cancels the rest
//! - **Result flushing**: periodic batches handed to a pluggable sink
//! - **Layered configuration**: defaults, `probe.toml`, `PROBE__*` env vars and CLI flags
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swagger_probe::adapters::extractor::extract_operations;
//! use swagger_probe::adapters::http_dispatcher::HttpDispatcher;
//! use swagger_probe::adapters::pipeline::DispatchPipeline;
//! use swagger_probe::adapters::spec_loader::source_for;
//! use swagger_probe::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let client = reqwest::Client::new();
//!
//!     let document = source_for(&settings.spec.url, client.clone()).load().await?;
//!     let operations = extract_operations(&document);
//!
//!     let dispatcher = Arc::new(HttpDispatcher::new(client, &settings.target.base_url));
//!     let pipeline = DispatchPipeline::new(
//!         dispatcher,
//!         Arc::new(document.definitions),
//!         settings.pipeline_settings(),
//!     );
//!     let results = pipeline.run(operations).await;
//!     println!("{} operations dispatched", results.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Swagger Probe follows Hexagonal Architecture:
//! - **Domain**: document model, operations, results, errors and the ports
//!   (`SpecSource`, `RequestDispatcher`, `ResultSink`)
//! - **Adapters**: document loading, extraction, synthesis, HTTP dispatch, the
//!   pipeline and result flushing
//! - **Config**: configuration management and validation

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
