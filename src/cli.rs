use clap::Parser;
use std::path::PathBuf;

/// Swagger API smoke tester - calls every operation of a Swagger v2 document
/// with synthesized sample payloads
#[derive(Parser, Debug, Clone)]
#[command(name = "swagger-probe", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "PROBE_CONFIG", default_value = "probe.toml")]
    pub config: PathBuf,

    /// URL or local path of the Swagger document
    #[arg(long, env = "PROBE_SPEC_URL")]
    pub spec_url: Option<String>,

    /// Base URL prepended to every route
    #[arg(long, env = "PROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// Maximum number of operations in flight at once
    #[arg(long, env = "PROBE_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Maximum schema nesting depth during payload synthesis
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Seconds in-flight requests may run after Ctrl-C
    #[arg(long)]
    pub shutdown_timeout: Option<u64>,

    /// Seconds between result flushes
    #[arg(long)]
    pub flush_interval: Option<u64>,

    /// Disable periodic result flushing
    #[arg(long)]
    pub no_flush: bool,

    /// Synthesize and log every request without sending anything
    #[arg(long)]
    pub dry_run: bool,
}
