use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub mod validator;

use crate::adapters::pipeline::PipelineSettings;
use crate::adapters::synthesizer::DEFAULT_MAX_DEPTH;
use crate::cli::Cli;

pub const DEFAULT_SPEC_URL: &str = "http://localhost:8080/swagger.json";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/v2";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub spec: SpecSettings,
    pub target: TargetSettings,
    pub dispatch: DispatchSettings,
    pub flush: FlushSettings,
}

/// Where the Swagger document is loaded from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpecSettings {
    /// `http(s)://` URL or path to a local `.json`/`.yaml` file
    pub url: String,
}

/// The API under test
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetSettings {
    /// Prefix prepended verbatim to every route
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchSettings {
    /// Upper bound on operations holding a concurrency token at once
    pub concurrency_limit: usize,
    pub max_schema_depth: usize,
    /// Grace period for in-flight requests after shutdown is requested
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlushSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl TargetSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FlushSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl From<&DispatchSettings> for PipelineSettings {
    fn from(settings: &DispatchSettings) -> Self {
        Self {
            concurrency_limit: settings.concurrency_limit,
            max_schema_depth: settings.max_schema_depth,
            shutdown_timeout: Duration::from_secs(settings.shutdown_timeout_secs),
        }
    }
}

impl Settings {
    /// Defaults, then `probe.toml` in the working directory, then `PROBE__*`
    /// environment variables.
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_path(Path::new("probe.toml"))
    }

    /// Create settings from CLI arguments (includes config file and CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(config_path: &Path) -> Result<Self, anyhow::Error> {
        let settings = Self::load(config_path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(config_path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .set_default("spec.url", DEFAULT_SPEC_URL)?
            .set_default("target.base_url", DEFAULT_BASE_URL)?
            .set_default("target.timeout_secs", 30)?
            .set_default("dispatch.concurrency_limit", 5)?
            .set_default("dispatch.max_schema_depth", DEFAULT_MAX_DEPTH as u64)?
            .set_default("dispatch.shutdown_timeout_secs", 10)?
            .set_default("flush.enabled", true)?
            .set_default("flush.interval_secs", 60)?
            .add_source(File::from(config_path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("PROBE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(url) = &cli.spec_url {
            self.spec.url = url.clone();
        }
        if let Some(base_url) = &cli.base_url {
            self.target.base_url = base_url.clone();
        }
        if let Some(limit) = cli.concurrency {
            self.dispatch.concurrency_limit = limit;
        }
        if let Some(depth) = cli.max_depth {
            self.dispatch.max_schema_depth = depth;
        }
        if let Some(timeout) = cli.shutdown_timeout {
            self.dispatch.shutdown_timeout_secs = timeout;
        }
        if let Some(interval) = cli.flush_interval {
            self.flush.interval_secs = interval;
        }
        if cli.no_flush {
            self.flush.enabled = false;
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings::from(&self.dispatch)
    }
}
