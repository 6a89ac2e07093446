use std::fs;
use swagger_probe::config::Settings;
use tempfile::TempDir;

#[test]
fn test_load_settings_from_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("probe.toml");

    let probe_toml = r#"
[spec]
url = "specs/petstore.yaml"

[target]
base_url = "https://staging.example.com/api"
timeout_secs = 5

[dispatch]
concurrency_limit = 16
max_schema_depth = 12

[flush]
enabled = false
"#;
    fs::write(&config_path, probe_toml)?;

    let settings = Settings::from_path(&config_path)?;
    assert_eq!(settings.spec.url, "specs/petstore.yaml");
    assert_eq!(settings.target.base_url, "https://staging.example.com/api");
    assert_eq!(settings.target.timeout_secs, 5);
    assert_eq!(settings.dispatch.concurrency_limit, 16);
    assert_eq!(settings.dispatch.max_schema_depth, 12);
    // untouched keys keep their defaults
    assert_eq!(settings.dispatch.shutdown_timeout_secs, 10);
    assert!(!settings.flush.enabled);
    assert_eq!(settings.flush.interval_secs, 60);

    let pipeline = settings.pipeline_settings();
    assert_eq!(pipeline.concurrency_limit, 16);
    assert_eq!(pipeline.max_schema_depth, 12);

    Ok(())
}

#[test]
fn test_invalid_file_values_are_rejected() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("probe.toml");

    let probe_toml = r#"
[target]
base_url = "ftp://example.com"

[dispatch]
concurrency_limit = 0
"#;
    fs::write(&config_path, probe_toml)?;

    let err = Settings::from_path(&config_path).unwrap_err().to_string();
    assert!(err.contains("target.base_url"));
    assert!(err.contains("dispatch.concurrency_limit"));

    Ok(())
}

#[test]
fn test_yaml_config_file() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("probe.yaml");

    fs::write(
        &config_path,
        "spec:\n  url: http://petstore.local/swagger.json\ndispatch:\n  concurrency_limit: 2\n",
    )?;

    let settings = Settings::from_path(&config_path)?;
    assert_eq!(settings.spec.url, "http://petstore.local/swagger.json");
    assert_eq!(settings.dispatch.concurrency_limit, 2);
    Ok(())
}
