use std::path::{Path, PathBuf};

use ledgermash_common::RunConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format for {0} (expected .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("config has an empty formula")]
    EmptyFormula,
}

pub fn from_yaml_str(yaml: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig = serde_yaml::from_str(yaml)?;
    validate(config)
}

pub fn from_json_str(json: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig = serde_json::from_str(json)?;
    validate(config)
}

/// Load a run configuration, choosing the format by file extension.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let parse: fn(&str) -> Result<RunConfig, ConfigError> = match ext.as_deref() {
        Some("yaml" | "yml") => from_yaml_str,
        Some("json") => from_json_str,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };
    let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
        path: path.to_path_buf(),
        error,
    })?;
    let config = parse(&text)?;
    tracing::debug!(path = %path.display(), formula = config.formula.as_str(), "loaded run config");
    Ok(config)
}

fn validate(config: RunConfig) -> Result<RunConfig, ConfigError> {
    if config.formula.trim().is_empty() {
        return Err(ConfigError::EmptyFormula);
    }
    Ok(config)
}
