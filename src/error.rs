use thiserror::Error;

/// Errors loading or validating settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid timing: {0}")]
    Timing(String),
}

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid command on line {line}: {source}")]
    Decode {
        line: usize,
        source: serde_json::Error,
    },
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Event loop error: {0}")]
    EventLoop(#[from] calloop::Error),
}
