use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] quantpro_core::ValidationError),

    #[error(transparent)]
    Config(#[from] quantpro_core::ConfigError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Config(_) => 4,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

/// Exit code used when a fetch produced no data.
pub const FETCH_FAILED_EXIT: u8 = 3;
