use crate::library::LibraryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainlabError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("render error: {0}")]
    Render(String),
    /// Parse, data-binding and evaluation failures of user code all collapse
    /// into this variant. `reason` is kept for logs only.
    #[error("can't process, fix function or test data")]
    CannotProcess { reason: String },
    #[error(transparent)]
    Library(#[from] LibraryError),
}

impl ChainlabError {
    pub fn cannot_process(reason: impl Into<String>) -> Self {
        Self::CannotProcess {
            reason: reason.into(),
        }
    }

    /// Detail behind a `CannotProcess`, or the display form of any other error.
    pub fn reason(&self) -> String {
        match self {
            Self::CannotProcess { reason } => reason.clone(),
            other => other.to_string(),
        }
    }
}
