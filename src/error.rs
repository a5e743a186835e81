use thiserror::Error;

/// Faults reported by an object-store adapter.
///
/// `NotFound` and `AlreadyExists` are the two outcomes callers are expected
/// to branch on; everything else is a fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("store unreachable: {0}")]
    Transport(String),

    #[error("unexpected store response {status}: {message}")]
    Unexpected { status: u16, message: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("storage fault: {0}")]
    Storage(#[from] StoreError),

    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("remote error fetching {url}: HTTP {status}")]
    Remote { url: String, status: u16 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used for metric labels and HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Storage,
    Network,
    Remote,
    InvalidInput,
    Config,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Storage => "storage",
            FaultKind::Network => "network",
            FaultKind::Remote => "remote",
            FaultKind::InvalidInput => "invalid_input",
            FaultKind::Config => "config",
        }
    }
}

impl IngestError {
    pub fn kind(&self) -> FaultKind {
        match self {
            IngestError::Storage(_) => FaultKind::Storage,
            IngestError::Network { .. } => FaultKind::Network,
            IngestError::Remote { .. } => FaultKind::Remote,
            IngestError::InvalidInput(_) => FaultKind::InvalidInput,
            IngestError::Config(_)
            | IngestError::Json(_)
            | IngestError::Toml(_)
            | IngestError::Io(_) => FaultKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert_into_storage_faults() {
        let err: IngestError = StoreError::Transport("connection refused".into()).into();
        assert_eq!(err.kind(), FaultKind::Storage);
    }

    #[test]
    fn fetch_faults_are_classified() {
        let remote = IngestError::Remote { url: "http://x/feed".into(), status: 404 };
        let network = IngestError::Network { url: "http://x/feed".into(), message: "timed out".into() };
        assert_eq!(network.kind(), FaultKind::Network);
        assert_eq!(remote.kind().as_str(), "remote");
        assert_eq!(remote.to_string(), "remote error fetching http://x/feed: HTTP 404");
    }
}
