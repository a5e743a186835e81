//! Storage layout and startup defaults shared across the crate.

/// Zero-length object marking a provisioned virtual folder.
pub const FOLDER_MARKER: &str = ".keep";

/// Separator used for virtual folders inside blob keys.
pub const FOLDER_SEPARATOR: char = '/';

// Content types for objects written by the crate itself
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const MARKER_CONTENT_TYPE: &str = "application/octet-stream";

// Default storage coordinates
pub const DEFAULT_CONFIG_CONTAINER: &str = "data";
pub const DEFAULT_CONFIG_BLOB: &str = "urls.json";
pub const DEFAULT_DATA_CONTAINER: &str = "data";
pub const DEFAULT_LOCAL_ROOT: &str = "storage";

// Default ingestion settings
pub const DEFAULT_ROUTING_KEY: &str = "rssnews";
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

// Default HTTP client / server settings
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("rss_ingest/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_LOG_DIR: &str = "logs";

// Environment variable names
pub const ENV_CONNECTION_STRING: &str = "AzureWebJobsStorage";
pub const ENV_STORE_BACKEND: &str = "RSS_INGEST_STORE";
pub const ENV_LOCAL_ROOT: &str = "RSS_INGEST_LOCAL_ROOT";
pub const ENV_CONFIG_CONTAINER: &str = "RSS_INGEST_CONFIG_CONTAINER";
pub const ENV_CONFIG_BLOB: &str = "RSS_INGEST_CONFIG_BLOB";
pub const ENV_DATA_CONTAINER: &str = "RSS_INGEST_DATA_CONTAINER";
pub const ENV_ROUTING_KEY: &str = "RSS_INGEST_ROUTING_KEY";
pub const ENV_PORT: &str = "RSS_INGEST_PORT";
