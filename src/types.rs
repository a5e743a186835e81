use crate::constants::FOLDER_SEPARATOR;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form metadata value attached to a source entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Text(String),
}

/// One ingestible URL from the configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Routing key used to select a subset of sources for an ingestion job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub url: String,
    pub source: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataValue>,
}

fn default_active() -> bool {
    true
}

impl SourceEntry {
    pub fn new(key: Option<&str>, url: &str, source: &str) -> Self {
        Self {
            key: key.map(str::to_string),
            url: url.to_string(),
            source: source.to_string(),
            active: true,
            id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Virtual folder this entry's payloads are archived under: `<key>/<source>`.
    pub fn folder(&self) -> String {
        let source = self.source.trim_matches(FOLDER_SEPARATOR);
        match self.key.as_deref().map(|k| k.trim_matches(FOLDER_SEPARATOR)) {
            Some(key) if !key.is_empty() => format!("{}{}{}", key, FOLDER_SEPARATOR, source),
            _ => source.to_string(),
        }
    }
}

/// Titled table of entries, the shape the configuration page edits.
#[derive(Debug, Clone, Deserialize)]
struct SourceGroup {
    #[serde(default)]
    key: Option<String>,
    data: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocumentItem {
    Group(SourceGroup),
    Entry(SourceEntry),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped { data: Vec<DocumentItem> },
    List(Vec<DocumentItem>),
}

/// Ordered list of source entries parsed from the configuration blob.
///
/// Accepts a bare array, a `{ "data": [...] }` wrapper, and arrays of titled
/// groups (`{ "title", "key", "data": [...] }`). Group entries without their
/// own key inherit the group's key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    pub entries: Vec<SourceEntry>,
}

impl ConfigDocument {
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        let raw: RawDocument = serde_json::from_slice(bytes)?;
        let items = match raw {
            RawDocument::Wrapped { data } => data,
            RawDocument::List(items) => items,
        };

        let mut entries = Vec::new();
        for item in items {
            match item {
                DocumentItem::Entry(entry) => entries.push(entry),
                DocumentItem::Group(group) => {
                    for mut entry in group.data {
                        if entry.key.is_none() {
                            entry.key = group.key.clone();
                        }
                        entries.push(entry);
                    }
                }
            }
        }
        Ok(Self { entries })
    }

    /// Entries whose key equals `routing_key`, in document order. `None` returns everything.
    pub fn filter(&self, routing_key: Option<&str>) -> Vec<SourceEntry> {
        match routing_key {
            Some(key) => self
                .entries
                .iter()
                .filter(|e| e.key.as_deref() == Some(key))
                .cloned()
                .collect(),
            None => self.entries.clone(),
        }
    }
}

/// Logical coordinate of a blob: container, virtual folder and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoragePath {
    pub container: String,
    pub folder: String,
    pub blob_name: String,
}

impl StoragePath {
    pub fn new(container: &str, folder: &str, blob_name: &str) -> Self {
        Self {
            container: container.to_string(),
            folder: folder.trim_end_matches(FOLDER_SEPARATOR).to_string(),
            blob_name: blob_name.to_string(),
        }
    }

    /// Object key inside the container: `folder/blob_name`, or just the name at the root.
    pub fn key(&self) -> String {
        if self.folder.is_empty() {
            self.blob_name.clone()
        } else {
            format!("{}{}{}", self.folder, FOLDER_SEPARATOR, self.blob_name)
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key())
    }
}

/// Result of a successful fetch-and-store
#[derive(Debug, Clone, Serialize)]
pub struct StoredObject {
    pub path: StoragePath,
    pub key: String,
    pub url: String,
    pub size_bytes: usize,
    pub sha256: String,
    pub content_type: String,
    /// Validators the source sent with the payload, kept for later conditional fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_last_modified: Option<String>,
}
