use crate::error::StoreError;
use azure_storage::{CloudLocation, ConnectionString, StorageCredentials};

const PUBLIC_SUFFIX: &str = "core.windows.net";

/// Where the blob service lives and how to authenticate against it.
#[derive(Clone)]
pub struct BlobTarget {
    pub location: CloudLocation,
    pub credentials: StorageCredentials,
}

impl BlobTarget {
    pub fn account(&self) -> &str {
        self.location.account()
    }
}

impl std::fmt::Debug for BlobTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobTarget")
            .field("location", &self.location)
            .field("credentials", &"<redacted>")
            .finish()
    }
}

/// Resolve an Azure storage connection string into a cloud location and credentials.
///
/// Handles `UseDevelopmentStorage=true`, an explicit `BlobEndpoint`, a non-default
/// `EndpointSuffix` or protocol, and the plain public-cloud account form.
pub fn resolve(raw: &str) -> Result<BlobTarget, StoreError> {
    // The SDK echoes the whole string in its parse errors, keys included.
    let conn = ConnectionString::new(raw).map_err(|_| StoreError::Config("malformed connection string".into()))?;

    if conn.use_development_storage == Some(true) {
        return Ok(BlobTarget {
            location: CloudLocation::Emulator { address: "127.0.0.1".into(), port: 10000 },
            credentials: StorageCredentials::emulator(),
        });
    }

    let location = match (conn.blob_endpoint, conn.account_name) {
        (Some(endpoint), account) => {
            let uri = endpoint.trim_end_matches('/').to_string();
            let account = account.map(str::to_string).unwrap_or_else(|| account_from_endpoint(&uri));
            CloudLocation::Custom { account, uri }
        }
        (None, Some(account)) => {
            let suffix = conn.endpoint_suffix.unwrap_or(PUBLIC_SUFFIX);
            let protocol = conn.default_endpoints_protocol.as_ref().map(|p| p.to_string());
            match protocol.as_deref() {
                (None | Some("https")) if suffix == PUBLIC_SUFFIX => CloudLocation::Public { account: account.into() },
                _ => CloudLocation::Custom {
                    account: account.into(),
                    uri: format!("{}://{}.blob.{}", protocol.as_deref().unwrap_or("https"), account, suffix),
                },
            }
        }
        (None, None) => return Err(StoreError::Config("connection string needs AccountName or BlobEndpoint".into())),
    };

    let credentials = conn.storage_credentials().map_err(|_| {
        StoreError::Config("connection string needs AccountName+AccountKey or SharedAccessSignature".into())
    })?;

    Ok(BlobTarget { location, credentials })
}

fn account_from_endpoint(endpoint: &str) -> String {
    let host = endpoint.split("://").nth(1).unwrap_or(endpoint);
    host.split(['.', '/', ':']).next().unwrap_or_default().to_string()
}
