use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::config::HttpConfig;
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_TYPE, ETAG, LAST_MODIFIED};

pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| IngestError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String> {
        tracing::debug!(url, "Fetching source");
        let resp = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|e| e.to_string())?.to_vec();
        tracing::debug!(url, status, size = bytes.len(), "Source responded");
        Ok(HttpGetResult {
            status,
            bytes,
            content_type: header_text(&headers, CONTENT_TYPE).unwrap_or_else(|| "application/octet-stream".into()),
            etag: header_text(&headers, ETAG),
            last_modified: header_text(&headers, LAST_MODIFIED),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_status_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("user-agent", "test-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/rss+xml")
                    .insert_header("etag", "\"abc\"")
                    .insert_header("last-modified", "Sat, 18 Oct 2025 06:00:00 GMT")
                    .set_body_string("<rss/>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let http = ReqwestHttp::new(&HttpConfig { timeout_secs: 5, user_agent: "test-agent".into() }).unwrap();
        let resp = http.get(&format!("{}/feed", server.uri())).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.bytes, b"<rss/>");
        assert_eq!(resp.content_type, "application/rss+xml");
        assert_eq!(resp.etag.as_deref(), Some("\"abc\""));
        assert_eq!(resp.last_modified.as_deref(), Some("Sat, 18 Oct 2025 06:00:00 GMT"));
    }

    #[tokio::test]
    async fn missing_content_type_falls_back_to_octet_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw".to_vec()))
            .mount(&server)
            .await;

        let resp = ReqwestHttp::new(&HttpConfig::default()).unwrap().get(&server.uri()).await.unwrap();
        assert_eq!(resp.content_type, "application/octet-stream");
        assert!(resp.etag.is_none());
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let http = ReqwestHttp::new(&HttpConfig::default()).unwrap();
        let resp = http.get(&server.uri()).await.unwrap();
        assert_eq!(resp.status, 503);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let http = ReqwestHttp::new(&HttpConfig { timeout_secs: 2, user_agent: "t".into() }).unwrap();
        assert!(http.get("http://127.0.0.1:9/unreachable").await.is_err());
    }
}
