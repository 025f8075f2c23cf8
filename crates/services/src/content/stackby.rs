use async_trait::async_trait;
use learnpath_core::Clock;
use learnpath_core::filter::ContentFilter;
use learnpath_core::model::{ContentKind, ContentResponse};
use reqwest::Client;
use tracing::{debug, warn};

use super::ContentSource;
use crate::config::StackbyConfig;
use crate::error::ContentFetchError;

/// Reads content tables from the Stackby row-list API.
#[derive(Clone)]
pub struct StackbyContentSource {
    client: Client,
    config: StackbyConfig,
    clock: Clock,
}

impl StackbyContentSource {
    #[must_use]
    pub fn new(config: StackbyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            clock: Clock::default(),
        }
    }

    /// Replace the clock used for the `nocache` query parameter.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// `{base}/{Kind}?nocache={millis}[&{filter}]`
    #[must_use]
    pub fn request_url(&self, kind: ContentKind, filter: Option<&ContentFilter>) -> String {
        let mut url = format!(
            "{}/{}?nocache={}",
            self.config.base_url.trim_end_matches('/'),
            kind,
            self.clock.now().timestamp_millis()
        );
        if let Some(filter) = filter {
            url.push('&');
            url.push_str(&filter.query_fragment());
        }
        url
    }
}

#[async_trait]
impl ContentSource for StackbyContentSource {
    async fn fetch(
        &self,
        kind: ContentKind,
        filter: Option<&ContentFilter>,
    ) -> Result<ContentResponse, ContentFetchError> {
        let url = self.request_url(kind, filter);
        debug!(%kind, "fetching stackby table");

        let response = self
            .client
            .get(url)
            .header("x-api-key", &self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%kind, %status, "stackby request failed");
            return Err(ContentFetchError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use learnpath_core::filter::{FilterOperator, FilterValue};
    use learnpath_core::time::{fixed_clock, fixed_now};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned HTTP response and hands back the raw request text.
    async fn one_shot(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (format!("http://{addr}/rowlist/st1"), handle)
    }

    fn source(base_url: String) -> StackbyContentSource {
        StackbyContentSource::new(StackbyConfig {
            base_url,
            api_key: "secret-key".into(),
        })
        .with_clock(fixed_clock())
    }

    #[test]
    fn url_carries_cache_buster_and_filter() {
        let src = source("https://stackby.example/rowlist/st1/".into());
        let millis = fixed_now().timestamp_millis();
        assert_eq!(
            src.request_url(ContentKind::Themes, None),
            format!("https://stackby.example/rowlist/st1/Themes?nocache={millis}")
        );

        let filter = ContentFilter::from_params(
            Some("equal"),
            Some("themeId"),
            Some(FilterValue::from("th1")),
        )
        .unwrap()
        .unwrap();
        assert_eq!(filter.operator(), FilterOperator::Equal);
        assert_eq!(
            src.request_url(ContentKind::Topics, Some(&filter)),
            format!(
                "https://stackby.example/rowlist/st1/Topics?nocache={millis}&filter=equal({{themeId}},th1)"
            )
        );
    }

    #[tokio::test]
    async fn successful_fetch_sends_api_key_and_decodes_data() {
        let (base, request) = one_shot(
            "200 OK",
            r#"{"data":[{"id":"t1","field":{"exercisesInfo":"ex1,ex2","videoInfo":"v1"}}]}"#,
        )
        .await;

        let topics = source(base).fetch(ContentKind::Topics, None).await.unwrap();
        let request = request.await.unwrap();

        assert_eq!(topics.len(), 1);
        assert_eq!(topics.data[0].exercises_info(), Some("ex1,ex2"));
        assert!(request.starts_with("GET /rowlist/st1/Topics?nocache="));
        assert!(request.to_ascii_lowercase().contains("x-api-key: secret-key"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_hard_failure() {
        let (base, request) = one_shot("500 Internal Server Error", r#"{"error":"boom"}"#).await;

        let err = source(base)
            .fetch(ContentKind::Themes, None)
            .await
            .unwrap_err();
        request.await.unwrap();

        match err {
            ContentFetchError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
