//! Cloud history over HTTP.
//!
//! `GET {base}/v1/metrics/{id}/series?start=YYYY-MM-DD&end=YYYY-MM-DD` with a
//! bearer token; the body is a JSON array of [`DataPoint`]s.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::StatusCode;

use crate::error::SourceError;
use crate::range::DateRange;
use crate::source::{CloudHistorySource, DataPoint};

/// Authenticated client for the cloud history API.
pub struct HttpCloudSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCloudSource {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vitalsync/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn series_url(&self, metric_id: &str) -> String {
        format!("{}/v1/metrics/{metric_id}/series", self.base_url)
    }
}

#[async_trait]
impl CloudHistorySource for HttpCloudSource {
    async fn fetch_series(
        &self,
        metric_id: &str,
        range: DateRange,
    ) -> Result<Vec<DataPoint>, SourceError> {
        let Some(token) = &self.token else {
            return Err(SourceError::Unauthorized);
        };
        let url = self.series_url(metric_id);
        debug!("GET {url} for {range}");
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("start", range.start().to_string()),
                ("end", range.end().to_string()),
            ])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Unauthorized),
            status if !status.is_success() => Err(SourceError::Http {
                status: status.as_u16(),
            }),
            _ => resp
                .json::<Vec<DataPoint>>()
                .await
                .map_err(|e| SourceError::Decode(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response and hand back the request head.
    async fn one_shot_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = sock.read(&mut buf).await.unwrap();
            let head = String::from_utf8_lossy(&buf[..n]).to_string();
            let resp = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
            head
        });
        (format!("http://{addr}"), handle)
    }

    fn range() -> DateRange {
        DateRange::last_days(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(), 2).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_points_and_sends_auth() {
        let body = r#"[{"timestamp":"2024-06-09T07:00:00Z","value":70.4},{"timestamp":"2024-06-10T07:00:00Z","value":70.1,"min":69.9,"max":70.3}]"#;
        let (base, server) = one_shot_server("200 OK", body).await;
        let src = HttpCloudSource::new(format!("{base}/"), Some("secret".into())).unwrap();
        let points = src.fetch_series("body_mass", range()).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].value, 70.1);
        assert_eq!(points[1].min, Some(69.9));

        let head = server.await.unwrap();
        assert!(
            head.starts_with("GET /v1/metrics/body_mass/series?start=2024-06-09&end=2024-06-10 ")
        );
        assert!(head.to_lowercase().contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let (base, _server) = one_shot_server("401 Unauthorized", "{}").await;
        let src = HttpCloudSource::new(base, Some("expired".into())).unwrap();
        assert_eq!(
            src.fetch_series("body_mass", range()).await,
            Err(SourceError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let (base, _server) = one_shot_server("503 Service Unavailable", "{}").await;
        let src = HttpCloudSource::new(base, Some("t".into())).unwrap();
        assert_eq!(
            src.fetch_series("body_mass", range()).await,
            Err(SourceError::Http { status: 503 })
        );
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_error() {
        let (base, _server) = one_shot_server("200 OK", r#"{"not":"a list"}"#).await;
        let src = HttpCloudSource::new(base, Some("t".into())).unwrap();
        assert!(matches!(
            src.fetch_series("body_mass", range()).await,
            Err(SourceError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_token_never_sends() {
        let src = HttpCloudSource::new("http://127.0.0.1:9", None).unwrap();
        assert_eq!(
            src.fetch_series("body_mass", range()).await,
            Err(SourceError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let src = HttpCloudSource::new(format!("http://{addr}"), Some("t".into())).unwrap();
        assert!(matches!(
            src.fetch_series("body_mass", range()).await,
            Err(SourceError::Network(_))
        ));
    }
}
