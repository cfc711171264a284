//! API client for communicating with the load analytics service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the load analytics service
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("API error ({}): {}", status, err),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn send_sample(&self, sample: &SampleRequest) -> Result<IngestResponse> {
        self.post("metric", sample).await
    }

    pub async fn analyze(&self) -> Result<AnalyzeResponse> {
        self.get("analyze").await
    }

    pub async fn health(&self) -> Result<ServiceHealth> {
        self.get("health").await
    }

    pub async fn recent(&self, limit: usize) -> Result<RecentSamples> {
        self.get(&format!("samples/recent?limit={}", limit)).await
    }
}

// API request and response types

/// Body of `POST /metric`; absent fields take the service defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rps: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub id: String,
    pub status: String,
    pub rps: f64,
    pub rolling_average: f64,
    pub is_anomaly: bool,
    pub window: usize,
    pub stored: bool,
    pub received_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub rolling_average: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub window_size: usize,
    pub anomaly_count_total: u64,
    pub last_updated_at: i64,
    pub window_anomalies: usize,
    pub window_capacity: usize,
    pub algorithm: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: i64,
    pub cpu: f64,
    pub rps: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentSamples {
    pub backend: String,
    pub samples: Vec<SampleRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_sample_request_omits_absent_fields() {
        let body = serde_json::to_value(SampleRequest {
            rps: Some(120.0),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({"rps": 120.0}));
    }

    #[tokio::test]
    async fn test_send_sample() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/metric")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({"cpu": 40.0, "rps": 120.0})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"metric_1","status":"processed","rps":120.0,
                    "rolling_average":120.0,"is_anomaly":false,"window":1,
                    "stored":true,"received_at":"2024-01-01T00:00:00Z"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client
            .send_sample(&SampleRequest {
                timestamp: None,
                cpu: Some(40.0),
                rps: Some(120.0),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, "processed");
        assert_eq!(response.window, 1);
        assert!(!response.is_anomaly);
    }

    #[tokio::test]
    async fn test_analyze() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/analyze")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"rolling_average":154.5,"std_dev":115.49,"min":100.0,"max":500.0,
                    "window_size":10,"anomaly_count_total":0,"last_updated_at":10,
                    "window_anomalies":1,"window_capacity":50,
                    "algorithm":"z-score (threshold > 2σ)",
                    "timestamp":"2024-01-01T00:00:00Z"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let analysis = client.analyze().await.unwrap();

        assert_eq!(analysis.rolling_average, 154.5);
        assert_eq!(analysis.window_anomalies, 1);
        assert_eq!(analysis.window_capacity, 50);
    }

    #[tokio::test]
    async fn test_recent_passes_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex("^/samples/recent".to_string()))
            .match_query(Matcher::UrlEncoded("limit".into(), "5".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"backend":"memory","samples":[{"timestamp":1,"cpu":2.0,"rps":3.0}]}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let recent = client.recent(5).await.unwrap();

        mock.assert_async().await;
        assert_eq!(recent.backend, "memory");
        assert_eq!(recent.samples.len(), 1);
        assert_eq!(recent.samples[0].rps, 3.0);
    }

    #[tokio::test]
    async fn test_error_body_surfaces_in_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/metric")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Invalid JSON","code":"BAD_REQUEST","details":"EOF"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .send_sample(&SampleRequest::default())
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("400"));
        assert!(err.contains("Invalid JSON (EOF)"));
    }

    #[tokio::test]
    async fn test_plain_error_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.health().await.unwrap_err().to_string();

        assert!(err.contains("bad gateway"));
    }
}
