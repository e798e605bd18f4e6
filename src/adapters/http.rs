use crate::utils::error::{ProbeError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use url::Url;

/// 一次 HTTP 呼叫的結果。HTTP 錯誤狀態碼視為資料而非錯誤。
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: serde_json::Value,
    pub raw: String,
    pub elapsed: Duration,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 取出頂層字串欄位
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(|v| v.as_str())
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.body.get(key).and_then(|v| v.as_bool())
    }

    /// 截短後的原始內容，用於診斷輸出
    pub fn snippet(&self, max_chars: usize) -> String {
        let mut out: String = self.raw.chars().take(max_chars).collect();
        if self.raw.chars().count() > max_chars {
            out.push_str("...");
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Self::with_headers(base_url, timeout, &HashMap::new())
    }

    /// 每個請求都帶上固定標頭（例如部署環境的驗證 token）
    pub fn with_headers(
        base_url: &str,
        timeout: Duration,
        headers: &HashMap<String, String>,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)?;

        let mut default_headers = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                ProbeError::InvalidConfigValueError {
                    field: "target.headers".to_string(),
                    value: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ProbeError::InvalidConfigValueError {
                    field: "target.headers".to_string(),
                    value: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()?;
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse> {
        let url = self.url_for(endpoint);
        self.send("GET", &url, self.client.get(&url)).await
    }

    pub async fn post_json(&self, endpoint: &str, body: &serde_json::Value) -> Result<ApiResponse> {
        let url = self.url_for(endpoint);
        self.send("POST", &url, self.client.post(&url).json(body)).await
    }

    /// 不帶 body 的 POST，用來測試缺少輸入時的驗證
    pub async fn post_empty(&self, endpoint: &str) -> Result<ApiResponse> {
        let url = self.url_for(endpoint);
        self.send("POST", &url, self.client.post(&url)).await
    }

    pub async fn delete_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse> {
        let url = self.url_for(endpoint);
        self.send("DELETE", &url, self.client.delete(&url).json(body)).await
    }

    pub async fn post_multipart(
        &self,
        endpoint: &str,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<ApiResponse> {
        let url = self.url_for(endpoint);
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new().part(field.to_string(), part);
        self.send("POST", &url, self.client.post(&url).multipart(form))
            .await
    }

    async fn send(&self, method: &str, url: &str, request: RequestBuilder) -> Result<ApiResponse> {
        tracing::debug!("➡️ {} {}", method, url);
        let start = Instant::now();

        let response = request.send().await?;
        let status = response.status().as_u16();
        let raw = response.text().await?;
        let elapsed = start.elapsed();

        let body = serde_json::from_str(&raw)
            .unwrap_or_else(|_| serde_json::json!({ "text": raw.clone() }));

        tracing::debug!("⬅️ {} {} -> {} in {:?}", method, url, status, elapsed);

        Ok(ApiResponse {
            status,
            body,
            raw,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_url_for_joins_cleanly() {
        let client = ApiClient::new("http://localhost:3000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.url_for("api/vin-decode"), "http://localhost:3000/api/vin-decode");
        assert_eq!(client.url_for("/api/vin-decode"), "http://localhost:3000/api/vin-decode");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(ApiClient::new("not a url", Duration::from_secs(5)).is_err());
    }

    #[tokio::test]
    async fn test_error_status_is_not_an_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/admin/add-user");
            then.status(400)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"success": false, "error": "Missing required fields"}));
        });

        let client = ApiClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let response = client
            .post_json("api/admin/add-user", &serde_json::json!({}))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(response.status, 400);
        assert!(!response.is_success());
        assert_eq!(response.str_field("error"), Some("Missing required fields"));
    }

    #[tokio::test]
    async fn test_default_headers_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/admin/users")
                .header("x-probe-token", "abc");
            then.status(200).json_body(serde_json::json!({"users": []}));
        });

        let mut headers = HashMap::new();
        headers.insert("x-probe-token".to_string(), "abc".to_string());
        let client =
            ApiClient::with_headers(&server.base_url(), Duration::from_secs(5), &headers).unwrap();
        let response = client.get("api/admin/users").await.unwrap();

        mock.assert();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_non_json_body_wrapped_as_text() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/admin/users");
            then.status(502).body("Bad Gateway");
        });

        let client = ApiClient::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let response = client.get("api/admin/users").await.unwrap();

        assert_eq!(response.status, 502);
        assert_eq!(response.body["text"], "Bad Gateway");
        assert_eq!(response.snippet(3), "Bad...");
    }
}
