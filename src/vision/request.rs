//! `vision-analyze` 的請求格式，以及 Gemini API key 的來源。

use serde::Deserialize;
use tracing::error;

use crate::config::toml_config::ProbeConfig;
use crate::domain::model::{AnalysisEnvelope, SubmissionData};
use crate::utils::error::{ProbeError, Result};
use crate::vision::analyzer::VehicleAnalyzer;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionRequest {
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub submission_data: Option<SubmissionData>,
}

impl VisionRequest {
    pub fn parse(raw: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(raw).map_err(|e| ProbeError::InvalidRequest {
            message: format!("Invalid request JSON: {}", e),
        })?;
        if request.photo_urls.is_empty() {
            return Err(ProbeError::InvalidRequest {
                message: "No photo URLs provided".to_string(),
            });
        }
        Ok(request)
    }
}

/// 設定檔中已展開的 key 優先，沒有才用環境變數
pub fn resolve_api_key(config: &ProbeConfig, env_key: Option<String>) -> Result<String> {
    if let Some(key) = config.vision_api_key() {
        return Ok(key.to_string());
    }
    env_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ProbeError::MissingConfigError {
            field: API_KEY_ENV.to_string(),
        })
}

async fn try_handle(
    raw: &str,
    mut config: ProbeConfig,
    env_key: Option<String>,
) -> Result<AnalysisEnvelope> {
    let request = VisionRequest::parse(raw)?;
    config.vision.api_key = Some(resolve_api_key(&config, env_key)?);

    let analyzer = VehicleAnalyzer::from_config(&config.vision)?;
    Ok(analyzer
        .analyze(&request.photo_urls, request.submission_data.as_ref())
        .await)
}

/// 解析請求並執行分析；任何錯誤都轉成失敗的 envelope
pub async fn handle_request(
    raw: &str,
    config: ProbeConfig,
    env_key: Option<String>,
) -> AnalysisEnvelope {
    match try_handle(raw, config, env_key).await {
        Ok(envelope) => envelope,
        Err(e) => {
            error!("❌ {}", e);
            AnalysisEnvelope::failure(e.to_string())
        }
    }
}
