use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::toml_config::VisionConfig;
use crate::domain::model::{AnalysisEnvelope, EncodedImage, SubmissionData};
use crate::domain::ports::VisionBackend;
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;
use crate::vision::gemini::GeminiBackend;
use crate::vision::imaging::{placeholder_image, prepare_image};
use crate::vision::parser::parse_analysis;
use crate::vision::prompts::{build_prompt, PromptKind, SYSTEM_MESSAGE};

const PHOTO_DOWNLOAD_TIMEOUT_SECONDS: u64 = 30;

pub struct VehicleAnalyzer<B: VisionBackend> {
    backend: B,
    client: Client,
    max_image_dimension: u32,
    placeholder_on_failure: bool,
    prompt: PromptKind,
}

impl VehicleAnalyzer<GeminiBackend> {
    pub fn from_config(config: &VisionConfig) -> Result<Self> {
        let api_key = validate_required_field("vision.api_key", &config.api_key)?.clone();

        let backend = GeminiBackend::new(
            api_key,
            config.endpoint.clone(),
            config.model.clone(),
            config.max_output_tokens,
            Duration::from_secs(config.timeout_seconds),
        )?;

        Ok(Self::new(backend, config.max_image_dimension)?
            .with_placeholder_on_failure(config.placeholder_on_failure)
            .with_prompt(config.prompt))
    }
}

impl<B: VisionBackend> VehicleAnalyzer<B> {
    pub fn new(backend: B, max_image_dimension: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(PHOTO_DOWNLOAD_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            backend,
            client,
            max_image_dimension,
            placeholder_on_failure: false,
            prompt: PromptKind::default(),
        })
    }

    pub fn with_placeholder_on_failure(mut self, enabled: bool) -> Self {
        self.placeholder_on_failure = enabled;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptKind) -> Self {
        self.prompt = prompt;
        self
    }

    async fn fetch_photo(&self, url: &str) -> Result<EncodedImage> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        prepare_image(&bytes, self.max_image_dimension)
    }

    /// 下載照片、送進視覺模型並整理結果。任何失敗都回傳錯誤封包。
    pub async fn analyze(
        &self,
        photo_urls: &[String],
        submission: Option<&SubmissionData>,
    ) -> AnalysisEnvelope {
        let session_id = Uuid::new_v4();
        info!(
            "🔍 [{}] Analyzing {} photo(s) with {}",
            session_id,
            photo_urls.len(),
            self.backend.model_name()
        );

        let mut images = Vec::with_capacity(photo_urls.len());
        for (i, url) in photo_urls.iter().enumerate() {
            match self.fetch_photo(url).await {
                Ok(image) => images.push(image),
                Err(e) => warn!("⚠️ [{}] Skipping photo {} ({}): {}", session_id, i + 1, url, e),
            }
        }

        if images.is_empty() && self.placeholder_on_failure {
            match placeholder_image() {
                Ok(placeholder) => {
                    warn!("⚠️ [{}] No photo could be loaded, sending placeholder", session_id);
                    images.push(placeholder);
                }
                Err(e) => error!("❌ [{}] Placeholder generation failed: {}", session_id, e),
            }
        }

        if images.is_empty() {
            return AnalysisEnvelope::failure("No valid images to analyze");
        }

        let prompt = build_prompt(submission, self.prompt);
        match self.backend.generate(SYSTEM_MESSAGE, &prompt, &images).await {
            Ok(text) => {
                let analysis = parse_analysis(&text, chrono::Utc::now().to_rfc3339());
                info!(
                    "✅ [{}] Analysis complete: grade {}, {} issue(s)",
                    session_id,
                    analysis.vehicle_grade.as_deref().unwrap_or("-"),
                    analysis.severity_assessment.total_issues
                );
                AnalysisEnvelope::ok(analysis, images.len(), self.prompt.analysis_type())
            }
            Err(e) => {
                error!("❌ [{}] Vision backend failed: {}", session_id, e);
                AnalysisEnvelope::failure(format!("Analysis failed: {}", e))
            }
        }
    }
}
