use crate::domain::model::SubmissionData;
use crate::utils::error::{ProbeError, Result};
use crate::utils::validation::{self, Validate};
use crate::vision::prompts::PromptKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_TEST_VIN: &str = "1HGBH41JXMN109186";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

pub const ALL_SUITES: [&str; 4] = ["vin", "admin", "ocr", "analysis"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub fixtures: FixtureConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub suites: SuiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub headers: Option<HashMap<String, String>>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            headers: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub vin: String,
    /// 其他要一併解碼的已知 VIN
    pub alternate_vins: Vec<String>,
    pub photo_urls: Vec<String>,
    pub submission: SubmissionData,
    pub admin_role: String,
    pub admin_password: String,
    pub email_domain: String,
    pub ocr_samples: OcrSamples,
}

/// 畫進測試圖片、期待 OCR 端點讀回的文字
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSamples {
    pub vin: String,
    pub plate: String,
    pub mileage: String,
}

impl Default for OcrSamples {
    fn default() -> Self {
        Self {
            vin: DEFAULT_TEST_VIN.to_string(),
            plate: "ABC1234".to_string(),
            mileage: "87325".to_string(),
        }
    }
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            vin: DEFAULT_TEST_VIN.to_string(),
            alternate_vins: vec!["1FTFW1ET5DFC10312".to_string()],
            photo_urls: vec![
                "https://images.unsplash.com/photo-1494905998402-395d579af36f".to_string(),
                "https://images.unsplash.com/photo-1552519507-da3b142c6e3d".to_string(),
            ],
            submission: SubmissionData {
                vin: Some(DEFAULT_TEST_VIN.to_string()),
                year: Some("2020".into()),
                make: Some("Honda".to_string()),
                model: Some("Civic".to_string()),
                mileage: Some(45000u64.into()),
                notes: Some("Minor parking lot dings, well maintained".to_string()),
            },
            admin_role: "manager".to_string(),
            admin_password: "TestPassword123!".to_string(),
            email_domain: "example.com".to_string(),
            ocr_samples: OcrSamples::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub max_image_dimension: u32,
    pub timeout_seconds: u64,
    /// 所有照片都下載失敗時改送佔位圖
    pub placeholder_on_failure: bool,
    pub prompt: PromptKind,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            max_output_tokens: 4096,
            max_image_dimension: 1024,
            timeout_seconds: 120,
            placeholder_on_failure: false,
            prompt: PromptKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub enabled: Vec<String>,
    pub fail_fast: bool,
    /// 第二次快取呼叫可以比第一次慢多少毫秒
    pub cache_tolerance_ms: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            enabled: ALL_SUITES.iter().map(|s| s.to_string()).collect(),
            fail_fast: false,
            cache_tolerance_ms: 250,
        }
    }
}

impl ProbeConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProbeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ProbeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GEMINI_API_KEY})，找不到時保留原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static env regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// 取得啟用的 suite，保持固定執行順序
    pub fn enabled_suites(&self) -> Vec<&'static str> {
        ALL_SUITES
            .iter()
            .copied()
            .filter(|name| self.suites.enabled.iter().any(|e| e.eq_ignore_ascii_case(name)))
            .collect()
    }

    /// API key 仍是未展開的 ${VAR} 時視為未設定
    pub fn vision_api_key(&self) -> Option<&str> {
        self.vision
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty() && !k.starts_with("${"))
    }
}

impl Validate for ProbeConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("target.base_url", &self.target.base_url)?;
        validation::validate_positive_number("target.timeout_seconds", self.target.timeout_seconds, 1)?;
        validation::validate_non_empty_string("fixtures.vin", &self.fixtures.vin)?;
        validation::validate_non_empty_string("fixtures.ocr_samples.vin", &self.fixtures.ocr_samples.vin)?;
        validation::validate_non_empty_string("fixtures.ocr_samples.plate", &self.fixtures.ocr_samples.plate)?;
        validation::validate_non_empty_string(
            "fixtures.ocr_samples.mileage",
            &self.fixtures.ocr_samples.mileage,
        )?;
        validation::validate_url("vision.endpoint", &self.vision.endpoint)?;
        validation::validate_non_empty_string("vision.model", &self.vision.model)?;
        validation::validate_range("vision.max_image_dimension", self.vision.max_image_dimension, 64, 4096)?;

        for url in &self.fixtures.photo_urls {
            validation::validate_url("fixtures.photo_urls", url)?;
        }

        for name in &self.suites.enabled {
            if !ALL_SUITES.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                return Err(ProbeError::InvalidConfigValueError {
                    field: "suites.enabled".to_string(),
                    value: name.clone(),
                    reason: format!("Unknown suite. Valid suites: {}", ALL_SUITES.join(", ")),
                });
            }
        }

        Ok(())
    }
}
