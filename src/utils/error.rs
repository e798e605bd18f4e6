use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV report error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Font error: {0}")]
    FontError(#[from] ab_glyph::InvalidFont),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unexpected response from {endpoint} (HTTP {status}): {body}")]
    UnexpectedResponse {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Vision API error: {message}")]
    VisionError { message: String },

    #[error("{message}")]
    InvalidRequest { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProbeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProbeError::HttpError(_)
            | ProbeError::UnexpectedResponse { .. }
            | ProbeError::VisionError { .. } => ErrorCategory::Network,
            ProbeError::ConfigError { .. }
            | ProbeError::MissingConfigError { .. }
            | ProbeError::InvalidConfigValueError { .. }
            | ProbeError::UrlError(_) => ErrorCategory::Configuration,
            ProbeError::SerializationError(_)
            | ProbeError::InvalidRequest { .. }
            | ProbeError::ImageError(_)
            | ProbeError::FontError(_)
            | ProbeError::CsvError(_) => ErrorCategory::Data,
            ProbeError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ProbeError::HttpError(e) if e.is_connect() => {
                "Could not connect to the target server".to_string()
            }
            ProbeError::HttpError(e) if e.is_timeout() => "The request timed out".to_string(),
            ProbeError::MissingConfigError { field } => {
                format!("Configuration is missing '{}'", field)
            }
            ProbeError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check that the appraisal server is running and that --base-url points to it"
            }
            ErrorCategory::Configuration => {
                "Review the CLI flags and the TOML config file, including ${VAR} placeholders"
            }
            ErrorCategory::Data => "Inspect the response body with --verbose to see what was returned",
            ErrorCategory::System => "Check file permissions and free disk space for report output",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
