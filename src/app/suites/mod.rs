pub mod admin_suite;
pub mod analysis_suite;
pub mod ocr_suite;
pub mod vin_suite;

pub use admin_suite::AdminSuite;
pub use analysis_suite::AnalysisSuite;
pub use ocr_suite::OcrSuite;
pub use vin_suite::VinSuite;

use crate::adapters::http::ApiResponse;
use crate::config::toml_config::ProbeConfig;
use crate::domain::model::CheckResult;
use crate::domain::ports::ProbeSuite;
use crate::utils::error::{ProbeError, Result};

/// 依設定建立要執行的 suite，順序固定
pub fn build_suites(config: &ProbeConfig) -> Vec<Box<dyn ProbeSuite>> {
    config
        .enabled_suites()
        .into_iter()
        .filter_map(|name| -> Option<Box<dyn ProbeSuite>> {
            match name {
                "vin" => Some(Box::new(VinSuite::from_config(config))),
                "admin" => Some(Box::new(AdminSuite::from_config(config))),
                "ocr" => Some(Box::new(OcrSuite::from_config(config))),
                "analysis" => Some(Box::new(AnalysisSuite::from_config(config))),
                _ => None,
            }
        })
        .collect()
}

/// 套用狀態碼檢查，通過後再交給 `inspect` 檢查內容。
/// 連線失敗與狀態碼不符都直接記為失敗。
pub(crate) fn evaluate<F>(
    check: CheckResult,
    outcome: Result<ApiResponse>,
    accepted: &[u16],
    inspect: F,
) -> CheckResult
where
    F: FnOnce(CheckResult, &ApiResponse) -> CheckResult,
{
    let check = match accepted.first() {
        Some(status) if check.expected_status.is_none() => check.expecting(*status),
        _ => check,
    };

    match outcome {
        Ok(response) => {
            let check = check.observed(response.status, response.elapsed);
            if accepted.contains(&response.status) {
                inspect(check, &response)
            } else {
                check.fail(format!(
                    "Expected HTTP {}, got {}: {}",
                    accepted
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join("/"),
                    response.status,
                    response.snippet(200)
                ))
            }
        }
        Err(e) => request_failed(check, &e),
    }
}

pub(crate) fn request_failed(check: CheckResult, error: &ProbeError) -> CheckResult {
    tracing::warn!("⚠️ {} request failed: {}", check.name, error);
    check.fail(format!("Request failed: {}", error.user_friendly_message()))
}

/// 要求回應帶有 `error` 欄位
pub(crate) fn require_error_field(check: CheckResult, response: &ApiResponse) -> CheckResult {
    match response.str_field("error") {
        Some(error) => check.pass(format!("Error: {}", error)),
        None => check.fail(format!("Missing 'error' field: {}", response.snippet(200))),
    }
}
