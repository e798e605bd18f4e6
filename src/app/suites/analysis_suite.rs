use async_trait::async_trait;
use serde_json::{json, Value};

use super::{evaluate, vin_suite::DECODED_VEHICLE_KEY};
use crate::adapters::http::{ApiClient, ApiResponse};
use crate::config::toml_config::ProbeConfig;
use crate::core::runner::ProbeContext;
use crate::domain::detection::{detect, Verdict};
use crate::domain::model::{AnalysisRequest, CheckResult, DecodedVehicle, SubmissionData, VehicleAnalysis};
use crate::domain::ports::ProbeSuite;
use crate::utils::error::Result;

const SUITE: &str = "analysis";
const ANALYZE_ENDPOINT: &str = "api/analyze-vehicle-photos";

const UNREACHABLE_PHOTO_URLS: [&str; 2] = [
    "https://invalid-url-that-does-not-exist.invalid/photo1.jpg",
    "https://another-invalid-url.invalid/photo2.jpg",
];

/// 用解碼結果補上缺少的車輛資料
pub fn enrich_submission(mut submission: SubmissionData, decoded: Option<&Value>) -> SubmissionData {
    let Some(vehicle) = decoded.and_then(|v| serde_json::from_value::<DecodedVehicle>(v.clone()).ok())
    else {
        return submission;
    };

    let fill = |slot: &mut Option<String>, value: &str| {
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    };
    fill(&mut submission.vin, &vehicle.vin);
    if submission.year.is_none() && !vehicle.year.is_empty() {
        submission.year = Some(vehicle.year.as_str().into());
    }
    fill(&mut submission.make, &vehicle.make);
    fill(&mut submission.model, &vehicle.model);
    submission
}

fn rejected_without_success(check: CheckResult, response: &ApiResponse) -> CheckResult {
    if response.bool_field("success") == Some(true) {
        return check.fail("Rejected request still reports success=true");
    }
    match response.str_field("error") {
        Some(error) => check.pass(format!("Error: {}", error)),
        None => check.pass("Rejected"),
    }
}

fn extract_analysis(response: &ApiResponse) -> std::result::Result<VehicleAnalysis, String> {
    if response.bool_field("success") != Some(true) {
        return Err(format!("'success' is not true: {}", response.snippet(200)));
    }
    let analysis = response
        .body
        .get("data")
        .and_then(|d| d.get("analysis"))
        .ok_or_else(|| "Response has no data.analysis".to_string())?;
    serde_json::from_value(analysis.clone()).map_err(|e| format!("Unreadable analysis: {}", e))
}

pub struct AnalysisSuite {
    photo_urls: Vec<String>,
    submission: SubmissionData,
}

impl AnalysisSuite {
    pub fn new(photo_urls: Vec<String>, submission: SubmissionData) -> Self {
        Self {
            photo_urls,
            submission,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.fixtures.photo_urls.clone(),
            config.fixtures.submission.clone(),
        )
    }

    fn submission_id(context: &ProbeContext, label: &str) -> String {
        format!("{}_{}", context.run_id, label)
    }

    async fn missing_photos(&self, client: &ApiClient, context: &ProbeContext) -> CheckResult {
        let check = CheckResult::new(SUITE, "Missing photoUrls", ANALYZE_ENDPOINT);
        let body = json!({ "submissionId": Self::submission_id(context, "missing_photos") });
        let outcome = client.post_json(ANALYZE_ENDPOINT, &body).await;
        evaluate(check, outcome, &[400], rejected_without_success)
    }

    async fn empty_photos(&self, client: &ApiClient, context: &ProbeContext) -> CheckResult {
        let check = CheckResult::new(SUITE, "Empty photoUrls", ANALYZE_ENDPOINT);
        let request = AnalysisRequest {
            submission_id: Self::submission_id(context, "empty_photos"),
            photo_urls: Vec::new(),
            submission_data: self.submission.clone(),
        };
        let outcome = client.post_json(ANALYZE_ENDPOINT, &json!(request)).await;
        evaluate(check, outcome, &[400], rejected_without_success)
    }

    async fn real_analysis(&self, client: &ApiClient, context: &ProbeContext) -> CheckResult {
        let check = CheckResult::new(SUITE, "Analyze vehicle photos", ANALYZE_ENDPOINT)
            .note("photos", json!(self.photo_urls.len()));
        let request = AnalysisRequest {
            submission_id: Self::submission_id(context, "analysis"),
            photo_urls: self.photo_urls.clone(),
            submission_data: enrich_submission(
                self.submission.clone(),
                context.get_shared_data(DECODED_VEHICLE_KEY),
            ),
        };
        let outcome = client.post_json(ANALYZE_ENDPOINT, &json!(request)).await;

        evaluate(check, outcome, &[200], |check, response| {
            let analysis = match extract_analysis(response) {
                Ok(a) => a,
                Err(reason) => return check.fail(reason),
            };
            let detection = detect(&analysis);
            tracing::info!(
                "🔍 Analysis verdict: {:?} (real {}/{}, mock {}/{})",
                detection.verdict,
                detection.real_score,
                detection.real_total,
                detection.mock_score,
                detection.mock_total
            );

            let check = check
                .note("verdict", json!(detection.verdict))
                .note("real_score", json!(detection.real_score))
                .note("mock_score", json!(detection.mock_score))
                .note("findings_chars", json!(analysis.detailed_findings.chars().count()))
                .note("confidence_score", json!(analysis.confidence_score))
                .note("vehicle_grade", json!(analysis.vehicle_grade));

            match detection.verdict {
                Verdict::Mock => check.fail(format!(
                    "Endpoint returned mock analysis (mock {} vs real {})",
                    detection.mock_score, detection.real_score
                )),
                Verdict::Real => check.pass("Real AI analysis"),
                Verdict::Uncertain => check.pass("Analysis returned, real/mock verdict uncertain"),
            }
        })
    }

    async fn unreachable_photos(&self, client: &ApiClient, context: &ProbeContext) -> CheckResult {
        let check = CheckResult::new(SUITE, "Unreachable photo URLs fall back", ANALYZE_ENDPOINT);
        let request = AnalysisRequest {
            submission_id: Self::submission_id(context, "unreachable_photos"),
            photo_urls: UNREACHABLE_PHOTO_URLS.iter().map(|u| u.to_string()).collect(),
            submission_data: self.submission.clone(),
        };
        let outcome = client.post_json(ANALYZE_ENDPOINT, &json!(request)).await;
        evaluate(check, outcome, &[200], |check, response| match extract_analysis(response) {
            Ok(_) => check.pass("Fallback analysis returned"),
            Err(reason) => check.fail(reason),
        })
    }
}

#[async_trait]
impl ProbeSuite for AnalysisSuite {
    fn name(&self) -> &str {
        SUITE
    }

    fn should_run(&self, _context: &ProbeContext) -> bool {
        !self.photo_urls.is_empty()
    }

    async fn run(&self, client: &ApiClient, context: &mut ProbeContext) -> Result<Vec<CheckResult>> {
        Ok(vec![
            self.missing_photos(client, context).await,
            self.empty_photos(client, context).await,
            self.real_analysis(client, context).await,
            self.unreachable_photos(client, context).await,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_fills_only_missing_fields() {
        let submission = SubmissionData {
            make: Some("Ford".to_string()),
            ..Default::default()
        };
        let decoded = json!({"vin": "1FTFW1ET5DFC10312", "make": "FORD", "model": "F-150", "year": "2013"});

        let enriched = enrich_submission(submission, Some(&decoded));
        assert_eq!(enriched.make.as_deref(), Some("Ford"));
        assert_eq!(enriched.model.as_deref(), Some("F-150"));
        assert_eq!(enriched.vin.as_deref(), Some("1FTFW1ET5DFC10312"));
        assert!(enriched.notes.is_none());
    }

    #[test]
    fn test_enrich_without_decoded_vehicle() {
        let submission = SubmissionData::default();
        let enriched = enrich_submission(submission, None);
        assert!(enriched.make.is_none());
    }

    #[test]
    fn test_no_photos_disables_suite() {
        let suite = AnalysisSuite::new(Vec::new(), SubmissionData::default());
        assert!(!suite.should_run(&ProbeContext::new("r".to_string())));
    }
}
