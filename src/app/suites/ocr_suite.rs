use async_trait::async_trait;
use serde_json::{json, Value};

use super::evaluate;
use crate::adapters::http::{ApiClient, ApiResponse};
use crate::config::toml_config::{OcrSamples, ProbeConfig};
use crate::core::runner::ProbeContext;
use crate::domain::model::{CheckResult, OcrReading, UNREADABLE};
use crate::domain::ports::ProbeSuite;
use crate::domain::vin;
use crate::utils::error::Result;
use crate::vision::imaging::{blank_png, noisy_png, text_png};

const SUITE: &str = "ocr";
const IMAGE_FIELD: &str = "image";

pub const OCR_VIN_ENDPOINT: &str = "api/ocr-vin";
pub const OCR_PLATE_ENDPOINT: &str = "api/ocr-license-plate";
pub const OCR_MILEAGE_ENDPOINT: &str = "api/ocr-mileage";
const OCR_ENDPOINTS: [&str; 3] = [OCR_VIN_ENDPOINT, OCR_PLATE_ENDPOINT, OCR_MILEAGE_ENDPOINT];

const INVALID_IMAGE_BYTES: &[u8] = b"This is not image data";

const GUIDANCE_KEYWORDS: [&str; 5] = ["image", "photo", "clear", "visible", "vin"];

/// 比單純的 "UNREADABLE" 更有幫助的錯誤訊息
pub fn is_enhanced_error(message: &str) -> bool {
    if message == UNREADABLE {
        return false;
    }
    let lower = message.to_lowercase();
    message.chars().count() > 20 || GUIDANCE_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn parse_reading(response: &ApiResponse) -> OcrReading {
    serde_json::from_value(response.body.clone()).unwrap_or_default()
}

/// OCR 讀到的 VIN 與檢查碼比對
fn annotate_vin(check: CheckResult, reading: &OcrReading) -> CheckResult {
    let Some(raw) = reading.vin.as_deref().filter(|raw| *raw != UNREADABLE) else {
        return check;
    };
    match vin::best_candidate(raw) {
        Some((candidate, confidence)) => check
            .note("vin", json!(candidate))
            .note("vin_confidence", json!(confidence))
            .note("vin_check_digit_valid", json!(vin::is_valid_check_digit(&candidate))),
        None => check
            .note("vin", json!(vin::normalize(raw)))
            .note("vin_check_digit_valid", json!(false)),
    }
}

/// 比對用：只留英數字並轉大寫
fn comparable(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// 取出端點讀到的值；讀不到或格式不像該欄位時回傳原因
fn read_back(endpoint: &str, reading: &OcrReading) -> std::result::Result<String, String> {
    let value = match endpoint {
        OCR_VIN_ENDPOINT => reading.vin.clone(),
        OCR_PLATE_ENDPOINT => reading.plate.clone(),
        _ => reading.mileage.as_ref().map(|m| match m {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
    }
    .ok_or_else(|| format!("No reading in response from {}", endpoint))?;

    if value == UNREADABLE {
        return Err("Rendered text reported as UNREADABLE".to_string());
    }
    let well_formed = match endpoint {
        OCR_VIN_ENDPOINT => vin::normalize(&value).len() == vin::VIN_LENGTH,
        OCR_PLATE_ENDPOINT => value.chars().count() >= 4,
        _ => !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
    };
    if well_formed {
        Ok(value)
    } else {
        Err(format!("Unexpected reading: {}", value))
    }
}

#[derive(Default)]
pub struct OcrSuite {
    samples: OcrSamples,
}

impl OcrSuite {
    pub fn new(samples: OcrSamples) -> Self {
        Self { samples }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.fixtures.ocr_samples.clone())
    }

    fn sample_for(&self, endpoint: &str) -> &str {
        match endpoint {
            OCR_VIN_ENDPOINT => &self.samples.vin,
            OCR_PLATE_ENDPOINT => &self.samples.plate,
            _ => &self.samples.mileage,
        }
    }

    async fn rendered_text(&self, client: &ApiClient, endpoint: &str, png: Vec<u8>) -> CheckResult {
        let sample = self.sample_for(endpoint);
        let check = CheckResult::new(SUITE, "Reads rendered text", endpoint).note("expected", json!(sample));
        let outcome = client
            .post_multipart(endpoint, IMAGE_FIELD, "rendered_text.png", png, "image/png")
            .await;
        evaluate(check, outcome, &[200], |check, response| {
            let reading = parse_reading(response);
            let check = annotate_vin(check, &reading);
            match read_back(endpoint, &reading) {
                Ok(value) => {
                    let exact = comparable(&value) == comparable(sample);
                    let detail = if exact {
                        format!("Read {}", value)
                    } else {
                        format!("Read {} (rendered {})", value, sample)
                    };
                    check
                        .note("read", json!(value))
                        .note("matches_expected", json!(exact))
                        .pass(detail)
                }
                Err(reason) => check.fail(reason),
            }
        })
    }

    async fn missing_image(&self, client: &ApiClient, endpoint: &str) -> CheckResult {
        let check = CheckResult::new(SUITE, "Missing image", endpoint);
        let outcome = client.post_empty(endpoint).await;
        evaluate(check, outcome, &[400], |check, response| {
            let Some(error) = response.str_field("error") else {
                return check.fail(format!("Missing 'error' field: {}", response.snippet(200)));
            };
            let mut check = check.note("error", json!(error));
            if let Some(suggestion) = response.str_field("suggestion") {
                check = check.note("suggestion", json!(suggestion));
            }
            if is_enhanced_error(error) {
                check.pass(format!("Helpful error: {}", error))
            } else {
                check.fail(format!("Generic error message: {}", error))
            }
        })
    }

    async fn invalid_bytes(&self, client: &ApiClient, endpoint: &str) -> CheckResult {
        let check = CheckResult::new(SUITE, "Invalid image data", endpoint);
        let outcome = client
            .post_multipart(
                endpoint,
                IMAGE_FIELD,
                "invalid.txt",
                INVALID_IMAGE_BYTES.to_vec(),
                "text/plain",
            )
            .await;
        evaluate(check, outcome, &[400, 500], |check, response| {
            match response.str_field("error") {
                Some(error) => check.note("error", json!(error)).pass(format!("Rejected: {}", error)),
                None => check.pass(format!("Rejected without 'error' field: {}", response.snippet(120))),
            }
        })
    }

    async fn blank_image(&self, client: &ApiClient, endpoint: &str, png: Vec<u8>) -> CheckResult {
        let check = CheckResult::new(SUITE, "Blank image", endpoint);
        let outcome = client
            .post_multipart(endpoint, IMAGE_FIELD, "blank.png", png, "image/png")
            .await;
        evaluate(check, outcome, &[200], |check, response| {
            let reading = parse_reading(response);
            let mut check = annotate_vin(check, &reading);
            if let Some(suggestion) = &reading.suggestion {
                check = check.note("suggestion", json!(suggestion));
            }

            if reading.is_unreadable() || reading.error.is_some() {
                check.pass(format!(
                    "Unreadable as expected{}",
                    reading
                        .error
                        .as_deref()
                        .map(|e| format!(": {}", e))
                        .unwrap_or_default()
                ))
            } else {
                check.fail(format!(
                    "Text reported from a blank image: {}",
                    response.snippet(200)
                ))
            }
        })
    }

    async fn low_quality_image(&self, client: &ApiClient, endpoint: &str, png: Vec<u8>) -> CheckResult {
        let check = CheckResult::new(SUITE, "Low quality image", endpoint);
        let outcome = client
            .post_multipart(endpoint, IMAGE_FIELD, "poor_quality.png", png, "image/png")
            .await;
        evaluate(check, outcome, &[200], |check, response| {
            let reading = parse_reading(response);
            let mut check = annotate_vin(check, &reading);
            if let Some(confidence) = reading.confidence {
                check = check.note("confidence", json!(confidence));
            }

            match (&reading.error, reading.is_unreadable()) {
                (Some(error), _) => check.pass(format!("Unreadable: {}", error)),
                (None, true) => check.pass("Unreadable, no error message"),
                (None, false) => check.pass(format!("Reading returned: {}", response.snippet(120))),
            }
        })
    }
}

#[async_trait]
impl ProbeSuite for OcrSuite {
    fn name(&self) -> &str {
        SUITE
    }

    async fn run(&self, client: &ApiClient, _context: &mut ProbeContext) -> Result<Vec<CheckResult>> {
        let blank = blank_png(400, 200)?;
        let noisy = noisy_png(200, 100)?;

        let mut checks = Vec::new();
        for endpoint in OCR_ENDPOINTS {
            tracing::info!("🔄 Probing {}", endpoint);
            let rendered = text_png(self.sample_for(endpoint))?;
            checks.push(self.rendered_text(client, endpoint, rendered).await);
            checks.push(self.missing_image(client, endpoint).await);
            checks.push(self.invalid_bytes(client, endpoint).await);
            checks.push(self.blank_image(client, endpoint, blank.clone()).await);
            checks.push(self.low_quality_image(client, endpoint, noisy.clone()).await);
        }
        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhanced_error_detection() {
        assert!(is_enhanced_error("No image provided"));
        assert!(is_enhanced_error("Could not read text, please retake"));
        assert!(!is_enhanced_error("UNREADABLE"));
        assert!(!is_enhanced_error("Bad request"));
        assert!(is_enhanced_error("Bad VIN"));
    }

    #[test]
    fn test_read_back_per_endpoint() {
        let reading = |body: Value| -> OcrReading { serde_json::from_value(body).unwrap() };

        assert_eq!(
            read_back(OCR_VIN_ENDPOINT, &reading(json!({"vin": "1HGBH41JXMN109186"}))),
            Ok("1HGBH41JXMN109186".to_string())
        );
        assert!(read_back(OCR_VIN_ENDPOINT, &reading(json!({"vin": "1HGBH41"}))).is_err());
        assert!(read_back(OCR_PLATE_ENDPOINT, &reading(json!({"licensePlate": "AB1"}))).is_err());
        assert_eq!(
            read_back(OCR_MILEAGE_ENDPOINT, &reading(json!({"mileage": 87325}))),
            Ok("87325".to_string())
        );
        assert!(read_back(OCR_MILEAGE_ENDPOINT, &reading(json!({"mileage": "87,325 mi"}))).is_err());
        assert!(read_back(OCR_MILEAGE_ENDPOINT, &reading(json!({"success": false}))).is_err());
    }

    #[test]
    fn test_plate_comparison_ignores_spacing() {
        assert_eq!(comparable("abc-1234"), comparable("ABC 1234"));
        assert_ne!(comparable("ABC1234"), comparable("ABC1235"));
    }

    #[test]
    fn test_samples_follow_endpoint() {
        let suite = OcrSuite::default();
        assert_eq!(suite.sample_for(OCR_PLATE_ENDPOINT), "ABC1234");
        assert_eq!(suite.sample_for(OCR_MILEAGE_ENDPOINT), "87325");
    }

    #[test]
    fn test_short_messages_need_guidance_keyword() {
        assert!(!is_enhanced_error("Bad plate"));
        assert!(!is_enhanced_error("No mileage"));
        assert!(!is_enhanced_error("Odometer?"));
        assert!(is_enhanced_error("Unclear photo"));
    }

    #[test]
    fn test_annotate_vin_checks_digit() {
        let reading = OcrReading {
            vin: Some("1hgbh41jxmn109186".to_string()),
            ..Default::default()
        };
        let check = annotate_vin(CheckResult::new(SUITE, "x", OCR_VIN_ENDPOINT), &reading);
        assert_eq!(check.notes["vin"], json!("1HGBH41JXMN109186"));
        assert_eq!(check.notes["vin_check_digit_valid"], json!(true));
        assert_eq!(check.notes["vin_confidence"], json!(vin::CHECK_DIGIT_CONFIDENCE));

        let noisy = OcrReading {
            vin: Some("VIN: 1HGBH41JXMN10918".to_string()),
            ..Default::default()
        };
        let check = annotate_vin(CheckResult::new(SUITE, "x", OCR_VIN_ENDPOINT), &noisy);
        assert_eq!(check.notes["vin_check_digit_valid"], json!(false));

        let unreadable = OcrReading {
            vin: Some(UNREADABLE.to_string()),
            ..Default::default()
        };
        let check = annotate_vin(CheckResult::new(SUITE, "x", OCR_VIN_ENDPOINT), &unreadable);
        assert!(check.notes.is_empty());
    }
}
