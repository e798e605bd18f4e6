use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// `/api/vin-decode` 回傳的車輛資料
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecodedVehicle {
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: String,
    pub trim: String,
    pub engine: String,
    pub transmission: String,
    pub body_class: String,
    pub fuel_type: String,
    pub manufacturer: String,
    pub plant_country: String,
    pub vehicle_type: String,
    pub drive_type: String,
    pub trade_in_value: Option<String>,
    pub retail_value: Option<String>,
    pub market_trend: Option<String>,
    pub decoded_at: Option<String>,
    pub cached: Option<bool>,
    pub cache_hit: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheStats {
    pub total_entries: Option<u64>,
    pub active_entries: Option<u64>,
    pub expired_entries: Option<u64>,
    pub ttl: Option<String>,
    pub max_size: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub uid: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// OCR 端點的回應
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrReading {
    pub vin: Option<String>,
    #[serde(alias = "licensePlate")]
    pub plate: Option<String>,
    pub mileage: Option<serde_json::Value>,
    pub confidence: Option<f64>,
    pub success: Option<bool>,
    pub error: Option<String>,
    pub suggestion: Option<String>,
}

pub const UNREADABLE: &str = "UNREADABLE";

impl OcrReading {
    pub fn is_unreadable(&self) -> bool {
        let mileage = self.mileage.as_ref().and_then(serde_json::Value::as_str);
        [self.vin.as_deref(), self.plate.as_deref(), mileage]
            .into_iter()
            .flatten()
            .any(|v| v == UNREADABLE)
            || self.confidence == Some(0.0)
            || self.success == Some(false)
    }
}

/// 呼叫端送來的年份、里程可能是字串也可能是數字，原樣保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextOrNumber {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for TextOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextOrNumber::Number(n) => write!(f, "{}", n),
            TextOrNumber::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for TextOrNumber {
    fn from(value: u64) -> Self {
        TextOrNumber::Number(value.into())
    }
}

impl From<&str> for TextOrNumber {
    fn from(value: &str) -> Self {
        TextOrNumber::Text(value.to_string())
    }
}

/// 送給分析端點的車輛背景資料
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionData {
    pub vin: Option<String>,
    pub year: Option<TextOrNumber>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub mileage: Option<TextOrNumber>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub submission_id: String,
    pub photo_urls: Vec<String>,
    pub submission_data: SubmissionData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub minor: usize,
    pub moderate: usize,
    pub major: usize,
    pub severe: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub primary_severity: String,
    pub severity_distribution: SeverityDistribution,
    pub total_issues: usize,
}

/// 由 AI 自由文字整理出的分析結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleAnalysis {
    pub overall_condition: String,
    pub exterior_condition: String,
    pub interior_condition: String,
    pub mechanical_observations: String,
    pub severity_assessment: SeverityAssessment,
    pub trade_in_factors: Vec<String>,
    pub recommended_disclosures: Vec<String>,
    pub detailed_findings: String,
    pub analysis_timestamp: String,
    pub confidence_score: Option<i64>,
    pub vehicle_grade: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<VehicleAnalysis>,
    pub photos_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisEnvelope {
    pub fn ok(analysis: VehicleAnalysis, photos_analyzed: usize, analysis_type: &str) -> Self {
        Self {
            success: true,
            analysis: Some(analysis),
            photos_analyzed,
            analysis_type: Some(analysis_type.to_string()),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            analysis: None,
            photos_analyzed: 0,
            analysis_type: None,
            error: Some(message.into()),
        }
    }
}

/// 已編碼、可直接送進視覺模型的圖片
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data_base64: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
}

/// 單一檢查的結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub suite: String,
    pub name: String,
    pub endpoint: String,
    pub expected_status: Option<u16>,
    pub actual_status: Option<u16>,
    pub status: CheckStatus,
    pub detail: String,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub notes: BTreeMap<String, serde_json::Value>,
}

impl CheckResult {
    pub fn new(suite: &str, name: &str, endpoint: &str) -> Self {
        Self {
            suite: suite.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            expected_status: None,
            actual_status: None,
            status: CheckStatus::Skipped,
            detail: String::new(),
            elapsed: Duration::ZERO,
            notes: BTreeMap::new(),
        }
    }

    pub fn expecting(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn observed(mut self, status: u16, elapsed: Duration) -> Self {
        self.actual_status = Some(status);
        self.elapsed = elapsed;
        self
    }

    pub fn pass(mut self, detail: impl Into<String>) -> Self {
        self.status = CheckStatus::Passed;
        self.detail = detail.into();
        self
    }

    pub fn fail(mut self, detail: impl Into<String>) -> Self {
        self.status = CheckStatus::Failed;
        self.detail = detail.into();
        self
    }

    pub fn skip(mut self, detail: impl Into<String>) -> Self {
        self.status = CheckStatus::Skipped;
        self.detail = detail.into();
        self
    }

    pub fn note(mut self, key: &str, value: serde_json::Value) -> Self {
        self.notes.insert(key.to_string(), value);
        self
    }

    pub fn passed(&self) -> bool {
        self.status == CheckStatus::Passed
    }

    pub fn failed(&self) -> bool {
        self.status == CheckStatus::Failed
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_vehicle_reads_camel_case() {
        let json = serde_json::json!({
            "vin": "1HGBH41JXMN109186",
            "make": "HONDA",
            "model": "Civic",
            "year": "1991",
            "bodyClass": "Sedan",
            "cached": true,
            "cacheHit": true
        });
        let vehicle: DecodedVehicle = serde_json::from_value(json).unwrap();
        assert_eq!(vehicle.body_class, "Sedan");
        assert_eq!(vehicle.cache_hit, Some(true));
        assert_eq!(vehicle.trim, "");
    }

    #[test]
    fn test_submission_accepts_text_or_number() {
        let quoted: SubmissionData = serde_json::from_value(serde_json::json!({
            "year": "1991",
            "mileage": "87325"
        }))
        .unwrap();
        assert_eq!(quoted.year, Some(TextOrNumber::from("1991")));
        assert_eq!(quoted.mileage.as_ref().map(|m| m.to_string()).as_deref(), Some("87325"));

        let numeric: SubmissionData = serde_json::from_value(serde_json::json!({
            "year": 1991,
            "mileage": 87325
        }))
        .unwrap();
        assert_eq!(numeric.mileage, Some(TextOrNumber::from(87325u64)));
        assert_eq!(numeric.year.as_ref().map(|y| y.to_string()).as_deref(), Some("1991"));

        // 轉送時保留原本的型別
        let back = serde_json::to_value(&numeric).unwrap();
        assert_eq!(back["year"], serde_json::json!(1991));
        assert_eq!(serde_json::to_value(&quoted).unwrap()["mileage"], serde_json::json!("87325"));
    }

    #[test]
    fn test_mileage_failure_reply_is_unreadable() {
        let reading: OcrReading = serde_json::from_value(serde_json::json!({
            "mileage": "UNREADABLE",
            "success": false
        }))
        .unwrap();
        assert!(reading.is_unreadable());

        let reading: OcrReading =
            serde_json::from_value(serde_json::json!({"mileage": "87325", "success": true})).unwrap();
        assert!(!reading.is_unreadable());
    }

    #[test]
    fn test_ocr_reading_unreadable() {
        let reading: OcrReading =
            serde_json::from_value(serde_json::json!({"vin": "UNREADABLE", "confidence": 0}))
                .unwrap();
        assert!(reading.is_unreadable());

        let reading: OcrReading =
            serde_json::from_value(serde_json::json!({"licensePlate": "ABC123", "confidence": 91}))
                .unwrap();
        assert!(!reading.is_unreadable());
        assert_eq!(reading.plate.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_check_result_builder() {
        let check = CheckResult::new("admin", "List users", "api/admin/users")
            .expecting(200)
            .observed(500, Duration::from_millis(12))
            .fail("Expected 200, got 500");
        assert!(check.failed());
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["elapsed"], 12);
    }
}
