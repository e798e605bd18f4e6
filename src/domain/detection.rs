//! 判斷 `/api/analyze-vehicle-photos` 回傳的是真正的 AI 分析還是寫死的模擬資料。

use crate::domain::model::VehicleAnalysis;
use serde::Serialize;

/// 模擬資料固定使用的信心分數與等級
const MOCK_CONFIDENCE: i64 = 87;
const MOCK_GRADE: &str = "B+";

/// 真正的 AI 回覆通常比較長
const VERBOSE_FINDINGS_THRESHOLD: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Real,
    Mock,
    Uncertain,
}

#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    pub mock_score: usize,
    pub real_score: usize,
    pub mock_total: usize,
    pub real_total: usize,
    pub verdict: Verdict,
}

pub fn detect(analysis: &VehicleAnalysis) -> Detection {
    let findings = analysis.detailed_findings.as_str();
    let findings_lower = findings.to_lowercase();

    let mock_indicators = [
        findings.contains("Multiple door dings"),
        findings.contains("parking lot damage"),
        analysis.confidence_score == Some(MOCK_CONFIDENCE),
        analysis.vehicle_grade.as_deref() == Some(MOCK_GRADE),
        findings.contains("COMPREHENSIVE VEHICLE INSPECTION REPORT"),
    ];

    let real_indicators = [
        findings.chars().count() > VERBOSE_FINDINGS_THRESHOLD,
        findings.contains("Ford Mustang") || findings_lower.contains("modified"),
        findings_lower.contains("aftermarket"),
        findings_lower.contains("hood scoop"),
        analysis.confidence_score != Some(MOCK_CONFIDENCE),
    ];

    let mock_score = mock_indicators.iter().filter(|hit| **hit).count();
    let real_score = real_indicators.iter().filter(|hit| **hit).count();

    let verdict = match real_score.cmp(&mock_score) {
        std::cmp::Ordering::Greater => Verdict::Real,
        std::cmp::Ordering::Less => Verdict::Mock,
        std::cmp::Ordering::Equal => Verdict::Uncertain,
    };

    Detection {
        mock_score,
        real_score,
        mock_total: mock_indicators.len(),
        real_total: real_indicators.len(),
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_analysis() -> VehicleAnalysis {
        VehicleAnalysis {
            detailed_findings: "COMPREHENSIVE VEHICLE INSPECTION REPORT\nMultiple door dings and parking lot damage reduce aesthetic appeal".to_string(),
            confidence_score: Some(87),
            vehicle_grade: Some("B+".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_canned_analysis_is_mock() {
        let detection = detect(&mock_analysis());
        assert_eq!(detection.mock_score, 5);
        assert_eq!(detection.real_score, 0);
        assert_eq!(detection.verdict, Verdict::Mock);
    }

    #[test]
    fn test_verbose_specific_analysis_is_real() {
        let mut findings = String::from(
            "The Ford Mustang shows an aftermarket hood scoop and a modified exhaust.\n",
        );
        findings.push_str(&"Paint is in fair shape with visible swirl marks. ".repeat(50));
        let analysis = VehicleAnalysis {
            detailed_findings: findings,
            confidence_score: Some(91),
            vehicle_grade: Some("B".to_string()),
            ..Default::default()
        };
        let detection = detect(&analysis);
        assert_eq!(detection.real_score, 5);
        assert_eq!(detection.mock_score, 0);
        assert_eq!(detection.verdict, Verdict::Real);
    }

    #[test]
    fn test_tied_scores_are_uncertain() {
        // grade B+ (mock) vs confidence != 87 (real)
        let analysis = VehicleAnalysis {
            detailed_findings: "Short report".to_string(),
            confidence_score: Some(80),
            vehicle_grade: Some("B+".to_string()),
            ..Default::default()
        };
        assert_eq!(detect(&analysis).verdict, Verdict::Uncertain);
    }
}
