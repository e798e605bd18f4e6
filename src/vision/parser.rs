//! 將視覺模型的自由文字回覆整理成結構化欄位。
//!
//! 全部都是關鍵字比對，不解析任何固定格式。

use crate::domain::model::{SeverityAssessment, SeverityDistribution, VehicleAnalysis};

const MAX_TRADE_IN_FACTORS: usize = 5;
const MAX_DISCLOSURES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionCategory {
    Exterior,
    Interior,
    Mechanical,
}

impl ConditionCategory {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            ConditionCategory::Exterior => &["EXTERIOR", "PAINT", "BODY", "BUMPER", "DENTS"],
            ConditionCategory::Interior => &["INTERIOR", "SEATS", "DASHBOARD", "CARPET"],
            ConditionCategory::Mechanical => &["MECHANICAL", "ENGINE", "TIRE", "FLUID"],
        }
    }

    fn label(self) -> &'static str {
        match self {
            ConditionCategory::Exterior => "exterior",
            ConditionCategory::Interior => "interior",
            ConditionCategory::Mechanical => "mechanical",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ConditionCategory::Exterior => "Exterior",
            ConditionCategory::Interior => "Interior",
            ConditionCategory::Mechanical => "Mechanical",
        }
    }
}

/// 依序檢查，先符合者為準
const GRADE_INDICATORS: [(&str, &[&str]); 6] = [
    ("A+", &["excellent", "pristine", "exceptional", "like new"]),
    ("A", &["very good", "good condition", "well maintained"]),
    ("B+", &["good", "average", "normal wear", "acceptable"]),
    ("B", &["fair", "moderate wear", "some issues", "typical"]),
    ("C", &["poor", "significant", "major", "extensive"]),
    ("D", &["severe", "safety", "structural", "critical"]),
];

const DEFAULT_GRADE: &str = "B";

const DETAIL_INDICATORS: [&str; 6] = ["specific", "detailed", "clearly", "evident", "visible", "noted"];

pub fn parse_analysis(response: &str, timestamp: String) -> VehicleAnalysis {
    VehicleAnalysis {
        overall_condition: overall_condition(response),
        exterior_condition: condition_category(response, ConditionCategory::Exterior),
        interior_condition: condition_category(response, ConditionCategory::Interior),
        mechanical_observations: condition_category(response, ConditionCategory::Mechanical),
        severity_assessment: severity(response),
        trade_in_factors: trade_in_factors(response),
        recommended_disclosures: disclosures(response),
        detailed_findings: response.to_string(),
        analysis_timestamp: timestamp,
        confidence_score: Some(confidence_score(response)),
        vehicle_grade: Some(vehicle_grade(response).to_string()),
    }
}

pub fn overall_condition(response: &str) -> String {
    let lines: Vec<&str> = response.split('\n').collect();

    if let Some(idx) = lines.iter().position(|line| {
        let upper = line.to_uppercase();
        upper.contains("OVERALL CONDITION") || upper.contains("SUMMARY")
    }) {
        let summary: Vec<&str> = lines
            .iter()
            .skip(idx + 1)
            .take(3)
            .filter(|l| !l.trim().is_empty() && !l.starts_with("##"))
            .map(|l| l.trim())
            .collect();
        return if summary.is_empty() {
            "Condition assessment completed".to_string()
        } else {
            summary.join(" ")
        };
    }

    response
        .split("\n\n")
        .map(str::trim)
        .find(|p| p.chars().count() > 50)
        .map(str::to_string)
        .unwrap_or_else(|| "Professional vehicle inspection completed".to_string())
}

pub fn condition_category(response: &str, category: ConditionCategory) -> String {
    let lines: Vec<&str> = response.split('\n').collect();

    for keyword in category.keywords() {
        if let Some(i) = lines.iter().position(|l| l.to_uppercase().contains(keyword)) {
            let collected: Vec<&str> = lines
                .iter()
                .skip(i)
                .take(5)
                .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
                .map(|l| l.trim())
                .collect();
            return if collected.is_empty() {
                format!("{} condition noted", category.label())
            } else {
                collected.join(" ")
            };
        }
    }

    format!("{} condition within normal parameters", category.title())
}

pub fn severity(response: &str) -> SeverityAssessment {
    let upper = response.to_uppercase();
    let distribution = SeverityDistribution {
        minor: upper.matches("MINOR").count(),
        moderate: upper.matches("MODERATE").count(),
        major: upper.matches("MAJOR").count(),
        severe: upper.matches("SEVERE").count(),
    };

    // 同分時依 minor, moderate, major, severe 的順序取第一個
    let ranked = [
        ("minor", distribution.minor),
        ("moderate", distribution.moderate),
        ("major", distribution.major),
        ("severe", distribution.severe),
    ];
    let mut primary = ranked[0];
    for entry in &ranked[1..] {
        if entry.1 > primary.1 {
            primary = *entry;
        }
    }

    let total_issues =
        distribution.minor + distribution.moderate + distribution.major + distribution.severe;

    SeverityAssessment {
        primary_severity: primary.0.to_string(),
        severity_distribution: distribution,
        total_issues,
    }
}

fn lines_matching(response: &str, keywords: &[&str], min_len: usize) -> Vec<String> {
    response
        .split('\n')
        .filter(|line| {
            let upper = line.to_uppercase();
            keywords.iter().any(|k| upper.contains(k))
        })
        .map(str::trim)
        .filter(|line| line.chars().count() > min_len)
        .map(str::to_string)
        .collect()
}

pub fn trade_in_factors(response: &str) -> Vec<String> {
    let mut factors = lines_matching(
        response,
        &["TRADE", "VALUE", "IMPACT", "DEVALUATION", "AFFECT"],
        20,
    );

    if factors.is_empty() {
        factors = lines_matching(
            response,
            &["DAMAGE", "SCRATCH", "DENT", "WEAR", "TEAR", "STAIN"],
            15,
        );
    }

    factors.truncate(MAX_TRADE_IN_FACTORS);
    factors
}

pub fn disclosures(response: &str) -> Vec<String> {
    let mut found = lines_matching(
        response,
        &["DISCLOSE", "BUYER", "SHOULD KNOW", "AWARE", "RECOMMEND"],
        20,
    );
    found.truncate(MAX_DISCLOSURES);
    found
}

pub fn confidence_score(response: &str) -> i64 {
    let word_count = response.split_whitespace().count() as i64;
    let lower = response.to_lowercase();
    let detail_score = DETAIL_INDICATORS
        .iter()
        .filter(|word| lower.contains(*word))
        .count() as i64;

    let confidence = (60 + word_count / 20 + detail_score * 5).min(95);
    confidence.max(75)
}

pub fn vehicle_grade(response: &str) -> &'static str {
    let lower = response.to_lowercase();
    GRADE_INDICATORS
        .iter()
        .find(|(_, indicators)| indicators.iter().any(|i| lower.contains(i)))
        .map(|(grade, _)| *grade)
        .unwrap_or(DEFAULT_GRADE)
}
