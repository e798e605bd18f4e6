use crate::domain::model::{SubmissionData, TextOrNumber};
use serde::{Deserialize, Serialize};

pub const SYSTEM_MESSAGE: &str =
    "You are a professional vehicle appraiser specializing in trade-in evaluations.";

pub const COMPREHENSIVE_PROFESSIONAL: &str = r#"
You are a certified automotive appraiser with expertise in trade-in valuations. Conduct a comprehensive vehicle inspection analysis using the provided photos.

ANALYSIS REQUIREMENTS:
- Examine EVERY photo methodically for defects, damage, and wear
- Provide specific locations, measurements, and severity ratings
- Focus on factual observations that affect trade-in value
- Use professional automotive terminology
- Include confidence scores for each detection

DAMAGE CATEGORIES TO ASSESS:

1. EXTERIOR BODY DAMAGE:
   Dents: location (front fender, driver door, hood, roof, trunk, quarter panel), size in cm, severity (light <2cm, moderate 2-5cm, severe >5cm)
   Scratches: location, length (cm), depth (surface, moderate, deep gouges)
   Cracks: body panels, bumpers, plastic components, glass
   Paint Damage: repaint evidence, color mismatch, orange peel, clear coat damage, stone chips, peeling
   Missing/Broken Parts: lights, grilles, emblems, trim, mirrors, handles, antenna, wipers, hubcaps
   Hail Damage: circular depressions and impact patterns
   Panel Gaps: alignment between doors, fenders, hood, trunk
   Hidden Modifications: prior repairs or non-factory alterations

2. TIRES & WHEELS:
   Tread Depth: estimate in mm per position (excellent >6mm, good 4-6mm, fair 2-4mm, poor <2mm)
   Sidewall Condition: bubbles, cracks, cuts, dry rot
   Rim Damage: curb rash, bends, cracks
   Alignment Issues: inside edge, outside edge or center wear
   Mismatched or flat tires

3. UNDERCARRIAGE & MECHANICAL:
   Fluid Leaks: oil, coolant, transmission, brake fluid and severity
   Corrosion/Rust: location and severity (surface, moderate, severe structural)
   Structural Damage: frame bends, cracks, deformation
   Missing Components: exhaust parts, catalytic converters, shields, suspension components

4. INTERIOR CONDITION:
   Upholstery: tears, wear, stains, burns on seats, carpets, headliner
   Components: missing or broken knobs, buttons, vents, trim, dashboard elements
   Electronics: visible condition of displays, controls, lighting
   Cleanliness: overall interior maintenance level

SEVERITY RATINGS:
- LIGHT: cosmetic, minimal impact on function or safety
- MODERATE: noticeable defects affecting appearance or minor function
- MAJOR: significant damage requiring repair
- SEVERE: critical safety, structural or mechanical concerns

CONFIDENCE SCORING:
Assign confidence percentages (60-100%) for each detection based on image clarity.

OUTPUT FORMAT:
1. OVERALL CONDITION SUMMARY
2. CONFIDENCE SCORE (60-100%)
3. VEHICLE GRADE (A+ Excellent, A Good, B+ Fair, B Poor, C Critical)
4. DETAILED FINDINGS BY CATEGORY
5. SEVERITY DISTRIBUTION (count by Light/Moderate/Major/Severe)
6. HOTSPOT ANALYSIS
7. TRADE-IN DEVALUATION FACTORS (factual impact statements, no pricing)
8. REQUIRED DISCLOSURES (safety, legal, structural concerns)
9. PHOTO-SPECIFIC ANNOTATIONS (bounding box coordinates)
"#;

pub const BOUNDING_BOX_DETECTION: &str = r#"
For each detected issue, provide bounding box coordinates for photo overlay annotations:

FORMAT: [photo_index, x1, y1, x2, y2, detection_type, severity, confidence]

DETECTION TYPES:
- dent, scratch, crack, paint_damage, missing_part, rust, tire_wear, fluid_leak, tear, stain, broken_component

SEVERITY CODES: L (Light), M (Moderate), J (Major), S (Severe)

Example: [1, 145, 67, 189, 98, "dent", "M", 92]
"#;

pub const TRADE_IN_IMPACT: &str = r#"
Analyze each detected issue for its impact on trade-in value. Provide factual statements grouped by:
- Safety Concerns
- Structural Integrity
- Mechanical Function
- Aesthetic Appeal
- Regulatory Compliance
- Future Reliability

Do not give monetary estimates.
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    #[default]
    Comprehensive,
    BoundingBoxes,
    TradeInImpact,
}

impl PromptKind {
    pub fn text(self) -> &'static str {
        match self {
            PromptKind::Comprehensive => COMPREHENSIVE_PROFESSIONAL,
            PromptKind::BoundingBoxes => BOUNDING_BOX_DETECTION,
            PromptKind::TradeInImpact => TRADE_IN_IMPACT,
        }
    }

    /// 回傳給呼叫端的 analysisType 標籤
    pub fn analysis_type(self) -> &'static str {
        match self {
            PromptKind::Comprehensive => "gemini_vision_comprehensive",
            PromptKind::BoundingBoxes => "gemini_vision_bounding_boxes",
            PromptKind::TradeInImpact => "gemini_vision_trade_in_impact",
        }
    }
}

fn display_or(value: Option<&TextOrNumber>, fallback: &str) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| fallback.to_string())
}

/// 車輛背景資料，放在提示詞前面
pub fn submission_context(submission: &SubmissionData) -> String {
    format!(
        "\nVEHICLE CONTEXT:\n- VIN: {}\n- Year: {}\n- Make: {}\n- Model: {}\n- Mileage: {}\n- Owner Notes: {}\n\n",
        submission.vin.as_deref().unwrap_or("Not provided"),
        display_or(submission.year.as_ref(), "Unknown"),
        submission.make.as_deref().unwrap_or("Unknown"),
        submission.model.as_deref().unwrap_or("Unknown"),
        display_or(submission.mileage.as_ref(), "Unknown"),
        submission.notes.as_deref().unwrap_or("None provided"),
    )
}

pub fn build_prompt(submission: Option<&SubmissionData>, kind: PromptKind) -> String {
    let context = submission.map(submission_context).unwrap_or_default();
    format!("{}{}", context, kind.text())
}
