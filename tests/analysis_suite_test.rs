use anyhow::Result;
use appraisal_probe::app::suites::vin_suite::DECODED_VEHICLE_KEY;
use appraisal_probe::app::suites::AnalysisSuite;
use appraisal_probe::core::runner::ProbeContext;
use appraisal_probe::domain::model::{CheckStatus, SubmissionData};
use appraisal_probe::domain::ports::ProbeSuite;
use appraisal_probe::ApiClient;
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::time::Duration;

fn analysis_body(findings: &str, confidence: i64, grade: &str) -> Value {
    json!({
        "success": true,
        "data": {
            "submissionId": "run_analysis",
            "analysis": {
                "overall_condition": "Vehicle inspected",
                "detailed_findings": findings,
                "confidence_score": confidence,
                "vehicle_grade": grade,
                "trade_in_factors": ["Aftermarket modifications affect trade-in value"]
            },
            "photosAnalyzed": 2,
            "analysisType": "gemini_vision_comprehensive",
            "timestamp": "2026-10-18T08:00:00Z",
            "analysisId": "analysis_1"
        }
    })
}

fn mock_rejections(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/analyze-vehicle-photos")
            .body_contains("_missing_photos\"");
        then.status(400).json_body(json!({
            "success": false,
            "error": "Missing required fields: submissionId and photoUrls"
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/analyze-vehicle-photos")
            .body_contains("\"photoUrls\":[]");
        then.status(400)
            .json_body(json!({ "success": false, "error": "No photos provided" }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/analyze-vehicle-photos")
            .body_contains("invalid-url-that-does-not-exist");
        then.status(200)
            .json_body(analysis_body("Fallback analysis", 75, "B"));
    });
}

fn suite() -> AnalysisSuite {
    AnalysisSuite::new(
        vec!["https://photos.example.com/front.jpg".to_string()],
        SubmissionData {
            year: Some("2019".into()),
            mileage: Some(61000u64.into()),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_real_analysis_passes() -> Result<()> {
    let server = MockServer::start();
    mock_rejections(&server);
    let findings = "Ford Mustang with an aftermarket hood scoop and clearly visible stone chips. ".repeat(40);
    let analyze = server.mock(|when, then| {
        when.method(POST)
            .path("/api/analyze-vehicle-photos")
            .body_contains("_analysis\"")
            .body_contains("\"make\":\"FORD\"");
        then.status(200).json_body(analysis_body(&findings, 92, "A"));
    });

    let client = ApiClient::new(&server.base_url(), Duration::from_secs(5))?;
    let mut context = ProbeContext::new("run".to_string());
    context.add_shared_data(
        DECODED_VEHICLE_KEY,
        json!({ "vin": "1FA6P8CF0L5100000", "make": "FORD", "model": "Mustang", "year": "2020" }),
    );

    let checks = suite().run(&client, &mut context).await?;

    analyze.assert();
    for check in &checks {
        assert_eq!(check.status, CheckStatus::Passed, "{}: {}", check.name, check.detail);
    }
    assert_eq!(checks[2].notes["verdict"], json!("real"));
    assert_eq!(checks[2].notes["real_score"], json!(5));
    Ok(())
}

#[tokio::test]
async fn test_mock_analysis_is_flagged() -> Result<()> {
    let server = MockServer::start();
    mock_rejections(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/analyze-vehicle-photos")
            .body_contains("_analysis\"");
        then.status(200).json_body(analysis_body(
            "COMPREHENSIVE VEHICLE INSPECTION REPORT\nMultiple door dings and parking lot damage",
            87,
            "B+",
        ));
    });

    let client = ApiClient::new(&server.base_url(), Duration::from_secs(5))?;
    let mut context = ProbeContext::new("run".to_string());
    let checks = suite().run(&client, &mut context).await?;

    let analysis = &checks[2];
    assert!(analysis.failed());
    assert!(analysis.detail.contains("mock analysis"));
    assert_eq!(analysis.notes["verdict"], json!("mock"));
    Ok(())
}

#[tokio::test]
async fn test_success_without_analysis_fails() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/analyze-vehicle-photos");
        then.status(200).json_body(json!({ "success": true, "data": {} }));
    });

    let client = ApiClient::new(&server.base_url(), Duration::from_secs(5))?;
    let mut context = ProbeContext::new("run".to_string());
    let checks = suite().run(&client, &mut context).await?;

    // 400 的預期全部落空，分析也沒有內容
    assert!(checks[0].failed());
    assert!(checks[1].failed());
    assert_eq!(checks[2].detail, "Response has no data.analysis");
    assert!(checks[3].failed());
    Ok(())
}
