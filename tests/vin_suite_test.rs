use anyhow::Result;
use appraisal_probe::app::suites::vin_suite::DECODED_VEHICLE_KEY;
use appraisal_probe::app::suites::VinSuite;
use appraisal_probe::core::runner::ProbeContext;
use appraisal_probe::domain::model::CheckStatus;
use appraisal_probe::domain::ports::ProbeSuite;
use appraisal_probe::ApiClient;
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

const KNOWN_VIN: &str = "1HGBH41JXMN109186";

fn vehicle(vin: &str, cached: bool) -> serde_json::Value {
    json!({
        "success": true,
        "vehicle": {
            "vin": vin,
            "make": "HONDA",
            "model": "Civic",
            "year": "2021",
            "trim": "EX",
            "decodedAt": "2026-10-18T08:00:00Z",
            "cached": cached,
            "cacheHit": cached
        }
    })
}

/// 模擬的伺服器永遠回傳 cached=false，快取流程應判定失敗
fn mock_vin_server(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/vin-decode")
            .json_body(json!({ "vin": KNOWN_VIN }));
        then.status(200).json_body(vehicle(KNOWN_VIN, false));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/vin-decode").json_body(json!({}));
        then.status(400)
            .json_body(json!({ "success": false, "error": "VIN is required" }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/vin-decode")
            .json_body(json!({ "vin": "INVALID123" }));
        then.status(400).json_body(
            json!({ "success": false, "error": "VIN must be exactly 17 characters" }),
        );
    });
    for vin in ["1HGBH41JXMN000123", "1HGBH41JXMN000124"] {
        server.mock(move |when, then| {
            when.method(POST)
                .path("/api/vin-decode")
                .json_body(json!({ "vin": vin }));
            then.status(200).json_body(vehicle(vin, false));
        });
    }
    server.mock(|when, then| {
        when.method(GET).path("/api/vin-decode/cache-stats");
        then.status(200).json_body(json!({
            "success": true,
            "cache": {
                "totalEntries": 3,
                "activeEntries": 3,
                "expiredEntries": 0,
                "ttl": "24 hours",
                "maxSize": 1000,
                "status": "healthy"
            }
        }));
    });
}

#[tokio::test]
async fn test_vin_suite_against_uncached_server() -> Result<()> {
    let server = MockServer::start();
    mock_vin_server(&server);

    let client = ApiClient::new(&server.base_url(), Duration::from_secs(5))?;
    let suite = VinSuite::new(vec![KNOWN_VIN.to_string()], Duration::from_millis(250)).with_seed(123);
    let mut context = ProbeContext::new("vin_test".to_string());

    let checks = suite.run(&client, &mut context).await?;
    let statuses: Vec<(String, CheckStatus)> =
        checks.iter().map(|c| (c.name.clone(), c.status)).collect();

    assert_eq!(checks.len(), 7);
    assert_eq!(statuses[0], (format!("Decode known VIN {}", KNOWN_VIN), CheckStatus::Passed));
    assert_eq!(statuses[1].1, CheckStatus::Passed);
    assert_eq!(statuses[2].1, CheckStatus::Passed);

    // 快取流程：第二次呼叫沒有命中
    assert_eq!(statuses[3].1, CheckStatus::Failed);
    assert!(checks[3].detail.contains("Second call should be a cache hit"));
    assert_eq!(statuses[4].1, CheckStatus::Failed);

    assert_eq!(statuses[5], ("Invalid VIN not cached".to_string(), CheckStatus::Passed));
    assert_eq!(statuses[6], ("Cache stats".to_string(), CheckStatus::Passed));
    assert!(checks[6].detail.contains("healthy"));

    let shared = context
        .get_shared_data(DECODED_VEHICLE_KEY)
        .expect("decoded vehicle should be shared");
    assert_eq!(shared["make"], "HONDA");

    Ok(())
}

#[tokio::test]
async fn test_echoed_vin_mismatch_fails() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/vin-decode");
        then.status(200).json_body(vehicle("2T1BURHE0JC000000", false));
    });

    let client = ApiClient::new(&server.base_url(), Duration::from_secs(5))?;
    let suite = VinSuite::new(vec![KNOWN_VIN.to_string()], Duration::from_millis(250)).with_seed(1);
    let mut context = ProbeContext::new("vin_test".to_string());

    let checks = suite.run(&client, &mut context).await?;

    assert!(checks[0].failed());
    assert!(checks[0].detail.contains("does not match"));
    assert!(context.get_shared_data(DECODED_VEHICLE_KEY).is_none());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_reports_failures() -> Result<()> {
    // 沒有服務在這個埠上
    let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2))?;
    let suite = VinSuite::new(vec![KNOWN_VIN.to_string()], Duration::from_millis(250));
    let mut context = ProbeContext::new("vin_test".to_string());

    let checks = suite.run(&client, &mut context).await?;

    assert!(checks.iter().all(|c| c.failed()));
    assert!(checks[0].detail.starts_with("Request failed"));
    assert_eq!(checks[0].actual_status, None);
    Ok(())
}
