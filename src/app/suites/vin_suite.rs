use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{evaluate, request_failed, require_error_field};
use crate::adapters::http::ApiClient;
use crate::config::toml_config::ProbeConfig;
use crate::core::runner::ProbeContext;
use crate::domain::model::{CacheStats, CheckResult, DecodedVehicle};
use crate::domain::ports::ProbeSuite;
use crate::domain::vin;
use crate::utils::error::Result;

const SUITE: &str = "vin";
const DECODE_ENDPOINT: &str = "api/vin-decode";
const CACHE_STATS_ENDPOINT: &str = "api/vin-decode/cache-stats";

/// 錯誤長度的 VIN，不應被快取
const MALFORMED_VIN: &str = "INVALID123";

/// 比對快取前後的資料時忽略的欄位
const VOLATILE_FIELDS: [&str; 4] = ["cached", "cacheHit", "decodedAt", "marketTrend"];

pub const DECODED_VEHICLE_KEY: &str = "decoded_vehicle";

/// 快取前後兩次呼叫的比對結果
#[derive(Debug, Clone, PartialEq)]
pub struct CacheComparison {
    pub problems: Vec<String>,
    pub slower_by: Option<Duration>,
}

impl CacheComparison {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }
}

fn strip_volatile(vehicle: &Value) -> Value {
    let mut cleaned = vehicle.clone();
    if let Some(map) = cleaned.as_object_mut() {
        for field in VOLATILE_FIELDS {
            map.remove(field);
        }
    }
    cleaned
}

/// 第一次應未命中快取，第二次應命中且內容一致。
/// 第二次比第一次慢超過容許值時只記錄，不算失敗。
pub fn compare_cache_pair(
    first: &Value,
    first_elapsed: Duration,
    second: &Value,
    second_elapsed: Duration,
    tolerance: Duration,
) -> CacheComparison {
    let mut problems = Vec::new();

    if first.get("cached").and_then(Value::as_bool) != Some(false) {
        problems.push(format!(
            "First call should not be cached (cached={})",
            first.get("cached").unwrap_or(&Value::Null)
        ));
    }

    let second_cached = second.get("cached").and_then(Value::as_bool) == Some(true);
    let second_hit = second.get("cacheHit").and_then(Value::as_bool) == Some(true);
    if !(second_cached && second_hit) {
        problems.push(format!(
            "Second call should be a cache hit (cached={}, cacheHit={})",
            second.get("cached").unwrap_or(&Value::Null),
            second.get("cacheHit").unwrap_or(&Value::Null)
        ));
    }

    if strip_volatile(first) != strip_volatile(second) {
        problems.push("Data differs between cached and non-cached responses".to_string());
    }

    let slower_by = second_elapsed
        .checked_sub(first_elapsed)
        .filter(|diff| *diff > tolerance);

    CacheComparison { problems, slower_by }
}

pub struct VinSuite {
    vins: Vec<String>,
    cache_tolerance: Duration,
    seed: u64,
}

impl VinSuite {
    pub fn new(vins: Vec<String>, cache_tolerance: Duration) -> Self {
        Self {
            vins,
            cache_tolerance,
            seed: chrono::Utc::now().timestamp().unsigned_abs(),
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        let mut vins = vec![config.fixtures.vin.clone()];
        vins.extend(config.fixtures.alternate_vins.iter().cloned());
        Self::new(vins, Duration::from_millis(config.suites.cache_tolerance_ms))
    }

    /// 固定快取測試用 VIN 的後六碼
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    async fn decode_known(&self, client: &ApiClient, raw_vin: &str, context: &mut ProbeContext) -> CheckResult {
        let expected_vin = vin::normalize(raw_vin);
        let check = CheckResult::new(SUITE, &format!("Decode known VIN {}", expected_vin), DECODE_ENDPOINT)
            .note("vin", json!(expected_vin));
        let outcome = client.post_json(DECODE_ENDPOINT, &json!({ "vin": raw_vin })).await;

        let mut decoded = None;
        let result = evaluate(check, outcome, &[200], |check, response| {
            if response.bool_field("success") != Some(true) {
                return check.fail(format!("'success' is not true: {}", response.snippet(200)));
            }
            let Some(vehicle_value) = response.body.get("vehicle") else {
                return check.fail("Response has no 'vehicle' object");
            };
            let vehicle: DecodedVehicle = match serde_json::from_value(vehicle_value.clone()) {
                Ok(v) => v,
                Err(e) => return check.fail(format!("Unreadable vehicle payload: {}", e)),
            };

            let missing: Vec<&str> = [
                ("make", vehicle.make.as_str()),
                ("model", vehicle.model.as_str()),
                ("year", vehicle.year.as_str()),
            ]
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
            if !missing.is_empty() {
                return check.fail(format!("Vehicle missing fields: {}", missing.join(", ")));
            }
            if vin::normalize(&vehicle.vin) != expected_vin {
                return check.fail(format!(
                    "Echoed VIN {} does not match {}",
                    vehicle.vin, expected_vin
                ));
            }

            decoded = Some(vehicle_value.clone());
            check.pass(format!("{} {} {}", vehicle.year, vehicle.make, vehicle.model))
        });

        if let Some(vehicle) = decoded {
            if context.get_shared_data(DECODED_VEHICLE_KEY).is_none() {
                context.add_shared_data(DECODED_VEHICLE_KEY, vehicle);
            }
        }
        result
    }

    async fn missing_vin(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "Missing VIN rejected", DECODE_ENDPOINT);
        let outcome = client.post_json(DECODE_ENDPOINT, &json!({})).await;
        evaluate(check, outcome, &[400], require_error_field)
    }

    async fn malformed_vin(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "Malformed VIN rejected", DECODE_ENDPOINT)
            .note("vin", json!(MALFORMED_VIN));
        let outcome = client.post_json(DECODE_ENDPOINT, &json!({ "vin": MALFORMED_VIN })).await;
        evaluate(check, outcome, &[400], require_error_field)
    }

    async fn caching_flow(&self, client: &ApiClient, test_vin: &str) -> CheckResult {
        let check = CheckResult::new(SUITE, &format!("Caching flow {}", test_vin), DECODE_ENDPOINT)
            .expecting(200)
            .note("vin", json!(test_vin));
        let body = json!({ "vin": test_vin });

        let first = match client.post_json(DECODE_ENDPOINT, &body).await {
            Ok(r) => r,
            Err(e) => return request_failed(check, &e),
        };
        if !first.is_success() {
            return check
                .observed(first.status, first.elapsed)
                .fail(format!("First call failed: {}", first.snippet(200)));
        }

        let second = match client.post_json(DECODE_ENDPOINT, &body).await {
            Ok(r) => r,
            Err(e) => return request_failed(check, &e),
        };
        let check = check.observed(second.status, first.elapsed + second.elapsed);
        if !second.is_success() {
            return check.fail(format!("Second call failed: {}", second.snippet(200)));
        }

        let null = Value::Null;
        let comparison = compare_cache_pair(
            first.body.get("vehicle").unwrap_or(&null),
            first.elapsed,
            second.body.get("vehicle").unwrap_or(&null),
            second.elapsed,
            self.cache_tolerance,
        );

        let mut check = check
            .note("first_call_ms", json!(first.elapsed.as_millis() as u64))
            .note("second_call_ms", json!(second.elapsed.as_millis() as u64));
        if let Some(diff) = comparison.slower_by {
            tracing::warn!("⚠️ Cached call for {} was slower by {:?}", test_vin, diff);
            check = check.note("cached_call_slower_ms", json!(diff.as_millis() as u64));
        }

        if comparison.is_consistent() {
            check.pass("cached=false then cached=true/cacheHit=true, data consistent")
        } else {
            check.fail(comparison.problems.join("; "))
        }
    }

    async fn invalid_not_cached(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "Invalid VIN not cached", DECODE_ENDPOINT).expecting(400);
        let body = json!({ "vin": MALFORMED_VIN });

        let mut statuses = Vec::new();
        let mut elapsed = Duration::ZERO;
        for _ in 0..2 {
            match client.post_json(DECODE_ENDPOINT, &body).await {
                Ok(r) => {
                    statuses.push(r.status);
                    elapsed += r.elapsed;
                }
                Err(e) => return request_failed(check, &e),
            }
        }

        let last = statuses.last().copied().unwrap_or_default();
        let check = check.observed(last, elapsed).note("statuses", json!(statuses));
        if statuses.iter().all(|s| *s == 400) {
            check.pass("Repeated invalid requests stay 400")
        } else {
            check.fail(format!("Invalid VIN statuses changed: {:?}", statuses))
        }
    }

    async fn cache_stats(&self, client: &ApiClient) -> CheckResult {
        let check = CheckResult::new(SUITE, "Cache stats", CACHE_STATS_ENDPOINT);
        let outcome = client.get(CACHE_STATS_ENDPOINT).await;
        evaluate(check, outcome, &[200], |check, response| {
            if response.bool_field("success") != Some(true) {
                return check.fail(format!("'success' is not true: {}", response.snippet(200)));
            }
            let stats = response
                .body
                .get("cache")
                .and_then(|cache| serde_json::from_value::<CacheStats>(cache.clone()).ok());
            match stats {
                Some(stats) if stats.status.is_some() => {
                    let detail = format!(
                        "Status: {}, TTL: {}, Max Size: {}",
                        stats.status.as_deref().unwrap_or("-"),
                        stats.ttl.as_deref().unwrap_or("-"),
                        stats.max_size.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
                    );
                    check.note("cache", json!(stats)).pass(detail)
                }
                _ => check.fail(format!("Invalid cache stats structure: {}", response.snippet(200))),
            }
        })
    }
}

#[async_trait]
impl ProbeSuite for VinSuite {
    fn name(&self) -> &str {
        SUITE
    }

    async fn run(&self, client: &ApiClient, context: &mut ProbeContext) -> Result<Vec<CheckResult>> {
        let mut checks = Vec::new();

        for raw_vin in &self.vins {
            checks.push(self.decode_known(client, raw_vin, context).await);
        }
        checks.push(self.missing_vin(client).await);
        checks.push(self.malformed_vin(client).await);

        // 每個快取測試都用新的 VIN，避免前一次執行留下的快取
        for offset in 0..2 {
            let test_vin = vin::unique_test_vin(self.seed + offset);
            checks.push(self.caching_flow(client, &test_vin).await);
        }

        checks.push(self.invalid_not_cached(client).await);
        checks.push(self.cache_stats(client).await);

        Ok(checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(cached: bool, hit: bool, trend: &str) -> Value {
        json!({
            "vin": "1HGBH41JXMN000001",
            "make": "Honda",
            "model": "Civic",
            "year": "2021",
            "marketTrend": trend,
            "decodedAt": "2026-01-01T00:00:00Z",
            "cached": cached,
            "cacheHit": hit
        })
    }

    #[test]
    fn test_consistent_pair() {
        let cmp = compare_cache_pair(
            &vehicle(false, false, "up"),
            Duration::from_millis(400),
            &vehicle(true, true, "down"),
            Duration::from_millis(20),
            Duration::from_millis(250),
        );
        assert!(cmp.is_consistent());
        assert_eq!(cmp.slower_by, None);
    }

    #[test]
    fn test_first_call_already_cached() {
        let cmp = compare_cache_pair(
            &vehicle(true, true, "up"),
            Duration::from_millis(10),
            &vehicle(true, true, "up"),
            Duration::from_millis(10),
            Duration::from_millis(250),
        );
        assert_eq!(cmp.problems.len(), 1);
        assert!(cmp.problems[0].starts_with("First call should not be cached"));
    }

    #[test]
    fn test_data_mismatch_and_slow_second_call() {
        let mut second = vehicle(true, true, "up");
        second["make"] = json!("Acura");
        let cmp = compare_cache_pair(
            &vehicle(false, false, "up"),
            Duration::from_millis(100),
            &second,
            Duration::from_millis(500),
            Duration::from_millis(250),
        );
        assert_eq!(
            cmp.problems,
            vec!["Data differs between cached and non-cached responses".to_string()]
        );
        assert_eq!(cmp.slower_by, Some(Duration::from_millis(400)));
    }

    #[test]
    fn test_missing_cache_hit_flag() {
        let cmp = compare_cache_pair(
            &vehicle(false, false, "up"),
            Duration::ZERO,
            &json!({"make": "Honda", "cached": true}),
            Duration::ZERO,
            Duration::ZERO,
        );
        assert!(cmp.problems.iter().any(|p| p.contains("cacheHit=null")));
    }
}
