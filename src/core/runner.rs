use crate::adapters::http::ApiClient;
use crate::core::report::ProbeReport;
use crate::domain::model::CheckResult;
use crate::domain::ports::ProbeSuite;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::time::Instant;

/// 執行上下文，用於在 suite 之間傳遞數據
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub run_id: String,
    pub shared_data: HashMap<String, serde_json::Value>,
    results: Vec<CheckResult>,
}

impl ProbeContext {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            shared_data: HashMap::new(),
            results: Vec::new(),
        }
    }

    /// 添加共享數據
    pub fn add_shared_data(&mut self, key: &str, value: serde_json::Value) {
        self.shared_data.insert(key.to_string(), value);
    }

    pub fn get_shared_data(&self, key: &str) -> Option<&serde_json::Value> {
        self.shared_data.get(key)
    }

    pub fn get_shared_str(&self, key: &str) -> Option<&str> {
        self.get_shared_data(key).and_then(|v| v.as_str())
    }

    fn record(&mut self, checks: Vec<CheckResult>) {
        self.results.extend(checks);
    }

    fn into_results(self) -> Vec<CheckResult> {
        self.results
    }
}

/// 依序執行多個 suite
pub struct ProbeRunner {
    suites: Vec<Box<dyn ProbeSuite>>,
    fail_fast: bool,
    run_id: String,
}

impl ProbeRunner {
    pub fn new(run_id: String) -> Self {
        Self {
            suites: Vec::new(),
            fail_fast: false,
            run_id,
        }
    }

    /// 第一個失敗的 suite 之後停止
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn add_suite(&mut self, suite: Box<dyn ProbeSuite>) {
        self.suites.push(suite);
    }

    pub fn suite_names(&self) -> Vec<&str> {
        self.suites.iter().map(|s| s.name()).collect()
    }

    pub async fn run_all(&self, client: &ApiClient) -> Result<ProbeReport> {
        let mut context = ProbeContext::new(self.run_id.clone());
        let started = Instant::now();

        tracing::info!(
            "🚀 Starting probe run {} against {} ({} suites)",
            self.run_id,
            client.base_url(),
            self.suites.len()
        );

        for suite in &self.suites {
            if !suite.should_run(&context) {
                tracing::info!("⏭️ Skipping suite: {} (condition not met)", suite.name());
                continue;
            }

            let suite_start = Instant::now();
            let checks = match suite.run(client, &mut context).await {
                Ok(checks) => checks,
                Err(e) => {
                    tracing::error!("❌ Suite {} aborted: {}", suite.name(), e);
                    vec![CheckResult::new(suite.name(), "Suite execution", client.base_url())
                        .fail(format!("{} ({})", e.user_friendly_message(), e.recovery_suggestion()))]
                }
            };

            let failed = checks.iter().filter(|c| c.failed()).count();
            tracing::info!(
                "✅ Suite finished: {} (checks: {}, failed: {}, duration: {:?})",
                suite.name(),
                checks.len(),
                failed,
                suite_start.elapsed()
            );

            context.record(checks);

            if self.fail_fast && failed > 0 {
                tracing::warn!("🛑 Fail-fast enabled, stopping after suite {}", suite.name());
                break;
            }
        }

        Ok(ProbeReport::new(
            self.run_id.clone(),
            client.base_url().to_string(),
            context.into_results(),
            started.elapsed(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ProbeError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticSuite {
        name: String,
        outcome: Vec<bool>,
        run_condition: bool,
        publish: Option<(String, String)>,
        require: Option<String>,
    }

    impl StaticSuite {
        fn new(name: &str, outcome: Vec<bool>) -> Self {
            Self {
                name: name.to_string(),
                outcome,
                run_condition: true,
                publish: None,
                require: None,
            }
        }
    }

    #[async_trait]
    impl ProbeSuite for StaticSuite {
        fn name(&self) -> &str {
            &self.name
        }

        fn should_run(&self, _context: &ProbeContext) -> bool {
            self.run_condition
        }

        async fn run(&self, _client: &ApiClient, context: &mut ProbeContext) -> Result<Vec<CheckResult>> {
            if let Some(key) = &self.require {
                if context.get_shared_str(key).is_none() {
                    return Err(ProbeError::ConfigError {
                        message: format!("missing shared value {}", key),
                    });
                }
            }
            if let Some((k, v)) = &self.publish {
                context.add_shared_data(k, serde_json::Value::String(v.clone()));
            }
            Ok(self
                .outcome
                .iter()
                .enumerate()
                .map(|(i, ok)| {
                    let check = CheckResult::new(&self.name, &format!("check {}", i), "api/test");
                    if *ok {
                        check.pass("ok")
                    } else {
                        check.fail("nope")
                    }
                })
                .collect())
        }
    }

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:3000", Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn test_runs_suites_in_order_and_shares_context() {
        let mut producer = StaticSuite::new("producer", vec![true]);
        producer.publish = Some(("uid".to_string(), "abc".to_string()));
        let mut consumer = StaticSuite::new("consumer", vec![true, false]);
        consumer.require = Some("uid".to_string());

        let mut runner = ProbeRunner::new("run-1".to_string());
        runner.add_suite(Box::new(producer));
        runner.add_suite(Box::new(consumer));

        let report = runner.run_all(&client()).await.unwrap();
        assert_eq!(report.checks.len(), 3);
        assert_eq!(report.checks[0].suite, "producer");
        assert_eq!(report.checks[2].suite, "consumer");
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_suite_error_becomes_failed_check() {
        let mut consumer = StaticSuite::new("consumer", vec![true]);
        consumer.require = Some("uid".to_string());
        let mut runner = ProbeRunner::new("run-2".to_string());
        runner.add_suite(Box::new(consumer));
        runner.add_suite(Box::new(StaticSuite::new("after", vec![true])));

        let report = runner.run_all(&client()).await.unwrap();
        assert_eq!(report.checks.len(), 2);
        assert!(report.checks[0].failed());
        assert_eq!(report.checks[0].name, "Suite execution");
        assert!(report.checks[1].passed());
    }

    #[tokio::test]
    async fn test_skipped_suite_and_fail_fast() {
        let mut skipped = StaticSuite::new("skipped", vec![true]);
        skipped.run_condition = false;

        let mut runner = ProbeRunner::new("run-3".to_string()).with_fail_fast(true);
        runner.add_suite(Box::new(skipped));
        runner.add_suite(Box::new(StaticSuite::new("failing", vec![false])));
        runner.add_suite(Box::new(StaticSuite::new("never", vec![true])));

        assert_eq!(runner.suite_names(), vec!["skipped", "failing", "never"]);
        let report = runner.run_all(&client()).await.unwrap();
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].suite, "failing");
    }
}
