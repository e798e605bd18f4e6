use crate::domain::model::{CheckResult, CheckStatus};
use crate::utils::error::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct CriticalStatus {
    pub admin_apis_working: bool,
    pub core_apis_working: bool,
}

/// 一次執行的所有檢查結果
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub run_id: String,
    pub base_url: String,
    pub generated_at: String,
    #[serde(serialize_with = "serialize_ms")]
    pub duration: Duration,
    pub checks: Vec<CheckResult>,
}

/// CSV 匯出的扁平列
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    suite: &'a str,
    name: &'a str,
    endpoint: &'a str,
    status: CheckStatus,
    expected_status: Option<u16>,
    actual_status: Option<u16>,
    elapsed_ms: u64,
    detail: &'a str,
}

fn serialize_ms<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn is_admin_endpoint(endpoint: &str) -> bool {
    endpoint.to_lowercase().contains("admin")
}

impl ProbeReport {
    pub fn new(run_id: String, base_url: String, checks: Vec<CheckResult>, duration: Duration) -> Self {
        Self {
            run_id,
            base_url,
            generated_at: chrono::Utc::now().to_rfc3339(),
            duration,
            checks,
        }
    }

    pub fn passed(&self) -> usize {
        self.count(CheckStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CheckStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CheckStatus::Skipped)
    }

    /// 實際執行的檢查數（不含略過）
    pub fn total_run(&self) -> usize {
        self.passed() + self.failed()
    }

    pub fn success_rate(&self) -> f64 {
        match self.total_run() {
            0 => 0.0,
            total => self.passed() as f64 / total as f64 * 100.0,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn admin_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| is_admin_endpoint(&c.endpoint))
    }

    pub fn core_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !is_admin_endpoint(&c.endpoint))
    }

    pub fn critical_status(&self) -> CriticalStatus {
        CriticalStatus {
            admin_apis_working: self.admin_checks().any(|c| c.passed()),
            core_apis_working: self.checks.iter().any(|c| {
                c.passed()
                    && (c.endpoint.contains("vin-decode") || c.endpoint.contains("analyze-vehicle"))
            }),
        }
    }

    fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// 產生人類可讀的摘要
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);

        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "📊 PROBE RESULTS ({})", self.base_url);
        let _ = writeln!(out, "{}", rule);

        let _ = writeln!(out, "\n🔧 ADMIN API ENDPOINTS:");
        for check in self.admin_checks() {
            render_check(&mut out, check);
        }

        let _ = writeln!(out, "\n🚀 CORE API ENDPOINTS:");
        for check in self.core_checks() {
            render_check(&mut out, check);
        }

        let _ = writeln!(out, "\n📈 OVERALL RESULTS:");
        let _ = writeln!(out, "   Total Tests: {}", self.total_run());
        let _ = writeln!(out, "   Passed: {}", self.passed());
        let _ = writeln!(out, "   Failed: {}", self.failed());
        if self.skipped() > 0 {
            let _ = writeln!(out, "   Skipped: {}", self.skipped());
        }
        let _ = writeln!(out, "   Success Rate: {:.1}%", self.success_rate());
        let _ = writeln!(out, "   Duration: {:?}", self.duration);

        let critical = self.critical_status();
        let _ = writeln!(out, "\n🎯 CRITICAL FUNCTIONALITY STATUS:");
        let _ = writeln!(out, "   Admin APIs: {}", working_label(critical.admin_apis_working));
        let _ = writeln!(out, "   Core APIs: {}", working_label(critical.core_apis_working));

        out
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for check in &self.checks {
            writer.serialize(CsvRow {
                suite: &check.suite,
                name: &check.name,
                endpoint: &check.endpoint,
                status: check.status,
                expected_status: check.expected_status,
                actual_status: check.actual_status,
                elapsed_ms: check.elapsed.as_millis() as u64,
                detail: &check.detail,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn working_label(ok: bool) -> &'static str {
    if ok {
        "✅ WORKING"
    } else {
        "❌ FAILING"
    }
}

fn render_check(out: &mut String, check: &CheckResult) {
    let label = match check.status {
        CheckStatus::Passed => "✅ PASS",
        CheckStatus::Failed => "❌ FAIL",
        CheckStatus::Skipped => "⚠️  SKIP",
    };
    let _ = writeln!(out, "   {} - {}", label, check.name);
    if check.failed() {
        if let Some(expected) = check.expected_status {
            let actual = check
                .actual_status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "ERROR".to_string());
            let _ = writeln!(out, "      Expected: {}, Got: {}", expected, actual);
        }
    }
    if !check.detail.is_empty() {
        let _ = writeln!(out, "      {}", check.detail);
    }
}
