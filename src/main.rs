use appraisal_probe::utils::error::{ErrorCategory, ProbeError};
use appraisal_probe::utils::logger::{init_logger, LogFormat};
use appraisal_probe::{build_suites, ApiClient, CliConfig, ProbeReport, ProbeRunner};
use clap::Parser;
use std::time::Duration;

/// 設定錯誤為 2，其他錯誤為 1
fn exit_code_for(e: &ProbeError) -> i32 {
    match e.category() {
        ErrorCategory::Configuration => 2,
        _ => 1,
    }
}

fn fail(e: &ProbeError) -> ! {
    tracing::error!(
        "❌ Probe run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(exit_code_for(e));
}

fn export_report(report: &ProbeReport, cli: &CliConfig) -> Result<(), ProbeError> {
    if let Some(path) = &cli.report_json {
        report.write_json(path)?;
        tracing::info!("📁 JSON report saved to: {}", path);
    }
    if let Some(path) = &cli.report_csv {
        report.write_csv(path)?;
        tracing::info!("📁 CSV report saved to: {}", path);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let log_format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_logger(log_format, cli.verbose);

    tracing::info!("Starting appraisal-probe");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = cli.resolve().unwrap_or_else(|e| fail(&e));

    let headers = config.target.headers.clone().unwrap_or_default();
    let client = ApiClient::with_headers(
        &config.target.base_url,
        Duration::from_secs(config.target.timeout_seconds),
        &headers,
    )
    .unwrap_or_else(|e| fail(&e));

    let mut runner = ProbeRunner::new(cli.run_id()).with_fail_fast(config.suites.fail_fast);
    for suite in build_suites(&config) {
        runner.add_suite(suite);
    }
    tracing::info!("📦 Suites: {}", runner.suite_names().join(", "));

    let report = runner.run_all(&client).await.unwrap_or_else(|e| fail(&e));

    println!("{}", report.render());

    if let Err(e) = export_report(&report, &cli) {
        fail(&e);
    }

    if report.has_failures() {
        std::process::exit(1);
    }
}
