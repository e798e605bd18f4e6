use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日誌一律寫到 stderr，stdout 留給報告與 JSON 結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

fn probe_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let filter = match (format, verbose) {
        (_, true) => probe_filter("appraisal_probe=debug,info"),
        (LogFormat::Json, false) => probe_filter("appraisal_probe=info"),
        (LogFormat::Compact, false) => probe_filter("appraisal_probe=warn"),
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => registry.with(layer.compact()).init(),
        // CI 收集用
        LogFormat::Json => registry.with(layer.json()).init(),
    }
}
