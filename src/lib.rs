pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;
pub mod vision;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::http::ApiClient;
pub use app::suites::build_suites;
pub use config::ProbeConfig;
pub use core::{report::ProbeReport, runner::ProbeRunner};
pub use utils::error::{ProbeError, Result};
pub use vision::{GeminiBackend, VehicleAnalyzer};
