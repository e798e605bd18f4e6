pub mod report;
pub mod runner;

pub use crate::domain::model::{CheckResult, CheckStatus};
pub use crate::domain::ports::{ProbeSuite, VisionBackend};
pub use crate::utils::error::Result;
