use crate::adapters::http::ApiClient;
use crate::core::runner::ProbeContext;
use crate::domain::model::{CheckResult, EncodedImage};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 一組針對同一類端點的檢查
#[async_trait]
pub trait ProbeSuite: Send + Sync {
    fn name(&self) -> &str;

    /// 根據上下文決定是否執行
    fn should_run(&self, _context: &ProbeContext) -> bool {
        true
    }

    async fn run(&self, client: &ApiClient, context: &mut ProbeContext) -> Result<Vec<CheckResult>>;
}

/// 視覺語言模型的對話介面
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn generate(
        &self,
        system_message: &str,
        prompt: &str,
        images: &[EncodedImage],
    ) -> Result<String>;

    fn model_name(&self) -> &str;
}
