pub mod analyzer;
pub mod gemini;
pub mod imaging;
pub mod parser;
pub mod prompts;
pub mod request;

pub use analyzer::VehicleAnalyzer;
pub use gemini::GeminiBackend;
