// KB Sync Infrastructure - AWS Bedrock Agent Adapter
// Implements: IngestionService (StartIngestionJob / GetIngestionJob)

mod client;
mod convert;
mod error;

pub use client::BedrockIngestionService;
pub use error::classify_error_code;

// Note: SdkError conversion lives in helper functions because of the orphan
// rule (cannot implement From<SdkError<..>> for RemoteError here)
