pub mod client;
pub mod engine;
pub mod ledger;
pub mod merger;
pub mod normalize;
pub mod retry;
pub mod source;
pub mod summary;
pub mod types;

pub use client::{GenerationClient, MockGenerationClient, OpenAiCompatClient};
pub use engine::{EnrichmentEngine, EnrichmentReport};
pub use ledger::Ledger;
pub use merger::DigestMerger;
pub use retry::RetryPolicy;
pub use source::{ArticleSource, WorklistSource};
pub use types::*;
