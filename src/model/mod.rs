pub mod message;
pub mod openai;
pub mod oracle;

use async_trait::async_trait;

use crate::error::Result;

pub use message::{ChatMessage, CompletionRequest, ModelTurn, Role};
pub use openai::OpenAiCompatClient;
pub use oracle::OracleModel;

/// Language-model collaborator. Implementations must be safe to share across tasks; any
/// per-conversation state travels in the request.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelTurn>;

    fn model_id(&self) -> String;
}
