//! Structured extraction clients.

mod azure;

pub use azure::AzureOpenAiClient;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::receipt::{ExtractionRequest, ExtractionResult};

/// Trait for services that answer the receipt questions for one image.
///
/// Implementations make at most one remote call per invocation and never
/// retry; the batch driver only depends on this trait so a fake can stand in
/// for the hosted model.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    /// Extract the four receipt fields from the request's image.
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult, ServiceError>;
}
