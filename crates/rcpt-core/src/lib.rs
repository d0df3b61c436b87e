//! Core library for structured receipt extraction.
//!
//! This crate provides:
//! - Image loading with media type detection and `data:` URL encoding
//! - A schema-constrained extraction client for Azure OpenAI vision deployments
//! - A sequential batch driver that writes one JSON file per image

pub mod batch;
pub mod client;
pub mod error;
pub mod loader;
pub mod models;

pub use batch::{BatchObserver, BatchProcessor, BatchReport, FileOutcome, NoopObserver};
pub use client::{AzureOpenAiClient, ReceiptExtractor};
pub use error::{ImageError, RcptError, Result, ServiceError};
pub use loader::{ImageLoader, image_to_data_url, media_type_for};
pub use models::config::{AzureSettings, RcptConfig};
pub use models::receipt::{ExtractionRequest, ExtractionResult};
