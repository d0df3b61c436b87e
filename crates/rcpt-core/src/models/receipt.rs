//! Receipt extraction request and result models.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Schema name announced to the structured-output endpoint.
pub const RESULT_SCHEMA_NAME: &str = "ExtractedAnswers";

/// Instruction sent as the user text alongside every image.
pub const DEFAULT_PROMPT: &str = "Based on this image, answer the questions:
1) What is the name of the business?
2) What is the address of the business?
3) What is the date of the transaction?
4) What is the total charge in the receipt? Include currency";

/// Instruction sent as the system message.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an AI helpful assistant that extracts information from documents.";

/// One image plus the instruction to send with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Natural-language instruction.
    pub prompt_text: String,

    /// Raw file contents.
    pub image_bytes: Vec<u8>,

    /// Media type inferred from the file extension.
    pub media_type: String,
}

impl ExtractionRequest {
    /// Create a new request.
    pub fn new(
        prompt_text: impl Into<String>,
        image_bytes: Vec<u8>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            image_bytes,
            media_type: media_type.into(),
        }
    }

    /// Embeddable representation: `data:<media type>;base64,<payload>`.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            STANDARD.encode(&self.image_bytes)
        )
    }
}

/// The four fields answered by the model for a receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExtractionResult {
    /// Name of the business.
    pub business_name: String,

    /// Address of the business.
    pub business_address: String,

    /// Date of the transaction, as printed.
    pub transaction_date: String,

    /// Total charge including currency.
    pub total_charge: String,
}

impl ExtractionResult {
    /// JSON schema of this type in the strict structured-output dialect.
    ///
    /// Every property is required and no additional properties are allowed.
    pub fn json_schema() -> serde_json::Value {
        let fields = Self::field_names();
        let properties: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|name| ((*name).to_string(), serde_json::json!({ "type": "string" })))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": fields,
            "additionalProperties": false,
        })
    }

    /// Wire names of the fields, in declaration order.
    pub fn field_names() -> [&'static str; 4] {
        [
            "businessName",
            "businessAddress",
            "transactionDate",
            "totalCharge",
        ]
    }

    /// Return a list of fields the model left blank.
    pub fn validate(&self) -> Vec<String> {
        let values = [
            &self.business_name,
            &self.business_address,
            &self.transaction_date,
            &self.total_charge,
        ];

        Self::field_names()
            .iter()
            .zip(values)
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| format!("Missing {}", name))
            .collect()
    }

    /// Render as indented JSON with non-ASCII text kept literal.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
