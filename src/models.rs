use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AppError;

// ============ Validation Service Models ============

/// Request envelope sent to the validation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRequest {
    pub address: PostalAddressInput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddressInput {
    pub address_lines: Vec<String>,
}

impl ValidationRequest {
    /// Wraps free text as the single address line of a request.
    pub fn single_line(address: &str) -> Self {
        Self {
            address: PostalAddressInput {
                address_lines: vec![address.to_string()],
            },
        }
    }
}

/// Top-level reply of the validation endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationResponse {
    pub result: ValidationResult,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationResult {
    pub address: ValidatedAddress,
    /// Quality flags; the service may omit the whole section.
    #[serde(default)]
    pub verdict: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedAddress {
    pub formatted_address: String,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

/// One structured piece of an address (street number, route, locality...).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressComponent {
    pub component_type: String,
    pub component_name: ComponentName,
    /// Set when the service derived the value rather than reading it from input.
    #[serde(default)]
    pub inferred: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentName {
    pub text: String,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl ValidationResponse {
    /// Parses a raw JSON reply. A missing `formattedAddress` or component
    /// text fails here.
    pub fn from_value(value: &Value) -> Result<Self, AppError> {
        Self::deserialize(value).map_err(|e| {
            AppError::MalformedResponse(format!("Failed to parse validation response: {}", e))
        })
    }
}

// ============ Normalized Output ============

/// A flattened value: text for components and granularity enums, bool for flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Converts a verdict value; anything that is neither bool nor string
    /// keeps its JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

/// Field name -> value, in insertion order.
pub type NormalizedRecord = IndexMap<String, FieldValue>;

/// What the normalizer accepts: free text still to be validated, or a
/// reply that has already been fetched.
#[derive(Debug, Clone)]
pub enum AddressInput {
    Text(String),
    Response(ValidationResponse),
}

impl From<&str> for AddressInput {
    fn from(s: &str) -> Self {
        AddressInput::Text(s.to_string())
    }
}
