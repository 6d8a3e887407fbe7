//! Flattens a validation reply into a single-level record.
//!
//! The verdict flags and the per-component `inferred` flag are best effort:
//! when the service leaves them out they read as `false`. The formatted
//! address and component text are required and are enforced when the raw
//! reply is parsed into a [`ValidationResponse`].

use crate::address_client::AddressValidationClient;
use crate::errors::AppError;
use crate::models::{AddressInput, FieldValue, NormalizedRecord, ValidationResponse};
use serde_json::{Map, Value};

pub const FORMATTED_ADDRESS: &str = "formattedAddress";

pub const VERDICT_FIELDS: [&str; 5] = [
    "inputGranularity",
    "validationGranularity",
    "geocodeGranularity",
    "addressComplete",
    "hasInferredComponents",
];

pub const INFERRED_SUFFIX: &str = "_inferred";

/// Reads `name` from an optional verdict section, mapping absence to `false`.
pub fn verdict_or_false(verdict: Option<&Map<String, Value>>, name: &str) -> FieldValue {
    verdict
        .and_then(|v| v.get(name))
        .map(FieldValue::from_json)
        .unwrap_or(FieldValue::Bool(false))
}

/// Same absence rule for the component-level flag.
pub fn flag_or_false(flag: Option<bool>) -> FieldValue {
    FieldValue::Bool(flag.unwrap_or(false))
}

/// Pure mapping from a parsed reply to a flat record.
///
/// Components are taken in received order; a repeated component type
/// overwrites the earlier value but keeps its original position.
pub fn normalize_response(response: &ValidationResponse) -> NormalizedRecord {
    let address = &response.result.address;
    let verdict = response.result.verdict.as_ref();

    let mut record = NormalizedRecord::with_capacity(
        1 + VERDICT_FIELDS.len() + 2 * address.address_components.len(),
    );
    record.insert(
        FORMATTED_ADDRESS.to_string(),
        FieldValue::Text(address.formatted_address.clone()),
    );

    for name in VERDICT_FIELDS {
        record.insert(name.to_string(), verdict_or_false(verdict, name));
    }

    for component in &address.address_components {
        let key = &component.component_type;
        record.insert(
            key.clone(),
            FieldValue::Text(component.component_name.text.clone()),
        );
        record.insert(
            format!("{}{}", key, INFERRED_SUFFIX),
            flag_or_false(component.inferred),
        );
    }

    record
}

/// Normalizes either free text (validated first, one network call) or an
/// already-fetched reply.
pub async fn normalize(
    client: &AddressValidationClient,
    input: AddressInput,
) -> Result<NormalizedRecord, AppError> {
    let response = match input {
        AddressInput::Text(address) => client.validate(&address).await?,
        AddressInput::Response(response) => response,
    };
    Ok(normalize_response(&response))
}
