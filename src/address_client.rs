use crate::config::Config;
use crate::errors::AppError;
use crate::models::{ValidationRequest, ValidationResponse};
use serde_json::Value;
use std::time::Duration;

/// Client for the address validation endpoint.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct AddressValidationClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl AddressValidationClient {
    /// Creates a new `AddressValidationClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint URL, API key and per-call timeout.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create validation client: {}", e))
            })?;

        // Build URL with proper parameter encoding; the key travels as a query parameter
        let endpoint = reqwest::Url::parse_with_params(
            &config.validation_url,
            &[("key", config.api_key.as_str())],
        )
        .map_err(|e| AppError::ConfigError(format!("Failed to build URL: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    /// Validates a free-text address and returns the reply as raw JSON.
    ///
    /// One outbound call per invocation. Transport errors, non-success
    /// statuses and non-JSON bodies are returned as `ExternalApiError`.
    pub async fn validate_raw(&self, address: &str) -> Result<Value, AppError> {
        let body = ValidationRequest::single_line(address);

        // Redact key from logs to prevent credential exposure
        tracing::debug!(
            "POST {}?key=[REDACTED] for address: {}",
            self.endpoint_without_query(),
            address
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!(
                    "Validation request failed: {}",
                    e.without_url()
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Validation service returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Validation service returned status {}: {}",
                status, error_text
            )));
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!(
                "Failed to parse validation response: {}",
                e.without_url()
            ))
        })?;

        Ok(data)
    }

    /// Validates a free-text address and parses the reply.
    pub async fn validate(&self, address: &str) -> Result<ValidationResponse, AppError> {
        let raw = self.validate_raw(address).await?;
        ValidationResponse::from_value(&raw)
    }

    fn endpoint_without_query(&self) -> String {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.to_string()
    }
}
