use crate::errors::AppError;

pub const DEFAULT_VALIDATION_URL: &str =
    "https://addressvalidation.googleapis.com/v1:validateAddress";

/// Settings for the address validation endpoint, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub validation_url: String,
    pub api_key: String,
    /// Maximum number of validation calls in flight.
    pub concurrency: usize,
    /// Per-call timeout for the validation endpoint.
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Self {
            validation_url: std::env::var("ADDRESS_VALIDATION_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VALIDATION_URL.to_string()),
            api_key: std::env::var("ADDRESS_VALIDATION_API_KEY")
                .map_err(|_| {
                    AppError::ConfigError(
                        "ADDRESS_VALIDATION_API_KEY environment variable required".to_string(),
                    )
                })?,
            concurrency: std::env::var("VALIDATION_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .map_err(|_| {
                    AppError::ConfigError(
                        "VALIDATION_CONCURRENCY must be a positive integer".to_string(),
                    )
                })?,
            timeout_secs: std::env::var("VALIDATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    AppError::ConfigError(
                        "VALIDATION_TIMEOUT_SECS must be a number of seconds".to_string(),
                    )
                })?,
        };

        config.validate()?;

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Validation URL: {}", config.validation_url);
        tracing::debug!(
            "Concurrency: {}, timeout: {}s",
            config.concurrency,
            config.timeout_secs
        );

        Ok(config)
    }

    /// Checks the values regardless of where they came from.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::ConfigError(
                "ADDRESS_VALIDATION_API_KEY cannot be empty".to_string(),
            ));
        }
        if !self.validation_url.starts_with("http://")
            && !self.validation_url.starts_with("https://")
        {
            return Err(AppError::ConfigError(
                "ADDRESS_VALIDATION_URL must start with http:// or https://".to_string(),
            ));
        }
        url::Url::parse(&self.validation_url).map_err(|e| {
            AppError::ConfigError(format!("ADDRESS_VALIDATION_URL is not a valid URL: {}", e))
        })?;
        if self.concurrency == 0 {
            return Err(AppError::ConfigError(
                "VALIDATION_CONCURRENCY must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "VALIDATION_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
