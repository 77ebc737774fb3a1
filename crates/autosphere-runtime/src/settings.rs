//! watsonx.ai settings read from the environment

use std::time::Duration;

use autosphere_core::GenerationOptions;
use autosphere_core::provider::DEFAULT_MODEL;

use crate::iam::IAM_TOKEN_URL;

/// Default regional endpoint
pub const DEFAULT_WATSONX_URL: &str = "https://us-south.ml.cloud.ibm.com";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Values copied from the config template that were never filled in
pub fn is_placeholder(value: &str) -> bool {
    value.trim().starts_with("your_")
}

/// Credentials and model settings for the watsonx.ai agent
#[derive(Clone)]
pub struct WatsonxSettings {
    pub url: String,
    pub iam_url: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl Default for WatsonxSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_WATSONX_URL.into(),
            iam_url: IAM_TOKEN_URL.into(),
            api_key: None,
            project_id: None,
            model_id: DEFAULT_MODEL.into(),
            max_tokens: 2000,
            temperature: 0.0,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl WatsonxSettings {
    /// Read settings from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`.
    ///
    /// Blank and placeholder values count as unset; unparsable numbers fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && !is_placeholder(v))
        };
        let defaults = Self::default();

        Self {
            url: get("IBM_URL").unwrap_or(defaults.url),
            iam_url: get("IBM_IAM_URL").unwrap_or(defaults.iam_url),
            api_key: get("IBM_API_KEY"),
            project_id: get("IBM_PROJECT_ID"),
            model_id: get("MODEL_ID").unwrap_or(defaults.model_id),
            max_tokens: get("MAX_TOKENS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
            temperature: get("TEMPERATURE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            request_timeout: get("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map_or(defaults.request_timeout, Duration::from_secs),
        }
    }

    /// Both credentials are present
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.project_id.is_some()
    }

    /// Sampling parameters for the chat model
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.model_id.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..GenerationOptions::default()
        }
    }
}

impl std::fmt::Debug for WatsonxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatsonxSettings")
            .field("url", &self.url)
            .field("iam_url", &self.iam_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("model_id", &self.model_id)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> WatsonxSettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        WatsonxSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s.url, DEFAULT_WATSONX_URL);
        assert_eq!(s.iam_url, IAM_TOKEN_URL);
        assert_eq!(s.model_id, "ibm/granite-3-3-8b-instruct");
        assert_eq!(s.max_tokens, 2000);
        assert_eq!(s.request_timeout, Duration::from_secs(120));
        assert!(!s.has_credentials());
    }

    #[test]
    fn test_placeholders_count_as_unset() {
        let s = settings(&[
            ("IBM_API_KEY", "your_ibm_api_key_here"),
            ("IBM_PROJECT_ID", "   "),
            ("IBM_URL", "your_url"),
        ]);
        assert!(s.api_key.is_none());
        assert!(s.project_id.is_none());
        assert_eq!(s.url, DEFAULT_WATSONX_URL);
    }

    #[test]
    fn test_values_are_read() {
        let s = settings(&[
            ("IBM_API_KEY", "abc"),
            ("IBM_PROJECT_ID", "proj-1"),
            ("MAX_TOKENS", "512"),
            ("TEMPERATURE", "0.5"),
            ("REQUEST_TIMEOUT_SECS", "not-a-number"),
        ]);
        assert!(s.has_credentials());

        let options = s.generation_options();
        assert_eq!(options.max_tokens, 512);
        assert!((options.temperature - 0.5).abs() < f32::EPSILON);
        assert!((options.top_p - 1.0).abs() < f32::EPSILON);
        assert_eq!(s.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let s = settings(&[("IBM_API_KEY", "super-secret")]);
        let printed = format!("{s:?}");
        assert!(!printed.contains("super-secret"));
    }
}
