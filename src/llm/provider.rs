//! The completion-provider seam and credential-driven model selection.

use std::fmt;

use async_trait::async_trait;

use crate::error::CompletionError;

/// Default OpenAI-compatible endpoint for the hosted key and OpenRouter keys.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used for the main changelog synthesis on the hosted key.
pub const DEFAULT_SMART_MODEL: &str = "arcee-ai/trinity-large-preview:free";
/// Model used for quick internal classification and rewriting tasks.
pub const DEFAULT_FAST_MODEL: &str = "tngtech/deepseek-r1t2-chimera:free";

const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
const OPENAI_MODEL: &str = "gpt-4o";

/// Structured output modes a request may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    JsonObject,
}

/// An API key plus the endpoint it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential {
    pub api_key: String,
    pub base_url: String,
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// One chat-completion exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub response_format: Option<ResponseFormat>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub model: String,
    /// Per-call endpoint override. `None` uses the provider's own configuration.
    pub credential: Option<ApiCredential>,
}

/// A remote text-completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Run one completion and return the assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}

/// The pair of models a generation run uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSet {
    /// Internal classification, diff rewriting and version suggestion.
    pub fast: String,
    /// The final changelog synthesis on the hosted key.
    pub smart: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            fast: DEFAULT_FAST_MODEL.to_string(),
            smart: DEFAULT_SMART_MODEL.to_string(),
        }
    }
}

/// Vendors a bring-your-own key can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    OpenRouter,
    Anthropic,
    OpenAi,
}

impl Vendor {
    /// Identify the vendor from the key's prefix.
    ///
    /// `sk-or-` is checked before the generic `sk-` so OpenRouter keys are not
    /// mistaken for OpenAI keys.
    pub fn detect(api_key: &str) -> Self {
        if api_key.starts_with("sk-or-") {
            Vendor::OpenRouter
        } else if api_key.starts_with("sk-ant") {
            Vendor::Anthropic
        } else if api_key.starts_with("sk-") {
            Vendor::OpenAi
        } else {
            Vendor::OpenRouter
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Vendor::OpenRouter => OPENROUTER_BASE_URL,
            Vendor::Anthropic => ANTHROPIC_BASE_URL,
            Vendor::OpenAi => OPENAI_BASE_URL,
        }
    }

    /// The vendor's own flagship model, or `None` to route the hosted default.
    pub fn model(&self) -> Option<&'static str> {
        match self {
            Vendor::OpenRouter => None,
            Vendor::Anthropic => Some(ANTHROPIC_MODEL),
            Vendor::OpenAi => Some(OPENAI_MODEL),
        }
    }
}

/// Which credential the final synthesis call runs under.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProviderConfig {
    /// The service's own key and endpoint.
    #[default]
    Hosted,
    /// A caller-supplied key.
    Byok {
        vendor: Vendor,
        credential: ApiCredential,
    },
}

impl ProviderConfig {
    /// Resolve an optional caller key (and optional endpoint) into a configuration.
    pub fn from_api_key(api_key: Option<&str>, base_url: Option<&str>) -> Self {
        let Some(api_key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
            return ProviderConfig::Hosted;
        };

        let vendor = Vendor::detect(api_key);
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| vendor.default_base_url().to_string());

        ProviderConfig::Byok {
            vendor,
            credential: ApiCredential {
                api_key: api_key.to_string(),
                base_url,
            },
        }
    }

    /// Model id for the synthesis call.
    pub fn model(&self, models: &ModelSet) -> String {
        match self {
            ProviderConfig::Hosted => models.smart.clone(),
            ProviderConfig::Byok { vendor, .. } => vendor
                .model()
                .map(str::to_string)
                .unwrap_or_else(|| models.smart.clone()),
        }
    }

    /// Model id for the small internal calls, such as version suggestion.
    ///
    /// A vendor key must name that vendor's model; the hosted fast model only
    /// exists behind the hosted endpoint and OpenRouter.
    pub fn fast_model(&self, models: &ModelSet) -> String {
        match self {
            ProviderConfig::Hosted => models.fast.clone(),
            ProviderConfig::Byok { vendor, .. } => vendor
                .model()
                .map(str::to_string)
                .unwrap_or_else(|| models.fast.clone()),
        }
    }

    /// Endpoint override to attach to the synthesis request.
    pub fn credential(&self) -> Option<&ApiCredential> {
        match self {
            ProviderConfig::Hosted => None,
            ProviderConfig::Byok { credential, .. } => Some(credential),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_model_follows_vendor() {
        let models = ModelSet::default();
        assert_eq!(ProviderConfig::Hosted.fast_model(&models), DEFAULT_FAST_MODEL);
        assert_eq!(
            ProviderConfig::from_api_key(Some("sk-proj-1"), None).fast_model(&models),
            OPENAI_MODEL
        );
        assert_eq!(
            ProviderConfig::from_api_key(Some("sk-or-v1-1"), None).fast_model(&models),
            DEFAULT_FAST_MODEL
        );
    }

    #[test]
    fn test_no_key_is_hosted() {
        assert_eq!(ProviderConfig::from_api_key(None, None), ProviderConfig::Hosted);
        assert_eq!(ProviderConfig::from_api_key(Some("  "), None), ProviderConfig::Hosted);
    }

    #[test]
    fn test_anthropic_key_selects_claude() {
        let config = ProviderConfig::from_api_key(Some("sk-ant-api03-xyz"), None);
        assert_eq!(config.model(&ModelSet::default()), ANTHROPIC_MODEL);
        assert_eq!(config.credential().unwrap().base_url, ANTHROPIC_BASE_URL);
    }

    #[test]
    fn test_openai_key_selects_gpt() {
        let config = ProviderConfig::from_api_key(Some("sk-proj-abc"), None);
        assert_eq!(config.model(&ModelSet::default()), OPENAI_MODEL);
    }

    #[test]
    fn test_openrouter_key_is_not_mistaken_for_openai() {
        let config = ProviderConfig::from_api_key(Some("sk-or-v1-abc"), None);
        assert!(matches!(
            config,
            ProviderConfig::Byok {
                vendor: Vendor::OpenRouter,
                ..
            }
        ));
        assert_eq!(config.model(&ModelSet::default()), DEFAULT_SMART_MODEL);
    }

    #[test]
    fn test_custom_base_url_is_kept_without_trailing_slash() {
        let config = ProviderConfig::from_api_key(Some("key"), Some("https://llm.internal/v1/"));
        assert_eq!(config.credential().unwrap().base_url, "https://llm.internal/v1");
    }

    #[test]
    fn test_credential_debug_redacts_key() {
        let credential = ApiCredential {
            api_key: "sk-secret".to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        };
        assert!(!format!("{:?}", credential).contains("sk-secret"));
    }
}
