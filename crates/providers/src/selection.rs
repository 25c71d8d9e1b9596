//! Config-driven backend selection.
//!
//! One backend struct implements all three capability traits, so selection
//! hands out three `Arc` views of the same instance. Swapping the backing
//! model is a config change, never a code change.

use std::sync::Arc;

use tabsplit_config::AppConfig;
use tabsplit_core::audit::SplitAuditor;
use tabsplit_core::error::Error;
use tabsplit_core::extract::ReceiptExtractor;
use tabsplit_core::interpret::CommandInterpreter;

use crate::anthropic::AnthropicModel;
use crate::openai_compat::OpenAiCompatModel;

/// The three AI capabilities, wired to whichever backend config named.
#[derive(Clone)]
pub struct ModelServices {
    pub extractor: Arc<dyn ReceiptExtractor>,
    pub interpreter: Arc<dyn CommandInterpreter>,
    pub auditor: Arc<dyn SplitAuditor>,
}

impl std::fmt::Debug for ModelServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelServices").finish_non_exhaustive()
    }
}

impl ModelServices {
    /// Wrap a single backend that implements all three capabilities.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ReceiptExtractor + CommandInterpreter + SplitAuditor + 'static,
    {
        Self {
            extractor: backend.clone(),
            interpreter: backend.clone(),
            auditor: backend,
        }
    }
}

/// Build the model services named by `default_provider`.
pub fn build_from_config(config: &AppConfig) -> Result<ModelServices, Error> {
    let provider = config.default_provider.as_str();
    let api_key = config.api_key_for(provider).ok_or_else(|| Error::Config {
        message: format!(
            "no API key configured for provider '{provider}' — set TABSPLIT_API_KEY or add it to config.toml"
        ),
    })?;
    let model = config.model_for(provider).to_string();
    let api_url = config
        .providers
        .get(provider)
        .and_then(|p| p.api_url.clone());

    match provider {
        "anthropic" => {
            let mut backend = AnthropicModel::new(api_key, model)
                .with_temperature(config.default_temperature)
                .with_max_tokens(config.default_max_tokens);
            if let Some(url) = api_url {
                backend = backend.with_base_url(url);
            }
            Ok(ModelServices::from_backend(Arc::new(backend)))
        }
        "openai" | "openai_compat" => {
            let base_url = api_url.unwrap_or_else(|| "https://api.openai.com/v1".into());
            let backend = OpenAiCompatModel::new(provider, base_url, api_key, model)
                .with_temperature(config.default_temperature)
                .with_max_tokens(config.default_max_tokens);
            Ok(ModelServices::from_backend(Arc::new(backend)))
        }
        other => Err(Error::Config {
            message: format!("unknown provider '{other}' (expected 'anthropic' or 'openai_compat')"),
        }),
    }
}
