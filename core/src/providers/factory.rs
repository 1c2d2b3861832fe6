use crate::config::Config;
use crate::providers::openai::OPENROUTER_BASE_URL;
use crate::providers::{OllamaClient, OpenAIClient};
use crate::traits::CompletionClient;
use anyhow::{Result, anyhow};
use std::sync::Arc;

pub fn create_client(config: &Config) -> Result<Arc<dyn CompletionClient>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    match provider_name.to_lowercase().as_str() {
        "ollama" => {
            let mut client = OllamaClient::new()
                .with_model(config.model.clone())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url.clone());
            }
            Ok(Arc::new(client))
        }
        "openai" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "REAGENT_OPENAI_API_KEY"],
                &config.api_key,
            )?;
            let mut client = OpenAIClient::new(api_key)
                .with_model(config.model.clone())
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url.clone());
            }
            Ok(Arc::new(client))
        }
        "openrouter" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENROUTER_API_KEY", "REAGENT_OPENROUTER_API_KEY"],
                &config.api_key,
            )?;
            let base_url = config.base_url.as_deref().unwrap_or(OPENROUTER_BASE_URL);
            let client = OpenAIClient::new(api_key)
                .with_model(config.model.clone())
                .with_temperature(config.temperature)
                .with_base_url(base_url);
            Ok(Arc::new(client))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: openai, openrouter, ollama",
            provider_name
        )),
    }
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.is_empty()
        {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set {} or api_key in the config",
            env_vars.join(" or ")
        ))
    }
}
