use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::errors::GenerationError;

pub mod gemini;

/// Everything the model needs for one generation.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub instruction: String,
    pub schema: Value,
    pub temperature: f32,
}

/// A generative model endpoint. Returns the raw response text; an empty
/// string means the service answered but produced nothing.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, call: &ModelCall) -> Result<String, GenerationError>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

pub fn make_provider(cfg: &Config) -> Result<DynProvider> {
    let api_key = cfg
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow!("GEMINI_API_KEY (or API_KEY) is not set"))?;

    Ok(Box::new(gemini::GeminiProvider::new(
        cfg.model.clone(),
        api_key,
        cfg.api_base.clone(),
        cfg.timeout_secs,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_reported() {
        let cfg = Config { api_key: None, ..Config::default() };
        let err = make_provider(&cfg).err().unwrap();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let cfg = Config { api_key: Some("  ".into()), ..Config::default() };
        assert!(make_provider(&cfg).is_err());
    }

    #[test]
    fn provider_built_with_key() {
        let cfg = Config { api_key: Some("k".into()), ..Config::default() };
        assert!(make_provider(&cfg).is_ok());
    }
}
