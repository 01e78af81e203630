//! Configuration loader for YAML files and environment resolution

use crate::config::types::*;
use crate::errors::KodexError;
use std::env;
use std::path::Path;
use tokio::fs;

/// Environment variables consulted, in order, when no key or key variable is configured.
pub const DEFAULT_API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file. Relative paths inside the file
    /// (such as `chatbot.knowledge_file`) resolve against its directory.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<KodexConfig, KodexError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).await.map_err(|e| {
            KodexError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content, path.parent()).await
    }

    /// Load configuration from a YAML string
    pub async fn from_str(
        content: &str,
        base_dir: Option<&Path>,
    ) -> Result<KodexConfig, KodexError> {
        let mut config: KodexConfig = if content.trim().is_empty() {
            KodexConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| KodexError::Config(format!("Failed to parse YAML config: {}", e)))?
        };

        Self::resolve_gateway_auth(&mut config.gateway.auth);
        Self::resolve_knowledge(&mut config.chatbot, base_dir).await?;

        config.validate()?;

        Ok(config)
    }

    /// Defaults plus environment resolution, for running without a file.
    pub async fn from_env() -> Result<KodexConfig, KodexError> {
        Self::from_str("", None).await
    }

    fn resolve_gateway_auth(auth: &mut GatewayAuth) {
        if let Some(env_var) = &auth.api_key_env {
            if let Ok(api_key) = env::var(env_var) {
                auth.api_key = Some(api_key);
            }
        }

        if auth.api_key.is_none() && auth.api_key_env.is_none() {
            auth.api_key = DEFAULT_API_KEY_VARS
                .iter()
                .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()));
        }
    }

    async fn resolve_knowledge(
        chatbot: &mut ChatbotConfig,
        base_dir: Option<&Path>,
    ) -> Result<(), KodexError> {
        let file = match &chatbot.knowledge_file {
            Some(file) => file.clone(),
            None => return Ok(()),
        };

        let path = match base_dir {
            Some(dir) if file.is_relative() => dir.join(&file),
            _ => file,
        };

        let text = fs::read_to_string(&path).await.map_err(|e| {
            KodexError::Config(format!(
                "Failed to read knowledge file {}: {}",
                path.display(),
                e
            ))
        })?;

        log::info!(
            "Loaded {} bytes of chatbot knowledge from {}",
            text.len(),
            path.display()
        );

        if chatbot.knowledge.trim().is_empty() {
            chatbot.knowledge = text;
        } else {
            chatbot.knowledge = format!("{}\n\n{}", chatbot.knowledge.trim_end(), text);
        }

        Ok(())
    }
}
