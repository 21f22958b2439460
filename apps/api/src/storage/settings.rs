//! User settings persisted under the stable keys: credential, model, output budget,
//! selected platforms/style, the description draft and the system-prompt override.

use serde::{Deserialize, Serialize};

use super::{keys, load, save, KvStore, StorageError};
use crate::config::Config;
use crate::generation::prompts::AD_SYSTEM_PROMPT;
use crate::platforms::AdStyle;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub token: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub platforms: Vec<String>,
    pub style: AdStyle,
    pub description: String,
    pub custom_prompt: Option<String>,
}

impl Settings {
    /// Reads every key, filling gaps from configuration defaults.
    pub async fn load(store: &dyn KvStore, config: &Config) -> Result<Self, StorageError> {
        Ok(Self {
            token: load::<String>(store, keys::HH_TOKEN)
                .await?
                .filter(|t| !t.trim().is_empty()),
            model: load(store, keys::HH_MODEL)
                .await?
                .unwrap_or_else(|| config.llm_model.clone()),
            max_tokens: load(store, keys::AD_MAX_TOKENS)
                .await?
                .unwrap_or(config.llm_max_tokens),
            platforms: load(store, keys::AD_PLATFORMS).await?.unwrap_or_default(),
            style: load(store, keys::AD_STYLE).await?.unwrap_or_default(),
            description: load(store, keys::AD_DESCRIPTION).await?.unwrap_or_default(),
            custom_prompt: load::<String>(store, keys::AD_CUSTOM_PROMPT)
                .await?
                .filter(|p| !p.trim().is_empty()),
        })
    }

    /// The writer prompt: the user's override or the built-in one.
    pub fn system_prompt(&self) -> &str {
        self.custom_prompt.as_deref().unwrap_or(AD_SYSTEM_PROMPT)
    }

    pub fn view(&self) -> SettingsView {
        SettingsView {
            token_set: self.token.is_some(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            platforms: self.platforms.clone(),
            style: self.style,
            description: self.description.clone(),
            system_prompt: self.system_prompt().to_string(),
            custom_prompt: self.custom_prompt.is_some(),
        }
    }
}

/// What the panel sees. The token itself is never echoed back.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub token_set: bool,
    pub model: String,
    pub max_tokens: u32,
    pub platforms: Vec<String>,
    pub style: AdStyle,
    pub description: String,
    pub system_prompt: String,
    /// True when `system_prompt` is a user override.
    pub custom_prompt: bool,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub token: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub platforms: Option<Vec<String>>,
    pub style: Option<AdStyle>,
    pub description: Option<String>,
    /// An empty or default-identical prompt resets to the built-in one.
    pub system_prompt: Option<String>,
}

impl SettingsUpdate {
    pub async fn apply(self, store: &dyn KvStore) -> Result<(), StorageError> {
        if let Some(token) = self.token {
            save(store, keys::HH_TOKEN, token.trim()).await?;
        }
        if let Some(model) = self.model {
            save(store, keys::HH_MODEL, model.trim()).await?;
        }
        if let Some(max_tokens) = self.max_tokens {
            save(store, keys::AD_MAX_TOKENS, &max_tokens).await?;
        }
        if let Some(platforms) = self.platforms {
            save(store, keys::AD_PLATFORMS, &platforms).await?;
        }
        if let Some(style) = self.style {
            save(store, keys::AD_STYLE, &style).await?;
        }
        if let Some(description) = self.description {
            save(store, keys::AD_DESCRIPTION, &description).await?;
        }
        if let Some(prompt) = self.system_prompt {
            let prompt = prompt.trim();
            if prompt.is_empty() || prompt == AD_SYSTEM_PROMPT {
                store.set(keys::AD_CUSTOM_PROMPT, serde_json::Value::Null).await?;
            } else {
                save(store, keys::AD_CUSTOM_PROMPT, prompt).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    #[tokio::test]
    async fn test_defaults_come_from_config() {
        let store = MemoryStore::new();
        let config = Config::for_tests();
        let settings = Settings::load(&store, &config).await.unwrap();
        assert_eq!(settings.model, config.llm_model);
        assert_eq!(settings.max_tokens, 4096);
        assert_eq!(settings.style, AdStyle::Balanced);
        assert_eq!(settings.system_prompt(), AD_SYSTEM_PROMPT);
        assert!(!settings.view().token_set);
    }

    #[tokio::test]
    async fn test_partial_update_and_token_is_not_echoed() {
        let store = MemoryStore::new();
        SettingsUpdate {
            token: Some(" secret-token ".into()),
            platforms: Some(vec!["tgads".into()]),
            style: Some(AdStyle::Formal),
            ..Default::default()
        }
        .apply(&store)
        .await
        .unwrap();

        let settings = Settings::load(&store, &Config::for_tests()).await.unwrap();
        assert_eq!(settings.token.as_deref(), Some("secret-token"));
        assert_eq!(settings.platforms, vec!["tgads"]);
        assert_eq!(settings.style, AdStyle::Formal);

        let view = serde_json::to_value(settings.view()).unwrap();
        assert_eq!(view["token_set"], true);
        assert!(!view.to_string().contains("secret-token"));
    }

    #[tokio::test]
    async fn test_empty_custom_prompt_resets_to_builtin() {
        let store = MemoryStore::new();
        let config = Config::for_tests();
        SettingsUpdate {
            system_prompt: Some("Пиши коротко.".into()),
            ..Default::default()
        }
        .apply(&store)
        .await
        .unwrap();
        assert_eq!(
            Settings::load(&store, &config).await.unwrap().system_prompt(),
            "Пиши коротко."
        );

        SettingsUpdate {
            system_prompt: Some("   ".into()),
            ..Default::default()
        }
        .apply(&store)
        .await
        .unwrap();
        let settings = Settings::load(&store, &config).await.unwrap();
        assert_eq!(settings.system_prompt(), AD_SYSTEM_PROMPT);
        assert!(!settings.view().custom_prompt);
    }
}
