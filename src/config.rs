use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm_provider: LLMProvider,
    pub openai_api_key: String,
    pub openai_url: String,
    pub openai_model: String,
    pub openai_image_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub storage: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LLMProvider {
    OpenAI,
    Ollama,
}

/// Which key/value backend mirrors the project list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    File,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "file" | "json" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_provider: LLMProvider::OpenAI,
            openai_api_key: String::new(),
            openai_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_image_model: "dall-e-3".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
            storage: StorageBackend::Sqlite,
        }
    }
}

impl AppConfig {
    /// Reads `config.json` from the data directory, writing the defaults on
    /// first run. An unreadable file yields the defaults.
    pub fn load(app_data: &Path) -> Self {
        let config_path = app_data.join("config.json");
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str::<Self>(&content).unwrap_or_else(|e| {
                    log::warn!("Ignoring invalid {}: {}", config_path.display(), e);
                    Self::default()
                }),
                Err(e) => {
                    log::warn!("Could not read {}: {}", config_path.display(), e);
                    Self::default()
                }
            }
        } else {
            let c = Self::default();
            if let Err(e) = c.save(app_data) {
                log::warn!("Could not write default config: {:#}", e);
            }
            c
        };

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.openai_api_key = key;
            }
        }

        if let Ok(storage) = std::env::var("MEDIASPARK_STORAGE") {
            match storage.parse() {
                Ok(backend) => config.storage = backend,
                Err(e) => log::warn!("Ignoring MEDIASPARK_STORAGE: {}", e),
            }
        }

        config
    }

    pub fn save(&self, app_data: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(app_data)
            .with_context(|| format!("Failed to create {}", app_data.display()))?;
        let config_path = app_data.join("config.json");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }

    /// `MEDIASPARK_DATA_DIR`, or `mediaspark` under the platform data dir.
    pub fn default_data_dir() -> anyhow::Result<PathBuf> {
        if let Ok(dir) = std::env::var("MEDIASPARK_DATA_DIR") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }

        let base = dirs::data_dir().context("Failed to determine the user data directory")?;
        Ok(base.join("mediaspark"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path());

        assert_eq!(config.openai_model, "gpt-4o");
        assert!(dir.path().join("config.json").exists());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"llm_provider":"Ollama","ollama_model":"llama3.2-vision"}"#,
        )
        .unwrap();

        let config = AppConfig::load(dir.path());
        assert_eq!(config.llm_provider, LLMProvider::Ollama);
        assert_eq!(config.ollama_model, "llama3.2-vision");
        assert_eq!(config.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "not json").unwrap();

        let config = AppConfig::load(dir.path());
        assert_eq!(config.llm_provider, LLMProvider::OpenAI);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.openai_image_model = "dall-e-2".to_string();
        config.save(dir.path()).unwrap();

        let loaded = AppConfig::load(dir.path());
        assert_eq!(loaded.openai_image_model, "dall-e-2");
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("SQLite".parse::<StorageBackend>(), Ok(StorageBackend::Sqlite));
        assert_eq!("json".parse::<StorageBackend>(), Ok(StorageBackend::File));
        assert!("redis".parse::<StorageBackend>().is_err());
    }
}
