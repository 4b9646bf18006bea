use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_SETTINGS_PATH: &str = ".nexus-leads/settings.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Default store base URL; the local settings file may override it.
    pub store_url: String,
    /// Default store API key; the local settings file may override it.
    pub store_api_key: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub settings_path: PathBuf,
    pub http_timeout_secs: u64,
}

fn require_http_url(name: &str, value: String) -> anyhow::Result<String> {
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    url::Url::parse(&value).map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    Ok(value.trim_end_matches('/').to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            store_url: std::env::var("STORE_URL")
                .or_else(|_| std::env::var("SUPABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("STORE_URL or SUPABASE_URL environment variable required")
                })
                .and_then(|url| require_http_url("STORE_URL", url))?,
            store_api_key: std::env::var("STORE_API_KEY")
                .or_else(|_| std::env::var("SUPABASE_KEY"))
                .map_err(|_| {
                    anyhow::anyhow!("STORE_API_KEY or SUPABASE_KEY environment variable required")
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("STORE_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .map_err(|_| {
                    anyhow::anyhow!("GEMINI_API_KEY or API_KEY environment variable required")
                })
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("GEMINI_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| require_http_url("GEMINI_BASE_URL", url))
                .transpose()?
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            settings_path: std::env::var("SETTINGS_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH)),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a whole number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Store URL (default): {}", config.store_url);
        tracing::debug!("Gemini Base URL: {}", config.gemini_base_url);
        tracing::debug!("Gemini Model: {}", config.gemini_model);
        tracing::debug!("Settings Path: {}", config.settings_path.display());
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_http_url() {
        assert_eq!(
            require_http_url("STORE_URL", "https://abc.supabase.co/".into()).unwrap(),
            "https://abc.supabase.co"
        );
        assert!(require_http_url("STORE_URL", "".into()).is_err());
        assert!(require_http_url("STORE_URL", "ftp://abc".into()).is_err());
        assert!(require_http_url("STORE_URL", "https://".into()).is_err());
    }
}
