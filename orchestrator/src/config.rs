use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::str::FromStr;

use crate::models::ResearchDepth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    Brave,
    Serper,
    Google,
}

impl FromStr for SearchProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brave" => Ok(SearchProviderKind::Brave),
            "serper" => Ok(SearchProviderKind::Serper),
            "google" => Ok(SearchProviderKind::Google),
            other => Err(format!("unknown search provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub search_provider: SearchProviderKind,
    pub brave_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub search_delay_ms: u64,
    pub search_max_retries: u32,
    pub max_refinement_passes: usize,
    pub research_depth: ResearchDepth,
    pub http_timeout_secs: u64,
    pub reports_per_minute: u32,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            port: parse(&get, "PORT", 8080)?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: or("OPENAI_MODEL", "gpt-4o-mini"),
            temperature: parse(&get, "OPENAI_TEMPERATURE", 0.7)?,
            max_tokens: parse(&get, "OPENAI_MAX_TOKENS", 4096)?,
            search_provider: parse(&get, "SEARCH_PROVIDER", SearchProviderKind::Brave)?,
            brave_api_key: get("BRAVE_API_KEY"),
            serper_api_key: get("SERPER_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            google_cse_id: get("GOOGLE_CSE_ID"),
            search_delay_ms: parse(&get, "SEARCH_DELAY_MS", 1000)?,
            search_max_retries: parse(&get, "SEARCH_MAX_RETRIES", 2)?,
            max_refinement_passes: parse(&get, "MAX_REFINEMENT_PASSES", 1)?,
            research_depth: parse(&get, "RESEARCH_DEPTH", ResearchDepth::Basic)?,
            http_timeout_secs: parse(&get, "HTTP_TIMEOUT_SECS", 60)?,
            reports_per_minute: parse(&get, "REPORTS_PER_MINUTE", 6)?,
            log_level: or("LOG_LEVEL", "info"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.openai_api_key.is_none() {
            bail!("OPENAI_API_KEY must be set");
        }
        if self.reports_per_minute == 0 {
            bail!("REPORTS_PER_MINUTE must be greater than zero");
        }
        match self.search_provider {
            SearchProviderKind::Brave if self.brave_api_key.is_none() => {
                bail!("BRAVE_API_KEY must be set when SEARCH_PROVIDER=brave")
            }
            SearchProviderKind::Serper if self.serper_api_key.is_none() => {
                bail!("SERPER_API_KEY must be set when SEARCH_PROVIDER=serper")
            }
            SearchProviderKind::Google
                if self.google_api_key.is_none() || self.google_cse_id.is_none() =>
            {
                bail!("GOOGLE_API_KEY and GOOGLE_CSE_ID must be set when SEARCH_PROVIDER=google")
            }
            _ => Ok(()),
        }
    }
}

fn parse<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("BRAVE_API_KEY", "brave"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.search_provider, SearchProviderKind::Brave);
        assert_eq!(config.max_refinement_passes, 1);
        assert_eq!(config.search_delay_ms, 1000);
        assert_eq!(config.research_depth, ResearchDepth::Basic);
    }

    #[test]
    fn selected_provider_needs_its_key() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SEARCH_PROVIDER", "serper"),
            ("BRAVE_API_KEY", "brave"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SERPER_API_KEY"));
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("BRAVE_API_KEY", "brave"),
            ("MAX_REFINEMENT_PASSES", "many"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MAX_REFINEMENT_PASSES"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("GOOGLE_API_KEY", "g"),
            ("GOOGLE_CSE_ID", "cx"),
            ("SEARCH_PROVIDER", "Google"),
            ("PORT", "  "),
            ("RESEARCH_DEPTH", "advanced"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.search_provider, SearchProviderKind::Google);
        assert_eq!(config.research_depth, ResearchDepth::Advanced);
    }
}
