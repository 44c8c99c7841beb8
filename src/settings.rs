use anyhow::{Context, Result};
use serde::Deserialize;

const CONFIG_FILE: &str = "sutian";
const ENV_PREFIX: &str = "SUTIAN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    /// `lui` query parameter; `tai_ku` searches Taiwanese example sentences.
    pub lookup_mode: String,
    pub timeout_secs: u64,
    pub pacing_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub accept_invalid_certs: bool,
    pub user_agents: Vec<String>,
    pub db_path: String,
    pub source_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://sutian.moe.edu.tw/zh-hant/tshiau/".into(),
            lookup_mode: "tai_ku".into(),
            timeout_secs: 15,
            pacing_ms: 2500,
            max_retries: 3,
            backoff_ms: 2000,
            accept_invalid_certs: true,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".into(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".into(),
                "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".into(),
            ],
            db_path: "data/sutian.sqlite".into(),
            source_label: "教育部臺灣台語常用詞辭典".into(),
        }
    }
}

impl Settings {
    /// Defaults, then `sutian.toml` if present, then `SUTIAN_*` env vars.
    pub fn load() -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_source() {
        let s: Settings = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.lookup_mode, "tai_ku");
        assert_eq!(s.pacing_ms, 2500);
        assert_eq!(s.timeout_secs, 15);
        assert!(!s.user_agents.is_empty());
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let s: Settings = config::Config::builder()
            .set_override("pacing_ms", 0)
            .unwrap()
            .set_override("db_path", "/tmp/x.sqlite")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.pacing_ms, 0);
        assert_eq!(s.db_path, "/tmp/x.sqlite");
        assert_eq!(s.max_retries, 3);
    }
}
