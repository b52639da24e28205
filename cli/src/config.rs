use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use std::path::PathBuf;

use forma_core::ai::DEFAULT_MODEL;

const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

pub struct Config {
    pub db_path: PathBuf,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub groq_url: String,
    pub supabase: Option<SupabaseConfig>,
}

impl Config {
    /// Read `.env` (if any), then the environment.
    pub fn load() -> Result<Self> {
        // a missing .env is fine
        let _ = dotenvy::dotenv();

        let proj_dirs =
            ProjectDirs::from("", "", "forma").context("Could not determine home directory")?;
        let data_dir = proj_dirs.data_dir().to_path_buf();

        Self::from_lookup(|key| std::env::var(key).ok(), data_dir)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, data_dir: PathBuf) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = match var("FORMA_DB_PATH") {
            Some(p) => PathBuf::from(p),
            None => {
                std::fs::create_dir_all(&data_dir).with_context(|| {
                    format!("Failed to create data directory: {}", data_dir.display())
                })?;
                data_dir.join("forma.db")
            }
        };

        let supabase = match (var("FORMA_SUPABASE_URL"), var("FORMA_SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            (None, None) => None,
            _ => bail!("Set both FORMA_SUPABASE_URL and FORMA_SUPABASE_ANON_KEY"),
        };

        Ok(Config {
            db_path,
            groq_api_key: var("FORMA_GROQ_API_KEY"),
            groq_model: var("FORMA_GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            groq_url: var("FORMA_GROQ_URL").unwrap_or_else(|| DEFAULT_GROQ_URL.to_string()),
            supabase,
        })
    }

    pub fn groq_api_key(&self) -> Result<&str> {
        self.groq_api_key
            .as_deref()
            .context("FORMA_GROQ_API_KEY is not set. Add it to your environment or a .env file")
    }

    pub fn supabase(&self) -> Result<&SupabaseConfig> {
        self.supabase.as_ref().context(
            "Cloud backup is not configured. Set FORMA_SUPABASE_URL and FORMA_SUPABASE_ANON_KEY",
        )
    }
}
