use anyhow::{Context, Result};
use fs_err as fs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::Args;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Resolved settings: defaults, then an optional TOML file, then the
/// environment (`.env` included), then command-line flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub timeout_secs: u64,
    pub save_response: bool,
    pub ephemeral: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            api_base: DEFAULT_API_BASE.into(),
            api_key: None,
            data_dir: PathBuf::from(".stockprompt"),
            export_dir: PathBuf::from("."),
            timeout_secs: 120,
            save_response: false,
            ephemeral: false,
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self> {
        dotenvy::dotenv().ok(); // .env is optional

        let mut cfg = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.apply_args(args);
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("GEMINI_API_KEY").or_else(|| var("API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = var("STOCKPROMPT_MODEL") {
            self.model = model;
        }
        if let Some(base) = var("STOCKPROMPT_API_BASE") {
            self.api_base = base;
        }
        if let Some(dir) = var("STOCKPROMPT_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(model) = &args.model {
            self.model = model.clone();
        }
        if let Some(dir) = &args.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(secs) = args.timeout_secs {
            self.timeout_secs = secs;
        }
        self.save_response |= args.save_response;
        self.ephemeral |= args.ephemeral;
    }
}
