use std::env;
use std::path::PathBuf;

use url::Url;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: Url,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, url::ParseError> {
        let raw = env::var("TASKFLOW_SERVER_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        Ok(Self {
            server_url: Url::parse(&raw)?,
            log_file: env::temp_dir().join("taskflow-tui.log"),
        })
    }
}
