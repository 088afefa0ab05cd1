use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::port_file::{PortLocator, ReplKind, SearchMode};
use crate::rpc::{EvalLimits, NreplError};

fn default_host() -> String {
    "localhost".to_string()
}

/// Client settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub repl_type: ReplKind,
    #[serde(default)]
    pub search: SearchMode,
    #[serde(default = "default_host")]
    pub host: String,
    /// Directory the port search starts from. Defaults to the working
    /// directory.
    #[serde(default)]
    pub start_dir: Option<PathBuf>,
    #[serde(default)]
    pub max_frames: Option<usize>,
    #[serde(default)]
    pub eval_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            repl_type: ReplKind::default(),
            search: SearchMode::default(),
            host: default_host(),
            start_dir: None,
            max_frames: None,
            eval_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn for_kind(repl_type: ReplKind) -> Self {
        Self {
            repl_type,
            ..Self::default()
        }
    }

    /// Load a JSON config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, NreplError> {
        let path = path.as_ref();
        debug!("Loading nREPL client config from {:?}", path);
        let text = fs::read_to_string(path).await?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, NreplError> {
        serde_json::from_str(text).map_err(|e| NreplError::Config(e.to_string()))
    }

    /// Build from `NREPL_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, NreplError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NreplError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(kind) = lookup("NREPL_REPL_TYPE") {
            config.repl_type = kind.parse()?;
        }
        if let Some(host) = lookup("NREPL_HOST") {
            config.host = host;
        }
        if let Some(search) = lookup("NREPL_PORT_SEARCH") {
            config.search = match search.as_str() {
                "ancestors" => SearchMode::Ancestors,
                "cwd" | "working_directory" => SearchMode::WorkingDirectory,
                other => {
                    return Err(NreplError::Config(format!(
                        "NREPL_PORT_SEARCH must be 'ancestors' or 'cwd', got {:?}",
                        other
                    )))
                }
            };
        }
        if let Some(dir) = lookup("NREPL_START_DIR") {
            config.start_dir = Some(PathBuf::from(dir));
        }
        if let Some(frames) = lookup("NREPL_MAX_FRAMES") {
            config.max_frames = Some(parse_number("NREPL_MAX_FRAMES", &frames)?);
        }
        if let Some(secs) = lookup("NREPL_EVAL_TIMEOUT_SECS") {
            config.eval_timeout_secs = Some(parse_number("NREPL_EVAL_TIMEOUT_SECS", &secs)?);
        }

        Ok(config)
    }

    pub fn limits(&self) -> EvalLimits {
        EvalLimits {
            max_frames: self.max_frames,
            timeout: self.eval_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn locator(&self) -> PortLocator {
        let locator = PortLocator::new(self.repl_type, self.search);
        match &self.start_dir {
            Some(dir) => locator.with_start_dir(dir.clone()),
            None => locator,
        }
    }
}

fn parse_number<N: std::str::FromStr>(key: &str, raw: &str) -> Result<N, NreplError> {
    raw.trim()
        .parse()
        .map_err(|_| NreplError::Config(format!("{} must be a number, got {:?}", key, raw)))
}
