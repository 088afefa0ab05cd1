//! Locating the port file a running REPL writes on startup.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rpc::NreplError;

/// Which kind of REPL we are talking to. Decides the port file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplKind {
    #[default]
    Clj,
    Cljs,
}

impl ReplKind {
    /// Port file path relative to the project directory.
    pub fn port_file(&self) -> &'static str {
        match self {
            ReplKind::Clj => ".nrepl-port",
            ReplKind::Cljs => ".shadow-cljs/nrepl.port",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ReplKind::Clj => "Clojure",
            ReplKind::Cljs => "ClojureScript",
        }
    }
}

impl FromStr for ReplKind {
    type Err = NreplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clj" => Ok(ReplKind::Clj),
            "cljs" => Ok(ReplKind::Cljs),
            other => Err(NreplError::InvalidReplKind(other.to_string())),
        }
    }
}

impl fmt::Display for ReplKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplKind::Clj => f.write_str("clj"),
            ReplKind::Cljs => f.write_str("cljs"),
        }
    }
}

/// Where to look for the port file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Start directory, then each parent up to the filesystem root.
    #[default]
    Ancestors,
    /// Start directory only.
    WorkingDirectory,
}

/// A port file that was found and read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortFile {
    pub path: PathBuf,
    /// Port text with whitespace and trailing `%` removed.
    pub port: String,
}

impl PortFile {
    pub fn port_number(&self) -> Result<u16, NreplError> {
        self.port.parse().map_err(|_| NreplError::InvalidPort {
            path: self.path.clone(),
            port: self.port.clone(),
        })
    }
}

/// Strip the noise some tools leave around the port number.
pub fn clean_port_contents(contents: &str) -> String {
    contents.trim().trim_end_matches('%').to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortLocator {
    kind: ReplKind,
    mode: SearchMode,
    start_dir: Option<PathBuf>,
}

impl PortLocator {
    pub fn new(kind: ReplKind, mode: SearchMode) -> Self {
        Self {
            kind,
            mode,
            start_dir: None,
        }
    }

    /// Search from `dir` instead of the process working directory.
    pub fn with_start_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(dir.into());
        self
    }

    pub fn kind(&self) -> ReplKind {
        self.kind
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    fn start(&self) -> Result<PathBuf, NreplError> {
        resolve_start(self.start_dir.as_deref(), std::env::current_dir)
    }

    pub fn locate(&self) -> Result<PortFile, NreplError> {
        let start = self.start()?;
        let file = self.kind.port_file();

        let found = match self.mode {
            SearchMode::Ancestors => start
                .ancestors()
                .map(|dir| dir.join(file))
                .find(|candidate| candidate.exists()),
            SearchMode::WorkingDirectory => Some(start.join(file)).filter(|p| p.exists()),
        };

        match found {
            Some(path) => read_port_file(&path),
            None => {
                debug!("No {} found searching from {}", file, start.display());
                Err(NreplError::PortNotFound {
                    file,
                    scope: match self.mode {
                        SearchMode::Ancestors => "current directory or any parent directories",
                        SearchMode::WorkingDirectory => "current directory",
                    },
                    repl: self.kind.display_name(),
                })
            }
        }
    }
}

/// `cwd` is only consulted when `start_dir` is relative or missing.
fn resolve_start<F>(start_dir: Option<&Path>, cwd: F) -> Result<PathBuf, NreplError>
where
    F: FnOnce() -> std::io::Result<PathBuf>,
{
    Ok(match start_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => cwd()?.join(dir),
        None => cwd()?,
    })
}

fn read_port_file(path: &Path) -> Result<PortFile, NreplError> {
    let contents = std::fs::read_to_string(path).map_err(|source| NreplError::PortFileUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let port = clean_port_contents(&contents);
    debug!("Read port {} from {}", port, path.display());
    Ok(PortFile {
        path: path.to_path_buf(),
        port,
    })
}
