use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::hierarchy::MaxDepth;
use crate::models::SortDirection;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// How the command line front end prints a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshot file read when none is given on the command line
    pub snapshot: Option<PathBuf>,
    pub sort_ascending: bool,
    pub include_charges: bool,
    /// `-1` for unbounded
    pub max_depth: i64,
    pub output: OutputFormat,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot: env::var("ACTHISTORY_SNAPSHOT").ok().map(PathBuf::from),
            sort_ascending: parse_env_or("ACTHISTORY_SORT_ASCENDING", true),
            include_charges: parse_env_or("ACTHISTORY_INCLUDE_CHARGES", true),
            max_depth: parse_env_or("ACTHISTORY_MAX_DEPTH", -1),
            output: parse_env_or("ACTHISTORY_OUTPUT", OutputFormat::Text),
            log_json: parse_env_or("ACTHISTORY_LOG_JSON", false),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Load settings from a TOML or JSON file. `ACTHISTORY_*` environment
    /// variables take precedence over the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix("ACTHISTORY").try_parsing(true))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.depth().map(|_| ())
    }

    pub fn depth(&self) -> Result<MaxDepth> {
        MaxDepth::from_depth(self.max_depth)
    }

    pub fn direction(&self) -> SortDirection {
        SortDirection::from_ascending(self.sort_ascending)
    }
}
