use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StageGraphError};

/// Top-level stagegraph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub flags: FlagsConfig,
    /// Payloads for the finishing-stage tasks, keyed `task1` .. `task7`.
    #[serde(default = "default_task_args")]
    pub task_args: BTreeMap<String, Value>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub dataflow: DataflowConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub log: Option<LogConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            flags: FlagsConfig::default(),
            task_args: default_task_args(),
            pipeline: PipelineConfig::default(),
            dataflow: DataflowConfig::default(),
            render: RenderConfig::default(),
            log: None,
        }
    }
}

/// Boolean switches read once per finishing-graph build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagsConfig {
    #[serde(default)]
    pub condition2: bool,
    #[serde(default)]
    pub condition4: bool,
    /// When false, the optional `task7` branch is spliced into the finishing graph.
    #[serde(default)]
    pub condition7: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// One argument triple per task-dependency graph.
    #[serde(default = "default_task_dependency_args")]
    pub task_dependency_args: Vec<[Value; 3]>,
    #[serde(default = "default_finishing_condition1")]
    pub finishing_condition1: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            task_dependency_args: default_task_dependency_args(),
            finishing_condition1: default_finishing_condition1(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataflowConfig {
    /// Payloads of the chained dataflow stages, in execution order.
    #[serde(default = "default_dataflow_stages")]
    pub stages: Vec<Value>,
}

impl Default for DataflowConfig {
    fn default() -> Self {
        Self {
            stages: default_dataflow_stages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_skin")]
    pub skin: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            skin: default_skin(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_task_args() -> BTreeMap<String, Value> {
    (1..=7u64)
        .map(|n| (format!("task{n}"), Value::from(n)))
        .collect()
}

fn default_task_dependency_args() -> Vec<[Value; 3]> {
    vec![
        [Value::from(1), Value::from(2), Value::from(3)],
        [Value::from(4), Value::from(5), Value::from(6)],
    ]
}

fn default_finishing_condition1() -> bool { true }
fn default_dataflow_stages() -> Vec<Value> {
    ["extract", "transform", "load"].into_iter().map(Value::from).collect()
}
fn default_skin() -> String { "rose".to_string() }
fn default_log_filter() -> String { "stagegraph=info,warn".to_string() }

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "stagegraph.toml";

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The default file was absent; built-in defaults are in effect.
    Defaults { missing: PathBuf },
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                StageGraphError::ConfigNotFound(path.display().to_string())
            }
            _ => StageGraphError::Io(e),
        })?;

        let expanded = expand_env_vars(&content);
        toml::from_str(&expanded).map_err(|e| StageGraphError::Config(e.to_string()))
    }

    /// Pick the configuration for a run.
    ///
    /// An explicit path must exist. Without one, `default_path` is loaded if
    /// present and built-in defaults are used otherwise. Nothing is logged
    /// here so callers can report the source once logging is up.
    pub fn resolve(explicit: Option<&Path>, default_path: &Path) -> Result<(Self, ConfigSource)> {
        let path = match explicit {
            Some(path) => path,
            None if default_path.exists() => default_path,
            None => {
                let source = ConfigSource::Defaults {
                    missing: default_path.to_path_buf(),
                };
                return Ok((Self::default(), source));
            }
        };
        let config = Self::load(path)?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Look up the payload configured for `task{n}`.
    pub fn task_arg(&self, task: u8) -> Result<Value> {
        let key = format!("task{task}");
        self.task_args
            .get(&key)
            .cloned()
            .ok_or(StageGraphError::MissingTaskArg(key))
    }

    /// The log filter to fall back on when `RUST_LOG` is absent.
    pub fn log_filter(&self) -> String {
        self.log
            .as_ref()
            .map(|l| l.filter.clone())
            .unwrap_or_else(default_log_filter)
    }
}

/// Substitute `${NAME}` with the value of environment variable `NAME`.
///
/// Unset variables and an unterminated `${` are left in the text as written,
/// so the TOML parser reports them in context.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(&rest[open..open + 3 + close]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
