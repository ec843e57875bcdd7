//! Fixtures shared by the stagegraph test suites.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tempfile::TempDir;

use stagegraph_core::config::AppConfig;
use stagegraph_core::error::{Result, StageGraphError};
use stagegraph_graph::{Graph, GraphBuilder};
use stagegraph_pipeline::{Condition, ConfigProvider, DataflowProvider};

/// In-memory config provider with builder-style setters.
#[derive(Debug, Clone)]
pub struct StaticConfig {
    conditions: BTreeMap<u8, bool>,
    task_args: BTreeMap<u8, Value>,
    finishing_condition1: bool,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            conditions: BTreeMap::new(),
            task_args: (1..=7u8).map(|n| (n, Value::from(n * 10))).collect(),
            finishing_condition1: true,
        }
    }
}

fn condition_key(condition: Condition) -> u8 {
    match condition {
        Condition::Condition2 => 2,
        Condition::Condition4 => 4,
        Condition::Condition7 => 7,
    }
}

impl StaticConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: Condition, value: bool) -> Self {
        self.conditions.insert(condition_key(condition), value);
        self
    }

    pub fn with_task_arg(mut self, task: u8, value: impl Into<Value>) -> Self {
        self.task_args.insert(task, value.into());
        self
    }

    pub fn without_task_arg(mut self, task: u8) -> Self {
        self.task_args.remove(&task);
        self
    }

    pub fn with_finishing_condition1(mut self, value: bool) -> Self {
        self.finishing_condition1 = value;
        self
    }
}

impl ConfigProvider for StaticConfig {
    fn condition(&self, condition: Condition) -> bool {
        self.conditions
            .get(&condition_key(condition))
            .copied()
            .unwrap_or(false)
    }

    fn task_arg(&self, task: u8) -> Result<Value> {
        self.task_args
            .get(&task)
            .cloned()
            .ok_or_else(|| StageGraphError::MissingTaskArg(format!("task{task}")))
    }

    fn finishing_condition1(&self) -> bool {
        self.finishing_condition1
    }
}

/// Dataflow fake: a single `work` task, counting how often it is asked.
#[derive(Debug, Default)]
pub struct CountingDataflow {
    calls: AtomicUsize,
}

impl CountingDataflow {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataflowProvider for CountingDataflow {
    fn create_dataflow(&self) -> Result<Graph> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let mut b = GraphBuilder::new("DataflowGraph");
        let start = b.create_start();
        let work = b.create_task("work", n as u64);
        let end = b.create_end();
        b.link_hard(start, work)?;
        b.link_hard(work, end)?;
        b.finish(start, end)
    }
}

/// All `(condition1, flags)` inputs of the finishing builder.
pub fn all_flag_combinations() -> Vec<(bool, StaticConfig)> {
    (0..16u8)
        .map(|bits| {
            let config = StaticConfig::new()
                .with_condition(Condition::Condition2, bits & 2 != 0)
                .with_condition(Condition::Condition4, bits & 4 != 0)
                .with_condition(Condition::Condition7, bits & 8 != 0);
            (bits & 1 != 0, config)
        })
        .collect()
}

/// A config file in a temporary directory. The directory lives as long as
/// the returned guard.
pub struct TempConfig {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TempConfig {
    pub fn load(&self) -> Result<AppConfig> {
        AppConfig::load(&self.path)
    }
}

/// Write `contents` to `stagegraph.toml` in a fresh temporary directory.
pub fn write_temp_config(contents: &str) -> TempConfig {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("stagegraph.toml");
    std::fs::write(&path, contents).expect("write temp config");
    TempConfig { _dir: dir, path }
}

/// Parse a TOML snippet into an [`AppConfig`], panicking on bad input.
pub fn config_from_toml(contents: &str) -> AppConfig {
    toml::from_str(contents).expect("valid test config")
}
