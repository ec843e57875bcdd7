use serde_json::Value;

use stagegraph_core::config::AppConfig;
use stagegraph_core::error::Result;

/// Boolean switches consulted by the finishing-graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Condition2,
    Condition4,
    Condition7,
}

/// Configuration source for the graph builders.
pub trait ConfigProvider: Send + Sync {
    /// Current value of a boolean switch.
    fn condition(&self, condition: Condition) -> bool;

    /// Payload for the finishing task `task{task}`.
    fn task_arg(&self, task: u8) -> Result<Value>;

    /// Argument triples, one per task-dependency graph.
    fn task_dependency_args(&self) -> Vec<[Value; 3]> {
        vec![
            [Value::from(1), Value::from(2), Value::from(3)],
            [Value::from(4), Value::from(5), Value::from(6)],
        ]
    }

    /// `condition1` passed to the finishing graph of the full pipeline.
    fn finishing_condition1(&self) -> bool {
        true
    }
}

impl ConfigProvider for AppConfig {
    fn condition(&self, condition: Condition) -> bool {
        match condition {
            Condition::Condition2 => self.flags.condition2,
            Condition::Condition4 => self.flags.condition4,
            Condition::Condition7 => self.flags.condition7,
        }
    }

    fn task_arg(&self, task: u8) -> Result<Value> {
        AppConfig::task_arg(self, task)
    }

    fn task_dependency_args(&self) -> Vec<[Value; 3]> {
        self.pipeline.task_dependency_args.clone()
    }

    fn finishing_condition1(&self) -> bool {
        self.pipeline.finishing_condition1
    }
}
