pub mod dataflow;
pub mod finishing;
pub mod pipeline;
pub mod provider;
pub mod task_dependency;

pub use dataflow::{DataflowProvider, StagedDataflow};
pub use finishing::{finishing_graph, FinishingFlags, FinishingShape};
pub use pipeline::{build_from_config, build_full_graph};
pub use provider::{Condition, ConfigProvider};
pub use task_dependency::task_dependency_graph;
