//! The full pipeline: two task-dependency graphs, two dataflow graphs and a
//! finishing graph composed into one.
//!
//! * the first dataflow's end is associated with both task-dependency entries
//! * the second dataflow starts once the second task-dependency graph is
//!   done, triggered by either of them
//! * the finishing graph runs after the second dataflow

use tracing::info;

use stagegraph_core::config::AppConfig;
use stagegraph_core::error::{Result, StageGraphError};
use stagegraph_graph::{Composer, Graph};

use crate::dataflow::{DataflowProvider, StagedDataflow};
use crate::finishing::finishing_graph;
use crate::provider::ConfigProvider;
use crate::task_dependency::task_dependency_graph;

pub const PIPELINE_GRAPH: &str = "ExampleGraph";

/// Cluster aliases of the composed subgraphs.
pub mod alias {
    pub const TASK_DEPENDENCY_1: &str = "taskDependencyGraph1";
    pub const TASK_DEPENDENCY_2: &str = "taskDependencyGraph2";
    pub const DATAFLOW_1: &str = "dataflowGraph1";
    pub const DATAFLOW_2: &str = "dataflowGraph2";
    pub const FINISHING: &str = "finishingGraph";
}

pub fn build_full_graph(
    config: &dyn ConfigProvider,
    dataflow: &dyn DataflowProvider,
) -> Result<Graph> {
    let mut args = config.task_dependency_args().into_iter();
    let (Some(args1), Some(args2)) = (args.next(), args.next()) else {
        return Err(StageGraphError::Config(
            "pipeline.task_dependency_args needs two argument triples".to_string(),
        ));
    };

    let td1 = task_dependency_graph(args1)?;
    let td2 = task_dependency_graph(args2)?;
    let df1 = dataflow.create_dataflow()?;
    let df2 = dataflow.create_dataflow()?;
    let fin = finishing_graph(config.finishing_condition1(), config)?;

    let mut composer = Composer::new(PIPELINE_GRAPH);
    let td1 = composer.add(alias::TASK_DEPENDENCY_1, td1)?;
    let td2 = composer.add(alias::TASK_DEPENDENCY_2, td2)?;
    let df1 = composer.add(alias::DATAFLOW_1, df1)?;
    let df2 = composer.add(alias::DATAFLOW_2, df2)?;
    let fin = composer.add(alias::FINISHING, fin)?;

    composer.fan_in(df1.end, &[td1.entry, td2.entry])?;
    composer.gate(df2.entry, td2.end, td1.end)?;
    composer.sequence(df2, fin)?;

    let graph = composer.finish(df1.entry, fin.end)?;
    info!(entry = %graph.entry(), end = %graph.end(), "Built full pipeline graph");
    Ok(graph)
}

/// [`build_full_graph`] with the config's own dataflow stages.
pub fn build_from_config(config: &AppConfig) -> Result<Graph> {
    let dataflow = StagedDataflow::from_config(&config.dataflow);
    build_full_graph(config, &dataflow)
}
