use serde_json::Value;
use tracing::debug;

use stagegraph_core::error::Result;
use stagegraph_graph::{Graph, GraphBuilder};

pub const TASK_DEPENDENCY_GRAPH: &str = "TaskDependencyGraph";

/// Build the fixed diamond: `task2` and `task3` wait for `task1`, and the
/// end waits for whichever of them finishes first.
pub fn task_dependency_graph(args: [Value; 3]) -> Result<Graph> {
    let [arg1, arg2, arg3] = args;
    let mut b = GraphBuilder::new(TASK_DEPENDENCY_GRAPH);

    let start = b.create_start();
    let task1 = b.create_task("task1", arg1);
    let task2 = b.create_task("task2", arg2);
    let task3 = b.create_task("task3", arg3);
    let end = b.create_end();

    b.link_hard(start, task1)?;
    b.link_hard(task1, task2)?;
    b.link_hard(task1, task3)?;
    b.link_soft(task2, end)?;
    b.link_soft(task3, end)?;

    let graph = b.finish(start, end)?;
    debug!(entry = %graph.entry(), end = %graph.end(), "Built task dependency graph");
    Ok(graph)
}
