use serde_json::Value;
use tracing::debug;

use stagegraph_core::config::DataflowConfig;
use stagegraph_core::error::Result;
use stagegraph_graph::{Graph, GraphBuilder};

pub const DATAFLOW_GRAPH: &str = "DataflowGraph";

/// Supplies the dataflow subgraphs of the pipeline.
///
/// Every call must return a graph with fresh node identities.
pub trait DataflowProvider: Send + Sync {
    fn create_dataflow(&self) -> Result<Graph>;
}

/// Default dataflow: a hard chain `start -> stage.. -> end`.
#[derive(Debug, Clone)]
pub struct StagedDataflow {
    stages: Vec<Value>,
}

impl StagedDataflow {
    pub fn new(stages: Vec<Value>) -> Self {
        Self { stages }
    }

    pub fn from_config(config: &DataflowConfig) -> Self {
        Self::new(config.stages.clone())
    }
}

/// String stages label themselves; anything else is numbered.
fn stage_label(index: usize, stage: &Value) -> String {
    match stage.as_str() {
        Some(name) => name.to_string(),
        None => format!("stage{}", index + 1),
    }
}

impl DataflowProvider for StagedDataflow {
    fn create_dataflow(&self) -> Result<Graph> {
        let mut b = GraphBuilder::new(DATAFLOW_GRAPH);
        let start = b.create_start();
        let mut prev = start;
        for (i, stage) in self.stages.iter().enumerate() {
            let node = b.create_task(stage_label(i, stage), stage.clone());
            b.link_hard(prev, node)?;
            prev = node;
        }
        let end = b.create_end();
        b.link_hard(prev, end)?;

        debug!(stages = self.stages.len(), "Built dataflow graph");
        b.finish(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegraph_graph::EdgeKind;

    #[test]
    fn test_default_stages_form_chain() {
        let df = StagedDataflow::from_config(&DataflowConfig::default());
        let g = df.create_dataflow().unwrap();
        assert_eq!(g.node_count(), 5);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(
            g.topological_order().unwrap(),
            vec![
                g.entry(),
                g.find_label("extract").unwrap(),
                g.find_label("transform").unwrap(),
                g.find_label("load").unwrap(),
                g.end(),
            ]
        );
        assert!(g.edges().all(|e| e.kind == EdgeKind::DirectedHard));
    }

    #[test]
    fn test_empty_stages_link_start_to_end() {
        let g = StagedDataflow::new(Vec::new()).create_dataflow().unwrap();
        assert_eq!(g.successors(g.entry()), vec![g.end()]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_non_string_stage_labels() {
        let g = StagedDataflow::new(vec![Value::from(42)])
            .create_dataflow()
            .unwrap();
        let stage = g.find_label("stage1").unwrap();
        assert_eq!(g.node(stage).unwrap().payload(), Some(&Value::from(42)));
    }
}
