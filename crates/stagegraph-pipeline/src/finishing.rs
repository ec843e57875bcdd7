//! The conditional finishing stage.
//!
//! Flags are read once into [`FinishingFlags`], mapped onto a
//! [`FinishingShape`], and each shape has its own sub-builder. The optional
//! `task7` branch is orthogonal to the shape and spliced in afterwards.

use tracing::info;

use stagegraph_core::error::Result;
use stagegraph_graph::{Graph, GraphBuilder, NodeId};

use crate::provider::{Condition, ConfigProvider};

pub const FINISHING_GRAPH: &str = "FinishingGraph";

/// Snapshot of the switches that drive the finishing topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinishingFlags {
    pub condition2: bool,
    pub condition4: bool,
    /// When false, the optional `task7` branch is added.
    pub condition7: bool,
}

impl FinishingFlags {
    pub fn read(config: &dyn ConfigProvider) -> Self {
        Self {
            condition2: config.condition(Condition::Condition2),
            condition4: config.condition(Condition::Condition4),
            condition7: config.condition(Condition::Condition7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishingShape {
    /// `start -> task3 -> {task6, end}`
    FanOut,
    /// `start -> task1 -> end`, optionally through `task4` as well.
    Chain { with_task4: bool },
    /// `start -> {task2, task5}`, end waits for either.
    Split,
}

impl FinishingShape {
    pub fn select(condition1: bool, flags: &FinishingFlags) -> Self {
        match (condition1, flags.condition2) {
            (true, true) => FinishingShape::FanOut,
            (true, false) => FinishingShape::Chain {
                with_task4: flags.condition4,
            },
            (false, _) => FinishingShape::Split,
        }
    }
}

/// Builder state shared by the shape sub-builders.
struct Frame<'a> {
    builder: GraphBuilder,
    start: NodeId,
    end: NodeId,
    config: &'a dyn ConfigProvider,
}

impl Frame<'_> {
    fn task(&mut self, n: u8) -> Result<NodeId> {
        let payload = self.config.task_arg(n)?;
        Ok(self.builder.create_task(format!("task{n}"), payload))
    }

    fn fan_out(&mut self) -> Result<()> {
        let task3 = self.task(3)?;
        let task6 = self.task(6)?;
        self.builder.link_hard(self.start, task3)?;
        self.builder.link_hard(task3, task6)?;
        self.builder.link_hard(task3, self.end)?;
        Ok(())
    }

    fn chain(&mut self, with_task4: bool) -> Result<()> {
        let task1 = self.task(1)?;
        self.builder.link_hard(self.start, task1)?;
        if with_task4 {
            let task4 = self.task(4)?;
            self.builder.link_hard(task1, task4)?;
            self.builder.link_hard(task4, self.end)?;
        }
        self.builder.link_hard(task1, self.end)?;
        Ok(())
    }

    fn split(&mut self) -> Result<()> {
        let task2 = self.task(2)?;
        let task5 = self.task(5)?;
        self.builder.link_hard(self.start, task2)?;
        self.builder.link_hard(self.start, task5)?;
        self.builder.link_soft(task2, self.end)?;
        self.builder.link_soft(task5, self.end)?;
        Ok(())
    }

    fn optional_task7(&mut self) -> Result<()> {
        let task7 = self.task(7)?;
        self.builder.link_hard(self.start, task7)?;
        self.builder.link_soft(task7, self.end)?;
        Ok(())
    }
}

/// Build the finishing graph for `condition1` and the provider's flags.
pub fn finishing_graph(condition1: bool, config: &dyn ConfigProvider) -> Result<Graph> {
    let flags = FinishingFlags::read(config);
    let shape = FinishingShape::select(condition1, &flags);

    let mut builder = GraphBuilder::new(FINISHING_GRAPH);
    let start = builder.create_start();
    let end = builder.create_end();
    let mut frame = Frame {
        builder,
        start,
        end,
        config,
    };

    match shape {
        FinishingShape::FanOut => frame.fan_out()?,
        FinishingShape::Chain { with_task4 } => frame.chain(with_task4)?,
        FinishingShape::Split => frame.split()?,
    }
    if !flags.condition7 {
        frame.optional_task7()?;
    }

    let graph = frame.builder.finish(start, end)?;
    info!(
        ?shape,
        task7 = !flags.condition7,
        nodes = graph.node_count(),
        "Built finishing graph"
    );
    Ok(graph)
}
