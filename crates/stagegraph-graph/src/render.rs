//! Text renderings of a finished graph.
//!
//! PlantUML output draws every absorbed subgraph as a `cloud` block and
//! uses one arrow style per edge kind:
//!
//! | kind | arrow |
//! |---|---|
//! | hard | `-->` |
//! | soft | `..>` |
//! | undirected | `--` |

use std::collections::HashMap;

use serde::Serialize;

use stagegraph_core::error::Result;

use crate::edge::{Edge, EdgeKind};
use crate::graph::{Cluster, Graph};
use crate::node::{Node, NodeId};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: Option<String>,
    pub skin: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: None,
            skin: "rose".to_string(),
        }
    }
}

fn arrow(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::DirectedHard => "-->",
        EdgeKind::DirectedSoft => "..>",
        EdgeKind::Undirected => "--",
    }
}

fn edge_line(edge: &Edge) -> String {
    format!("{} {} {}", edge.from, arrow(edge.kind), edge.to)
}

/// PlantUML aliases are identifiers: anything else becomes `_`.
fn plantuml_alias(alias: &str) -> String {
    let mut out: String = alias
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !out.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}

fn node_line(node: &Node) -> String {
    format!("usecase \"{}\" as {}", node.label().replace('"', "'"), node.id())
}

/// Render `graph` as a PlantUML use-case diagram.
pub fn to_plantuml(graph: &Graph, options: &RenderOptions) -> String {
    let home: HashMap<NodeId, usize> = graph
        .clusters()
        .iter()
        .enumerate()
        .flat_map(|(i, c)| c.members.iter().map(move |id| (*id, i)))
        .collect();

    let mut inner: Vec<Vec<String>> = vec![Vec::new(); graph.clusters().len()];
    let mut outer = Vec::new();
    for edge in graph.edges() {
        match (home.get(&edge.from), home.get(&edge.to)) {
            (Some(a), Some(b)) if a == b => inner[*a].push(edge_line(&edge)),
            _ => outer.push(edge_line(&edge)),
        }
    }

    let mut lines = vec![
        "@startuml".to_string(),
        format!("skin {}", options.skin),
        String::new(),
    ];
    let title = options.title.as_deref().unwrap_or(graph.name());
    lines.push(format!("title {title}"));
    lines.push(String::new());

    for (cluster, edges) in graph.clusters().iter().zip(inner) {
        lines.push(format!(
            "cloud \"{}\" as {} {{",
            cluster.title,
            plantuml_alias(&cluster.alias)
        ));
        for id in &cluster.members {
            if let Some(node) = graph.node(*id) {
                lines.push(format!("  {}", node_line(node)));
            }
        }
        lines.extend(edges.into_iter().map(|e| format!("  {e}")));
        lines.push("}".to_string());
    }

    lines.extend(
        graph
            .nodes()
            .filter(|n| !home.contains_key(&n.id()))
            .map(node_line),
    );
    lines.extend(outer);
    lines.push(String::new());
    lines.push("@enduml".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[derive(Serialize)]
struct GraphDocument<'a> {
    name: &'a str,
    entry: NodeId,
    end: NodeId,
    nodes: Vec<&'a Node>,
    edges: Vec<Edge>,
    clusters: &'a [Cluster],
}

/// Pretty-printed JSON with nodes, edges and clusters.
pub fn to_json(graph: &Graph) -> Result<String> {
    let doc = GraphDocument {
        name: graph.name(),
        entry: graph.entry(),
        end: graph.end(),
        nodes: graph.nodes().collect(),
        edges: graph.edges().collect(),
        clusters: graph.clusters(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn nested() -> (Graph, NodeId, NodeId, NodeId) {
        let mut inner = GraphBuilder::new("Inner");
        let start = inner.create_start();
        let task = inner.create_task("work", 1);
        let end = inner.create_end();
        inner.link_hard(start, task).unwrap();
        inner.link_soft(task, end).unwrap();
        let inner = inner.finish(start, end).unwrap();

        let mut outer = GraphBuilder::new("Outer");
        let head = outer.create_start();
        let tail = outer.create_end();
        let b = outer.absorb("inner1", inner).unwrap();
        outer.link_hard(head, b.entry).unwrap();
        outer.link_undirected(b.end, tail).unwrap();
        outer.link_hard(head, tail).unwrap();
        (outer.finish(head, tail).unwrap(), head, task, tail)
    }

    #[test]
    fn test_plantuml_layout() {
        let (g, head, task, tail) = nested();
        let text = to_plantuml(&g, &RenderOptions::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "@startuml");
        assert_eq!(lines[1], "skin rose");
        assert_eq!(lines[3], "title Outer");
        assert_eq!(*lines.last().unwrap(), "@enduml");

        let open = lines
            .iter()
            .position(|l| *l == "cloud \"Inner\" as inner1 {")
            .unwrap();
        let close = open + lines[open..].iter().position(|l| *l == "}").unwrap();
        let body = &lines[open + 1..close];
        assert!(body.contains(&format!("  usecase \"work\" as {task}").as_str()));
        assert!(body.iter().any(|l| l.contains("..>")));

        let after = &lines[close + 1..];
        assert!(after.contains(&format!("{head} --> {tail}").as_str()));
        assert!(after.iter().any(|l| l.ends_with(&format!("-- {tail}"))));
        assert!(after.contains(&format!("usecase \"start\" as {head}").as_str()));
    }

    #[test]
    fn test_plantuml_custom_title_and_skin() {
        let (g, ..) = nested();
        let options = RenderOptions {
            title: Some("Pipeline".to_string()),
            skin: "plain".to_string(),
        };
        let text = to_plantuml(&g, &options);
        assert!(text.starts_with("@startuml\nskin plain\n\ntitle Pipeline\n"));
    }

    #[test]
    fn test_cluster_alias_is_sanitised() {
        let mut first = GraphBuilder::new("A");
        let s = first.create_start();
        let e = first.create_end();
        first.link_hard(s, e).unwrap();
        let first = first.finish(s, e).unwrap();

        let mut outer = GraphBuilder::new("Outer");
        let b = outer.absorb("A+B stage", first).unwrap();
        let g = outer.finish(b.entry, b.end).unwrap();

        let text = to_plantuml(&g, &RenderOptions::default());
        assert!(text.contains("cloud \"A\" as A_B_stage {"));
        assert_eq!(plantuml_alias("2nd"), "_2nd");
        assert_eq!(plantuml_alias("finishingGraph"), "finishingGraph");
    }

    #[test]
    fn test_json_document() {
        let (g, head, ..) = nested();
        let json: serde_json::Value = serde_json::from_str(&to_json(&g).unwrap()).unwrap();
        assert_eq!(json["name"], "Outer");
        assert_eq!(json["entry"], head.as_u64());
        assert_eq!(json["nodes"].as_array().unwrap().len(), 5);
        assert_eq!(json["edges"].as_array().unwrap().len(), 5);
        assert_eq!(json["clusters"][0]["alias"], "inner1");
        assert_eq!(json["edges"][0]["kind"], "directed_hard");
    }
}
