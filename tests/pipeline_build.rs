use std::collections::HashSet;

use stagegraph_graph::{render, EdgeKind, ReadinessTracker, RenderOptions};
use stagegraph_pipeline::pipeline::alias;
use stagegraph_pipeline::{build_from_config, build_full_graph, Condition, StagedDataflow};
use stagegraph_test_utils::{config_from_toml, CountingDataflow, StaticConfig};

#[test]
fn test_default_config_builds_valid_graph() {
    let config = config_from_toml("");
    let graph = build_from_config(&config).expect("build");
    graph.validate().expect("valid");

    let aliases: HashSet<&str> = graph.clusters().iter().map(|c| c.alias.as_str()).collect();
    assert_eq!(
        aliases,
        HashSet::from([
            alias::TASK_DEPENDENCY_1,
            alias::TASK_DEPENDENCY_2,
            alias::DATAFLOW_1,
            alias::DATAFLOW_2,
            alias::FINISHING,
        ])
    );
}

#[test]
fn test_every_node_eventually_completes() {
    let config = config_from_toml(
        r#"
[flags]
condition2 = true
"#,
    );
    let graph = build_from_config(&config).expect("build");
    let mut tracker = ReadinessTracker::new(&graph);

    let mut wave = tracker.ready_nodes();
    let mut completed = 0;
    while !wave.is_empty() {
        let mut next = Vec::new();
        for id in wave {
            next.extend(tracker.complete(id).expect("ready node completes"));
            completed += 1;
        }
        wave = next;
    }

    assert!(tracker.is_finished());
    assert_eq!(completed, graph.node_count());
}

#[test]
fn test_plantuml_output_for_pipeline() {
    let config = config_from_toml(
        r#"
[render]
title = "ExampleGraph.puml"
"#,
    );
    let graph = build_from_config(&config).expect("build");
    let options = RenderOptions {
        title: config.render.title.clone(),
        skin: config.render.skin.clone(),
    };
    let text = render::to_plantuml(&graph, &options);

    assert!(text.starts_with("@startuml\nskin rose\n\ntitle ExampleGraph.puml\n"));
    assert!(text.trim_end().ends_with("@enduml"));
    assert!(text.contains("cloud \"TaskDependencyGraph\" as taskDependencyGraph1 {"));
    assert!(text.contains("cloud \"FinishingGraph\" as finishingGraph {"));
    assert_eq!(text.matches("cloud ").count(), 5);

    // One arrow per edge, each drawn once.
    let undirected = graph.edges().filter(|e| e.kind == EdgeKind::Undirected).count();
    assert_eq!(undirected, 2);
    assert_eq!(text.matches(" -- ").count(), undirected);
}

#[test]
fn test_json_output_lists_every_edge() {
    let graph = build_full_graph(
        &StaticConfig::new().with_condition(Condition::Condition7, true),
        &CountingDataflow::default(),
    )
    .expect("build");
    let json: serde_json::Value =
        serde_json::from_str(&render::to_json(&graph).expect("json")).expect("parse");
    assert_eq!(json["edges"].as_array().map(Vec::len), Some(graph.edge_count()));
    assert_eq!(json["entry"], graph.entry().as_u64());
}

#[test]
fn test_custom_dataflow_stages() {
    let config = config_from_toml(
        r#"
[dataflow]
stages = ["fetch"]
"#,
    );
    let dataflow = StagedDataflow::from_config(&config.dataflow);
    let graph = build_full_graph(&config, &dataflow).expect("build");

    let fetches = graph.nodes().filter(|n| n.label() == "fetch").count();
    assert_eq!(fetches, 2);
}
