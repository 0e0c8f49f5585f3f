// src/main.rs

use anyhow::Context;
use log::info;

use sharding_cost_graph::config::CONFIG;
use sharding_cost_graph::{CostGraph, GraphInput};

/// Build and simplify the cost graph for a JSON strategy description, then
/// print it.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let path = std::env::args()
        .nth(1)
        .context("Usage: sharding-cost-graph <strategies.json>")?;
    let config = &*CONFIG;

    let input = GraphInput::load(&path)
        .with_context(|| format!("Failed to load strategy description {}", path))?;
    info!(
        "Loaded {} strategy groups ({} nodes) from {}",
        input.strategies.groups().len(),
        input.strategies.node_count(),
        path
    );

    let mut graph = CostGraph::build(&input.strategies, &input.associative_pairs, config);
    graph.simplify(config.simplify);

    if config.dump_graph {
        print!("{}", graph);
    } else {
        let merged = graph.node_count() - graph.representatives().count();
        println!(
            "nodes: {}\nedges: {}\nmerged: {}\nskipped follows: {}",
            graph.node_count(),
            graph.edge_count(),
            merged,
            graph.skipped_follows().len()
        );
    }
    Ok(())
}
