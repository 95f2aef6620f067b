//! Producer/consumer ordering of co-targeted bindings.
//!
//! Two bindings co-target when their selectors can select the same fragment
//! occurrence, judged conservatively by leaf bucket: equal literal leaf
//! names, or either leaf being a wildcard. For every co-targeting pair where
//! one produces a token the other consumes, the producer must be dispatched
//! first. The result is a single global rank computed once per engine; each
//! per-fragment dispatch bucket is the matching subset in rank order.

use std::collections::BTreeSet;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::trace;

use trellis_selector::Step;

use crate::binding::VisitorBinding;

/// Fatal configuration error: the produced/consumed token relation among
/// co-targeted bindings is cyclic.
#[derive(Debug, Clone, Error)]
#[error("dependency cycle among visitors co-targeting '{target}': {selectors:?}")]
pub struct CycleError {
    /// Leaf name of the fragment target the cycle was detected for.
    pub target: String,
    /// Selector texts of the bindings on the cycle.
    pub selectors: Vec<String>,
}

fn leaf_key(binding: &VisitorBinding) -> Option<&str> {
    match binding.selector().leaf() {
        Some(Step::Named(name)) => Some(name.local()),
        Some(Step::Wildcard | Step::DeepWildcard) => None,
        _ => Some(""),
    }
}

fn co_target(a: &VisitorBinding, b: &VisitorBinding) -> bool {
    match (leaf_key(a), leaf_key(b)) {
        (None, _) | (_, None) => true,
        (Some(x), Some(y)) => x == y,
    }
}

/// Computes the global dispatch rank, one slot per binding.
///
/// Stable Kahn pass: among bindings whose producers have all been placed,
/// the lowest registration index goes first, so bindings with no dependency
/// relation keep their registration order.
pub(crate) fn dispatch_ranks(bindings: &[VisitorBinding]) -> Result<Vec<usize>, CycleError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(bindings.len(), 0);
    let nodes: Vec<NodeIndex> = bindings.iter().map(|b| graph.add_node(b.id())).collect();

    for (i, producer) in bindings.iter().enumerate() {
        for (j, consumer) in bindings.iter().enumerate() {
            if i == j || !co_target(producer, consumer) {
                continue;
            }
            if producer.produces().intersection(consumer.consumes()).next().is_some() {
                trace!(
                    producer = producer.label(),
                    consumer = consumer.label(),
                    "dependency edge"
                );
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    let mut indegree: Vec<usize> = nodes
        .iter()
        .map(|n| graph.neighbors_directed(*n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> =
        indegree.iter().enumerate().filter(|(_, d)| **d == 0).map(|(i, _)| i).collect();

    let mut rank = vec![usize::MAX; bindings.len()];
    let mut placed = 0;
    while let Some(&i) = ready.iter().next() {
        ready.remove(&i);
        rank[i] = placed;
        placed += 1;
        for neighbor in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
            let j = graph[neighbor];
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.insert(j);
            }
        }
    }

    if placed != bindings.len() {
        let stuck: Vec<&VisitorBinding> =
            bindings.iter().filter(|b| rank[b.id()] == usize::MAX).collect();
        let target = stuck
            .iter()
            .find_map(|b| leaf_key(b))
            .unwrap_or("*")
            .to_owned();
        return Err(CycleError {
            target,
            selectors: stuck.iter().map(|b| b.selector().source().to_owned()).collect(),
        });
    }
    Ok(rank)
}
