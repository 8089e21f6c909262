//! Schema Graph Analysis
//!
//! Computes strongly connected components (SCCs) of the schema graph so callers can tell
//! which schemas are recursive, either directly or through a cycle of references.

use petgraph::algo::kosaraju_scc;
use std::collections::HashMap;

use super::{SchemaGraph, SchemaRef};

/// A strongly connected component (cycle group) in the schema graph
#[derive(Debug, Clone)]
pub struct RecursiveGroup {
    /// Unique identifier for this group
    pub id: usize,
    /// All schemas in this group, ordered by identity
    pub members: Vec<SchemaRef>,
    /// Whether this is a single schema referencing itself
    pub is_self_referential: bool,
}

/// Recursion metadata for the whole graph
#[derive(Debug, Clone, Default)]
pub struct RecursionAnalysis {
    /// Only cycles with >1 member OR self-refs
    pub groups: Vec<RecursiveGroup>,
    membership: HashMap<SchemaRef, usize>,
}

impl RecursionAnalysis {
    /// Check if a schema is in a cycle
    pub fn is_recursive(&self, schema: SchemaRef) -> bool {
        self.membership.contains_key(&schema)
    }

    /// Get the group for a schema
    pub fn group_of(&self, schema: SchemaRef) -> Option<&RecursiveGroup> {
        self.membership
            .get(&schema)
            .and_then(|id| self.groups.get(*id))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Compute recursion analysis for a schema graph
pub fn compute_recursion_analysis(graph: &SchemaGraph) -> RecursionAnalysis {
    let mut analysis = RecursionAnalysis::default();

    for scc in kosaraju_scc(&graph.graph) {
        let is_self_referential = scc.len() == 1 && graph.graph.contains_edge(scc[0], scc[0]);
        if scc.len() == 1 && !is_self_referential {
            continue;
        }

        let id = analysis.groups.len();
        let mut members: Vec<SchemaRef> = scc.into_iter().map(SchemaRef).collect();
        members.sort();
        for member in &members {
            analysis.membership.insert(*member, id);
        }
        analysis.groups.push(RecursiveGroup {
            id,
            members,
            is_self_referential,
        });
    }

    analysis
}
