//! Per-region interpretation graph ("SIG").
//!
//! One graph per region holds the competing symbolic hypotheses (vertices)
//! and the typed relations between them (edges). It is the engine's central
//! consistency structure: no edge may ever reference a vertex absent from the
//! graph, and deleting a vertex removes its incident edges atomically.
//!
//! Detectors replace a candidate by a composite symbol with the replacement
//! protocol: insert the replacements and their relations first, then delete
//! the replaced vertex. The graph itself has no ordering requirement, but
//! this order avoids a transient state with a dangling reference gap.
//!
//! Storage is BTree-based so that iteration order, and therefore whole
//! pipeline runs, are reproducible.

mod inter;
mod relation;

pub use inter::{InterId, Interpretation, Median, Shape, StaffId};
pub use relation::{Edge, EdgeId, ExclusionCause, HorizontalSide, Relation};

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Contract violations in graph mutation.
///
/// These indicate a detector or filter bug and are never silently recovered:
/// the stage that triggered one is halted for diagnosis.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge endpoint {0} is absent from this graph")]
    DanglingVertex(InterId),
}

/// The interpretation graph of one region.
#[derive(Clone, Debug, Default)]
pub struct Sig {
    inters: BTreeMap<InterId, Interpretation>,
    edges: BTreeMap<EdgeId, Edge>,
    incident: BTreeMap<InterId, BTreeSet<EdgeId>>,
    next_inter: u32,
    next_edge: u32,
}

impl Sig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a vertex and returns its region-unique handle.
    pub fn add_vertex(&mut self, mut inter: Interpretation) -> InterId {
        let id = InterId(self.next_inter);
        self.next_inter += 1;
        inter.assign_id(id);
        self.inters.insert(id, inter);
        self.incident.insert(id, BTreeSet::new());
        id
    }

    /// Links two vertices with a typed relation.
    pub fn add_edge(
        &mut self,
        source: InterId,
        target: InterId,
        relation: Relation,
    ) -> Result<EdgeId, GraphError> {
        if !self.inters.contains_key(&source) {
            return Err(GraphError::DanglingVertex(source));
        }
        if !self.inters.contains_key(&target) {
            return Err(GraphError::DanglingVertex(target));
        }
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                source,
                target,
                relation,
            },
        );
        self.incident.entry(source).or_default().insert(id);
        self.incident.entry(target).or_default().insert(id);
        Ok(id)
    }

    /// Removes the provided vertices and, for each, all incident edges.
    ///
    /// Returns the removed edges so that callers can tell which derived
    /// structures (staff ledger maps, line geometry) need rebuilding.
    pub fn delete_vertices(&mut self, ids: &[InterId]) -> Vec<(EdgeId, Edge)> {
        let mut removed_edges: BTreeSet<EdgeId> = BTreeSet::new();
        for id in ids {
            if let Some(edge_ids) = self.incident.remove(id) {
                removed_edges.extend(edge_ids);
                self.inters.remove(id);
            }
        }

        let mut removed = Vec::with_capacity(removed_edges.len());
        for edge_id in removed_edges {
            if let Some(edge) = self.edges.remove(&edge_id) {
                for endpoint in [edge.source, edge.target] {
                    if let Some(set) = self.incident.get_mut(&endpoint) {
                        set.remove(&edge_id);
                    }
                }
                removed.push((edge_id, edge));
            }
        }
        removed
    }

    /// All vertices matching a predicate, in id order.
    pub fn query<F>(&self, predicate: F) -> Vec<InterId>
    where
        F: Fn(&Interpretation) -> bool,
    {
        self.inters
            .values()
            .filter(|inter| predicate(inter))
            .map(|inter| inter.id())
            .collect()
    }

    /// All vertices of the provided shape, in id order.
    pub fn inters_of(&self, shape: Shape) -> Vec<InterId> {
        self.query(|inter| inter.shape() == shape)
    }

    pub fn contains(&self, id: InterId) -> bool {
        self.inters.contains_key(&id)
    }

    pub fn inter(&self, id: InterId) -> Option<&Interpretation> {
        self.inters.get(&id)
    }

    pub fn inter_mut(&mut self, id: InterId) -> Option<&mut Interpretation> {
        self.inters.get_mut(&id)
    }

    /// Edges incident to the provided vertex, in edge-id order.
    pub fn edges_of(&self, id: InterId) -> Vec<(EdgeId, Edge)> {
        match self.incident.get(&id) {
            None => Vec::new(),
            Some(set) => set
                .iter()
                .filter_map(|edge_id| self.edges.get(edge_id).map(|e| (*edge_id, *e)))
                .collect(),
        }
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn degree(&self, id: InterId) -> usize {
        self.incident.get(&id).map_or(0, BTreeSet::len)
    }

    pub fn vertex_count(&self) -> usize {
        self.inters.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over all interpretations in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Interpretation> {
        self.inters.values()
    }
}
