//! Typed relations between interpretations.

use super::inter::InterId;

/// Identifier of an edge within its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

/// Left/right attribute used by composition relations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HorizontalSide {
    Left,
    Right,
}

/// Why two interpretations exclude each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExclusionCause {
    /// The two candidates overlap in abscissa on the same virtual line.
    Overlap,
}

/// A typed link between two interpretations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Relation {
    /// Composition: the target serif sits on one side of the source
    /// multi-measure rest.
    RestSerif { side: HorizontalSide },
    /// The two endpoints cannot both be kept.
    Exclusion { cause: ExclusionCause },
    /// Chain link from a ledger to the ordinate reference it was validated
    /// against on the previous virtual line.
    LedgerNeighbor,
}

/// An edge instance: source, target and its typed relation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub source: InterId,
    pub target: InterId,
    pub relation: Relation,
}

impl Edge {
    /// Whether the edge touches the provided vertex.
    pub fn is_incident_to(&self, id: InterId) -> bool {
        self.source == id || self.target == id
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint at all.
    pub fn opposite(&self, id: InterId) -> Option<InterId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}
