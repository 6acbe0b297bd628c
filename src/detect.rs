//! Geometric detectors and their plug-in contract.
//!
//! Every symbol family implements [`Detector`]: `propose` turns region-local
//! geometric evidence into scored raw candidates without touching the graph,
//! `commit` performs the actual vertex/edge insertions for the accepted
//! subset. The split lets the post-analysis filter veto candidates before
//! they ever enter the graph, or screen already-committed vertices and
//! delete the outliers; both patterns occur in this engine.
//!
//! The excluded UI/training subsystems may call `propose` directly (e.g. to
//! preview candidate spots) without running a full stage.

pub mod beams;
pub mod ledgers;
pub mod multirest;

use crate::page::Region;
use crate::params::EngineParams;
use crate::scale::Scale;
use crate::sig::{GraphError, InterId, Median, Shape, StaffId};
use thiserror::Error;

/// Failure inside one region's detector.
///
/// Caught at the region boundary by the pipeline engine and surfaced as a
/// region status; sibling regions are unaffected. The `Graph` variant is the
/// exception: a graph-contract violation is a bug and aborts the stage.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("{detector}: {message}")]
    Failed {
        detector: &'static str,
        message: String,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl DetectorError {
    pub fn failed(detector: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            detector,
            message: message.into(),
        }
    }
}

/// A scored candidate produced by `propose`, not yet in any graph.
#[derive(Clone, Debug)]
pub struct RawCandidate {
    pub shape: Shape,
    pub median: Median,
    /// Raw evidence score in `[0, 1]`.
    pub grade: f64,
    /// Weak attribution to the staff the candidate belongs to.
    pub staff: Option<StaffId>,
    /// Staff-relative line offset, for positional candidates (ledgers).
    pub line_index: Option<i32>,
    /// Committed vertex this candidate replaces (composite recognition).
    pub replaces: Option<InterId>,
}

/// The contract every symbol-family detector implements.
pub trait Detector {
    /// Stage-scoped shared precomputation consumed by this detector.
    type Ctx;

    fn name(&self) -> &'static str;

    /// Produces raw candidates from region-local evidence; no graph
    /// mutation.
    fn propose(
        &self,
        region: &Region,
        ctx: &Self::Ctx,
        scale: Scale,
        params: &EngineParams,
    ) -> Result<Vec<RawCandidate>, DetectorError>;

    /// Inserts the accepted candidates into the region's graph.
    fn commit(
        &self,
        region: &mut Region,
        accepted: &[RawCandidate],
        scale: Scale,
        params: &EngineParams,
    ) -> Result<Vec<InterId>, DetectorError>;
}
