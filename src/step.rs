//! The staged recognition pipeline.
//!
//! A [`Step`] names one stage of the fixed sequence; the [`StepEngine`]
//! drives stages in order, checking prerequisites, fanning the per-region
//! phase out over a thread pool and recording outcomes on the page.

mod engine;
mod stages;
mod task;

pub use engine::{CancelToken, StepEngine};
pub use task::{Prolog, StepTask};

use crate::sig::GraphError;
use serde::Serialize;
use thiserror::Error;

/// One stage of the pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Step {
    /// Measure the interline scale of the page.
    Scale,
    /// Retrieve staff extents within every region.
    Staves,
    /// Detect beam candidates, then screen their heights.
    Beams,
    /// Detect ledger candidates, then screen and rebuild the ledger index.
    Ledgers,
    /// Rewrite qualifying beams into multi-measure rests.
    MultiRests,
}

impl Step {
    /// All stages, in execution order.
    pub const ALL: [Step; 5] = [
        Step::Scale,
        Step::Staves,
        Step::Beams,
        Step::Ledgers,
        Step::MultiRests,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Scale => "scale",
            Step::Staves => "staves",
            Step::Beams => "beams",
            Step::Ledgers => "ledgers",
            Step::MultiRests => "multi-rests",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Step::Scale => "measure the interline scale",
            Step::Staves => "retrieve staff extents",
            Step::Beams => "detect and screen beams",
            Step::Ledgers => "detect and screen ledgers",
            Step::MultiRests => "recognize multi-measure rests",
        }
    }

    /// Stages whose output this stage consumes.
    pub fn requires(self) -> &'static [Step] {
        match self {
            Step::Scale => &[],
            Step::Staves => &[Step::Scale],
            Step::Beams => &[Step::Scale, Step::Staves],
            Step::Ledgers => &[Step::Scale, Step::Staves, Step::Beams],
            Step::MultiRests => &[Step::Scale, Step::Staves, Step::Beams],
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Stage-level failure.
#[derive(Debug, Error)]
pub enum StepError {
    /// The stage was asked to run before its prerequisites were satisfied.
    #[error("step {step} requires {missing} first")]
    MissingPrerequisite { step: Step, missing: Step },
    /// A cooperative cancellation was observed between regions.
    #[error("step {step} cancelled")]
    Cancelled { step: Step },
    /// A prolog or epilog phase failed; the stage is not marked done.
    #[error("step {step} failed in {phase}: {message}")]
    PhaseFailed {
        step: Step,
        phase: &'static str,
        message: String,
    },
    /// Graph contract violation. Always a bug, never recoverable.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_ordered_by_execution() {
        for pair in Step::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn prerequisites_precede_their_step() {
        for step in Step::ALL {
            for &req in step.requires() {
                assert!(req < step, "{req} must precede {step}");
            }
        }
    }
}
