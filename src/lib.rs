#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod page;
pub mod params;
pub mod sig;
pub mod step;

// Recognition internals - public, but considered unstable.
pub mod detect;
pub mod filter;
pub mod population;
pub mod scale;

// --- High-level re-exports -------------------------------------------------

// Main entry points: engine + page model.
pub use crate::page::{Page, Region, RegionId, Staff};
pub use crate::step::{CancelToken, Step, StepEngine, StepError};

// The per-region candidate graph.
pub use crate::sig::{GraphError, InterId, Interpretation, Shape, Sig};

// Reports produced by every run.
pub use crate::diagnostics::{RunReport, StepReport};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
pub mod prelude {
    pub use crate::page::{Page, Region, Staff};
    pub use crate::params::EngineParams;
    pub use crate::sig::{Shape, Sig};
    pub use crate::step::{Step, StepEngine};
}
