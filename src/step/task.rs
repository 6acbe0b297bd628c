//! The three-phase contract every stage implements.

use crate::detect::DetectorError;
use crate::diagnostics::FilterDiagnostics;
use crate::page::{Page, Region};
use crate::params::EngineParams;
use crate::scale::Scale;
use crate::step::StepError;

/// Outcome of a stage prolog.
pub enum Prolog<C> {
    /// Run the per-region phase with this shared context.
    Run(C),
    /// The stage is inapplicable; mark the page skipped and stop.
    Skip,
}

/// One stage of the pipeline, split into its three phases.
///
/// The prolog runs once with exclusive page access, the per-region phase
/// runs concurrently with one region each, the epilog runs once again with
/// exclusive access. Shared context produced by the prolog is handed to the
/// other phases by reference, so it must be `Sync`.
pub trait StepTask {
    type Ctx: Sync;

    fn step(&self) -> super::Step;

    /// Sheet-level preparation. Returning [`Prolog::Skip`] records the stage
    /// as cleanly skipped without touching any region.
    fn prolog(&self, page: &mut Page, params: &EngineParams) -> Result<Prolog<Self::Ctx>, StepError>;

    /// Region-local work; runs in parallel across regions. A failure here is
    /// recorded on the failing region only.
    fn per_region(
        &self,
        region: &mut Region,
        ctx: &Self::Ctx,
        scale: Option<Scale>,
        params: &EngineParams,
    ) -> Result<(), DetectorError>;

    /// Sheet-level consolidation after every region finished.
    fn epilog(
        &self,
        page: &mut Page,
        ctx: Self::Ctx,
        params: &EngineParams,
    ) -> Result<Option<FilterDiagnostics>, StepError>;
}
