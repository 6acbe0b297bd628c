//! The five concrete stages of the pipeline.

use super::task::{Prolog, StepTask};
use super::{Step, StepError};
use crate::detect::beams::{typical_beam_height, BeamsContext, BeamsDetector};
use crate::detect::ledgers::LedgersDetector;
use crate::detect::multirest::MultiRestDetector;
use crate::detect::{Detector, DetectorError};
use crate::diagnostics::FilterDiagnostics;
use crate::filter::{screen_beams, screen_ledgers};
use crate::page::{Page, Region};
use crate::params::EngineParams;
use crate::population::Population;
use crate::scale::Scale;
use log::{debug, info};

fn need_scale(scale: Option<Scale>, detector: &'static str) -> Result<Scale, DetectorError> {
    scale.ok_or_else(|| DetectorError::failed(detector, "page scale not measured"))
}

fn page_scale(page: &Page, step: Step) -> Result<Scale, StepError> {
    page.scale().ok_or_else(|| StepError::PhaseFailed {
        step,
        phase: "epilog",
        message: "page scale not measured".into(),
    })
}

/// Runs a detector's propose/commit pair on one region.
fn detect_in_region<D: Detector>(
    detector: &D,
    region: &mut Region,
    ctx: &D::Ctx,
    scale: Scale,
    params: &EngineParams,
) -> Result<(), DetectorError> {
    let candidates = detector.propose(region, ctx, scale, params)?;
    let committed = detector.commit(region, &candidates, scale, params)?;
    debug!(
        "{} {}: committed {} of {} candidates",
        detector.name(),
        region.id(),
        committed.len(),
        candidates.len()
    );
    Ok(())
}

// --- Scale -----------------------------------------------------------------

/// Measures the page interline from staff-line filament spacing.
pub struct ScaleStage;

impl StepTask for ScaleStage {
    type Ctx = ();

    fn step(&self) -> Step {
        Step::Scale
    }

    fn prolog(&self, page: &mut Page, params: &EngineParams) -> Result<Prolog<()>, StepError> {
        if let Some(interline) = params.interline_override {
            info!("scale: interline forced to {interline} px");
            page.set_scale(Scale::new(interline));
            return Ok(Prolog::Skip);
        }
        if page.scale().is_some() {
            return Ok(Prolog::Skip);
        }
        Ok(Prolog::Run(()))
    }

    fn per_region(
        &self,
        region: &mut Region,
        _ctx: &(),
        _scale: Option<Scale>,
        params: &EngineParams,
    ) -> Result<(), DetectorError> {
        // Vertical gaps between consecutive long horizontal filaments; the
        // median gap is the region-local interline.
        let mut ys: Vec<f64> = region
            .filaments
            .iter()
            .filter(|f| f.median.length() >= params.scale.min_line_length_px)
            .map(|f| f.median.center().y)
            .collect();
        ys.sort_by(f64::total_cmp);

        let mut gaps: Vec<f64> = ys
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|gap| *gap > 1.0 && *gap <= params.scale.max_interline_px)
            .collect();
        if gaps.is_empty() {
            return Err(DetectorError::failed("scale", "no staff-line evidence"));
        }
        gaps.sort_by(f64::total_cmp);
        let interline = gaps[gaps.len() / 2];

        for staff in region.staves_mut() {
            staff.set_interline(interline);
        }
        Ok(())
    }

    fn epilog(
        &self,
        page: &mut Page,
        _ctx: (),
        _params: &EngineParams,
    ) -> Result<Option<FilterDiagnostics>, StepError> {
        let mut pop = Population::new();
        for region in page.regions() {
            if !region.is_done(Step::Scale) {
                continue;
            }
            for staff in region.staves() {
                pop.include(staff.interline());
            }
        }
        let Some(mean) = pop.mean() else {
            return Err(StepError::PhaseFailed {
                step: Step::Scale,
                phase: "epilog",
                message: "no region produced an interline measurement".into(),
            });
        };
        let interline = mean.round().max(1.0) as u32;
        info!("scale: interline {interline} px from {} staves", pop.count());
        page.set_scale(Scale::new(interline));
        Ok(None)
    }
}

// --- Staves ----------------------------------------------------------------

/// Refines staff abscissa extents from the line filaments.
pub struct StavesStage;

impl StepTask for StavesStage {
    type Ctx = ();

    fn step(&self) -> Step {
        Step::Staves
    }

    fn prolog(&self, _page: &mut Page, _params: &EngineParams) -> Result<Prolog<()>, StepError> {
        Ok(Prolog::Run(()))
    }

    fn per_region(
        &self,
        region: &mut Region,
        _ctx: &(),
        scale: Option<Scale>,
        params: &EngineParams,
    ) -> Result<(), DetectorError> {
        let scale = need_scale(scale, "staves")?;
        let shift = scale.to_pixels(params.staves.line_shift);
        let min_length = params.staves.min_line_length_px;

        // Borrow the filament list apart from the staves being updated.
        let filaments = std::mem::take(&mut region.filaments);
        for staff in region.staves_mut() {
            let mut left = f64::INFINITY;
            let mut right = f64::NEG_INFINITY;
            for filament in &filaments {
                if filament.median.length() < min_length {
                    continue;
                }
                let y = filament.median.center().y;
                let on_line = (0..staff.line_count())
                    .any(|n| (y - staff.line_y(n)).abs() <= shift);
                if on_line {
                    left = left.min(filament.median.x_min());
                    right = right.max(filament.median.x_max());
                }
            }
            if left < right {
                staff.set_abscissa_range(left, right);
            }
        }
        region.filaments = filaments;
        Ok(())
    }

    fn epilog(
        &self,
        _page: &mut Page,
        _ctx: (),
        _params: &EngineParams,
    ) -> Result<Option<FilterDiagnostics>, StepError> {
        Ok(None)
    }
}

// --- Beams -----------------------------------------------------------------

/// Beam detection plus height screening.
pub struct BeamsStage;

impl StepTask for BeamsStage {
    type Ctx = BeamsContext;

    fn step(&self) -> Step {
        Step::Beams
    }

    fn prolog(
        &self,
        page: &mut Page,
        params: &EngineParams,
    ) -> Result<Prolog<BeamsContext>, StepError> {
        let scale = page_scale(page, Step::Beams)?;
        let ctx = typical_beam_height(page, scale, params);
        debug!("beams: typical height {:.2} interlines", ctx.typical_height);
        Ok(Prolog::Run(ctx))
    }

    fn per_region(
        &self,
        region: &mut Region,
        ctx: &BeamsContext,
        scale: Option<Scale>,
        params: &EngineParams,
    ) -> Result<(), DetectorError> {
        let scale = need_scale(scale, "beams")?;
        detect_in_region(&BeamsDetector, region, ctx, scale, params)
    }

    fn epilog(
        &self,
        page: &mut Page,
        _ctx: BeamsContext,
        params: &EngineParams,
    ) -> Result<Option<FilterDiagnostics>, StepError> {
        let scale = page_scale(page, Step::Beams)?;
        Ok(Some(screen_beams(page, scale, params)))
    }
}

// --- Ledgers ---------------------------------------------------------------

/// Ledger detection plus screening and ledger-index rebuild.
pub struct LedgersStage;

impl StepTask for LedgersStage {
    type Ctx = ();

    fn step(&self) -> Step {
        Step::Ledgers
    }

    fn prolog(&self, _page: &mut Page, _params: &EngineParams) -> Result<Prolog<()>, StepError> {
        Ok(Prolog::Run(()))
    }

    fn per_region(
        &self,
        region: &mut Region,
        ctx: &(),
        scale: Option<Scale>,
        params: &EngineParams,
    ) -> Result<(), DetectorError> {
        let scale = need_scale(scale, "ledgers")?;
        detect_in_region(&LedgersDetector, region, ctx, scale, params)
    }

    fn epilog(
        &self,
        page: &mut Page,
        _ctx: (),
        params: &EngineParams,
    ) -> Result<Option<FilterDiagnostics>, StepError> {
        Ok(Some(screen_ledgers(page, params)))
    }
}

// --- Multi-measure rests ---------------------------------------------------

/// Rewrites qualifying beams into multi-measure rest composites.
pub struct MultiRestsStage;

impl StepTask for MultiRestsStage {
    type Ctx = ();

    fn step(&self) -> Step {
        Step::MultiRests
    }

    fn prolog(&self, _page: &mut Page, _params: &EngineParams) -> Result<Prolog<()>, StepError> {
        Ok(Prolog::Run(()))
    }

    fn per_region(
        &self,
        region: &mut Region,
        ctx: &(),
        scale: Option<Scale>,
        params: &EngineParams,
    ) -> Result<(), DetectorError> {
        let scale = need_scale(scale, "multi-rest")?;
        detect_in_region(&MultiRestDetector, region, ctx, scale, params)
    }

    fn epilog(
        &self,
        page: &mut Page,
        _ctx: (),
        _params: &EngineParams,
    ) -> Result<Option<FilterDiagnostics>, StepError> {
        let mut rewritten = 0usize;
        for region in page.regions() {
            if region.is_done(Step::MultiRests) {
                rewritten += region.sig().inters_of(crate::sig::Shape::MultiRest).len();
            }
        }
        info!("multi-rests: {rewritten} on page");
        Ok(None)
    }
}
