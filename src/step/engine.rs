//! The pipeline driver.
//!
//! [`StepEngine::run`] executes one stage: prerequisite check, prolog,
//! per-region phase fanned out on the rayon pool, epilog, page bookkeeping.
//! A detector failure is confined to its region; the stage itself still
//! completes and later stages keep processing the healthy regions. Graph
//! contract violations and cooperative cancellation abort the stage instead.

use super::stages::{BeamsStage, LedgersStage, MultiRestsStage, ScaleStage, StavesStage};
use super::task::{Prolog, StepTask};
use super::{Step, StepError};
use crate::detect::DetectorError;
use crate::diagnostics::{RegionOutcome, RunReport, StepReport};
use crate::page::{Page, PageStatus, RegionStatus};
use crate::params::EngineParams;
use crate::sig::GraphError;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation handle, checked between regions.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; regions already running finish normally.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Outcome of the per-region phase for one region.
enum RegionRun {
    Done,
    Fatal(GraphError),
    Cancelled,
}

/// Drives the staged pipeline over a page.
pub struct StepEngine {
    params: EngineParams,
    cancel: CancelToken,
}

impl StepEngine {
    pub fn new(params: EngineParams) -> Self {
        Self {
            params,
            cancel: CancelToken::new(),
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Handle for cancelling runs from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs a single stage on the page.
    pub fn run(&self, step: Step, page: &mut Page) -> Result<StepReport, StepError> {
        for &required in step.requires() {
            if !page.is_satisfied(required) {
                return Err(StepError::MissingPrerequisite {
                    step,
                    missing: required,
                });
            }
        }
        match step {
            Step::Scale => self.drive(&ScaleStage, page),
            Step::Staves => self.drive(&StavesStage, page),
            Step::Beams => self.drive(&BeamsStage, page),
            Step::Ledgers => self.drive(&LedgersStage, page),
            Step::MultiRests => self.drive(&MultiRestsStage, page),
        }
    }

    /// Runs every not-yet-satisfied stage up to and including `target`.
    ///
    /// A stage failing its prolog or epilog is reported and the sequence
    /// moves on; the dependent stages then report their missing prerequisite
    /// the same way. Cancellation and graph violations abort the sequence.
    pub fn run_sequence(&self, target: Step, page: &mut Page) -> Result<RunReport, StepError> {
        let start = Instant::now();
        let mut report = RunReport::default();
        for step in Step::ALL.into_iter().filter(|s| *s <= target) {
            if page.is_satisfied(step) {
                debug!("step {step}: already satisfied, not re-run");
                continue;
            }
            match self.run(step, page) {
                Ok(step_report) => report.steps.push(step_report),
                Err(err @ (StepError::Cancelled { .. } | StepError::Graph(_))) => {
                    return Err(err);
                }
                Err(err) => warn!("{err}"),
            }
        }
        report.total_ms = start.elapsed().as_secs_f64() * 1e3;
        Ok(report)
    }

    fn drive<T: StepTask + Sync>(&self, task: &T, page: &mut Page) -> Result<StepReport, StepError> {
        let step = task.step();
        let start = Instant::now();

        let ctx = match task.prolog(page, &self.params)? {
            Prolog::Run(ctx) => ctx,
            Prolog::Skip => {
                info!("step {step}: skipped");
                page.mark(step, PageStatus::Skipped);
                let total = start.elapsed().as_secs_f64() * 1e3;
                return Ok(StepReport {
                    step,
                    status: PageStatus::Skipped,
                    prolog_ms: total,
                    regions_ms: 0.0,
                    epilog_ms: 0.0,
                    total_ms: total,
                    regions: Vec::new(),
                    filter: None,
                });
            }
        };
        let prolog_ms = start.elapsed().as_secs_f64() * 1e3;

        // Page-skipped prerequisites satisfy every region; completed ones
        // are checked per region, so one region's earlier failure only
        // sidelines that region.
        let page_satisfied: Vec<Step> = step
            .requires()
            .iter()
            .copied()
            .filter(|&req| page.status(req) == Some(PageStatus::Skipped))
            .collect();

        let regions_start = Instant::now();
        let scale = page.scale();
        let params = &self.params;
        let cancel = &self.cancel;
        let runs: Vec<RegionRun> = page
            .regions_mut()
            .par_iter_mut()
            .map(|region| {
                if cancel.is_cancelled() {
                    return RegionRun::Cancelled;
                }
                let ready = step
                    .requires()
                    .iter()
                    .all(|req| region.is_done(*req) || page_satisfied.contains(req));
                if !ready {
                    debug!("step {step} {}: prerequisites incomplete, skipping", region.id());
                    region.set_status(step, RegionStatus::Skipped);
                    return RegionRun::Done;
                }
                match task.per_region(region, &ctx, scale, params) {
                    Ok(()) => {
                        region.set_status(step, RegionStatus::Completed);
                        RegionRun::Done
                    }
                    Err(DetectorError::Graph(err)) => RegionRun::Fatal(err),
                    Err(err) => {
                        warn!("step {step} {} failed: {err}", region.id());
                        region.set_status(step, RegionStatus::Failed(err.to_string()));
                        RegionRun::Done
                    }
                }
            })
            .collect();
        let regions_ms = regions_start.elapsed().as_secs_f64() * 1e3;

        for run in &runs {
            if let RegionRun::Fatal(err) = run {
                return Err(StepError::Graph(err.clone()));
            }
        }
        if runs.iter().any(|run| matches!(run, RegionRun::Cancelled)) {
            return Err(StepError::Cancelled { step });
        }

        let epilog_start = Instant::now();
        let filter = task.epilog(page, ctx, &self.params)?;
        let epilog_ms = epilog_start.elapsed().as_secs_f64() * 1e3;

        page.mark(step, PageStatus::Done);
        let regions = page
            .regions()
            .iter()
            .filter_map(|region| {
                region.status(step).map(|status| RegionOutcome {
                    region: region.id(),
                    status: status.clone(),
                })
            })
            .collect();

        let total_ms = start.elapsed().as_secs_f64() * 1e3;
        info!(
            "step {step}: done in {total_ms:.1} ms (prolog {prolog_ms:.1}, regions {regions_ms:.1}, epilog {epilog_ms:.1})"
        );
        Ok(StepReport {
            step,
            status: PageStatus::Done,
            prolog_ms,
            regions_ms,
            epilog_ms,
            total_ms,
            regions,
            filter,
        })
    }
}
