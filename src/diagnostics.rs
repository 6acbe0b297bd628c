//! Serializable run diagnostics.
//!
//! Every engine run produces a [`RunReport`]: one [`StepReport`] per stage
//! with phase timings, per-region outcomes and, for the screening stages,
//! the statistical bounds actually applied. The report serializes to JSON
//! for offline inspection.

use crate::filter::MeasureKind;
use crate::page::{PageStatus, RegionId, RegionStatus};
use crate::step::Step;
use serde::Serialize;

/// Outcome of one stage on one region.
#[derive(Clone, Debug, Serialize)]
pub struct RegionOutcome {
    pub region: RegionId,
    pub status: RegionStatus,
}

/// Acceptance interval applied to one measurement category.
#[derive(Clone, Debug, Serialize)]
pub struct BoundDiagnostics {
    pub kind: MeasureKind,
    pub low: f64,
    pub high: f64,
    /// Number of measurements in this category.
    pub count: usize,
}

/// Summary of a statistical screening pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FilterDiagnostics {
    /// Measurements collected across all regions.
    pub measured: usize,
    /// Vertices flagged as statistical outliers.
    pub flagged: usize,
    /// Vertices actually removed, flagged ones plus cascaded orphans.
    pub discarded: usize,
    /// Staves whose ledger index was rebuilt afterwards.
    pub rebuilt_staves: usize,
    pub bounds: Vec<BoundDiagnostics>,
}

/// Timings and outcomes of a single stage run.
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub status: PageStatus,
    pub prolog_ms: f64,
    pub regions_ms: f64,
    pub epilog_ms: f64,
    pub total_ms: f64,
    pub regions: Vec<RegionOutcome>,
    /// Screening summary, for the stages that run one in their epilog.
    pub filter: Option<FilterDiagnostics>,
}

/// Full pipeline report, one entry per stage driven.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub total_ms: f64,
}

impl RunReport {
    /// Last report for the provided stage, if it was driven.
    pub fn step(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().rev().find(|r| r.step == step)
    }
}
