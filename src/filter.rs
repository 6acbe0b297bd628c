//! Post-analysis statistical screening.
//!
//! Detectors are deliberately permissive; this module provides the second,
//! collective look. A pass gathers one normalized measurement per committed
//! vertex into per-category [`Population`]s, derives an acceptance interval
//! `[mean + low * sigma, mean + high * sigma]` per category, and deletes the
//! vertices falling strictly outside their interval. Values sitting exactly
//! on a bound pass.
//!
//! Ledger screening additionally rebuilds the per-staff ledger index, since
//! removing an inner ledger orphans the outer ledgers chained to it.

use crate::diagnostics::{BoundDiagnostics, FilterDiagnostics};
use crate::page::Page;
use crate::params::EngineParams;
use crate::population::Population;
use crate::scale::Scale;
use crate::sig::{InterId, Shape};
use log::{debug, info};
use serde::Serialize;
use std::collections::BTreeMap;

/// Measurement category of the screening passes.
///
/// Ledger ordinate deltas are split by side: page skew tends to bias the two
/// directions differently, so they must not share one distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MeasureKind {
    /// Ledger distance to its reference line, above the staff (interline
    /// units, nominally 1).
    DeltaAbove,
    /// Same, below the staff.
    DeltaBelow,
    /// Ledger thickness (interline units).
    Thickness,
    /// Beam height (interline units).
    BeamHeight,
}

impl MeasureKind {
    fn coefficients(self, params: &EngineParams) -> (f64, f64) {
        let f = &params.filter;
        match self {
            Self::DeltaAbove | Self::DeltaBelow => (f.delta_sigma_low, f.delta_sigma_high),
            Self::Thickness => (f.thickness_sigma_low, f.thickness_sigma_high),
            Self::BeamHeight => (f.height_sigma_low, f.height_sigma_high),
        }
    }
}

/// One pass worth of measurements, bucketed by category.
#[derive(Debug, Default)]
struct Screening {
    populations: BTreeMap<MeasureKind, Population>,
    // (region index, vertex, category, value)
    measures: Vec<(usize, InterId, MeasureKind, f64)>,
}

impl Screening {
    fn add(&mut self, region: usize, id: InterId, kind: MeasureKind, value: f64) {
        self.populations.entry(kind).or_default().include(value);
        self.measures.push((region, id, kind, value));
    }

    /// Acceptance interval per category. A category with too few
    /// measurements for a meaningful sigma degenerates to `[mean, mean]`,
    /// which still passes its own members.
    fn bounds(&self, params: &EngineParams) -> BTreeMap<MeasureKind, (f64, f64)> {
        let mut out = BTreeMap::new();
        for (&kind, pop) in &self.populations {
            let (Some(mean), Some(sigma)) = (pop.mean(), pop.standard_deviation()) else {
                continue;
            };
            let (low, high) = kind.coefficients(params);
            out.insert(kind, (mean + low * sigma, mean + high * sigma));
        }
        out
    }

    /// Vertices strictly outside their category's interval, per region.
    fn flagged(
        &self,
        bounds: &BTreeMap<MeasureKind, (f64, f64)>,
    ) -> BTreeMap<usize, Vec<InterId>> {
        let mut out: BTreeMap<usize, Vec<InterId>> = BTreeMap::new();
        for &(region, id, kind, value) in &self.measures {
            let Some(&(low, high)) = bounds.get(&kind) else {
                continue;
            };
            if value < low || value > high {
                debug!("flagging {id}: {kind:?}={value:.3} outside [{low:.3}, {high:.3}]");
                out.entry(region).or_default().push(id);
            }
        }
        for ids in out.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }
        out
    }

    fn diagnostics(
        &self,
        bounds: &BTreeMap<MeasureKind, (f64, f64)>,
    ) -> Vec<BoundDiagnostics> {
        bounds
            .iter()
            .map(|(&kind, &(low, high))| BoundDiagnostics {
                kind,
                low,
                high,
                count: self.populations.get(&kind).map_or(0, Population::count),
            })
            .collect()
    }
}

/// Screens the committed ledgers of the whole page.
///
/// Measures, per ledger, the distance to its reference line (split above /
/// below the staff) and its thickness, both normalized by the owning staff's
/// interline so that refined staff-local scales stay comparable. Outliers
/// are deleted, the ledger index of every touched staff is rebuilt (dropping
/// the orphans this creates), and the derived ledger-line geometry is
/// refreshed for every staff of every region, discard or not.
pub fn screen_ledgers(page: &mut Page, params: &EngineParams) -> FilterDiagnostics {
    let mut screening = Screening::default();

    for (ri, region) in page.regions().iter().enumerate() {
        let sig = region.sig();
        for id in sig.inters_of(Shape::Ledger) {
            let Some(inter) = sig.inter(id) else {
                continue;
            };
            let (Some(staff_id), Some(index)) = (inter.staff(), inter.line_index()) else {
                continue;
            };
            let Some(staff) = region.staff(staff_id) else {
                continue;
            };
            let interline = staff.interline();
            let median = inter.median();
            let y = median.y_at(median.center().x);
            let delta = (y - staff.ledger_reference_y(index)).abs() / interline;
            let kind = if index < 0 {
                MeasureKind::DeltaAbove
            } else {
                MeasureKind::DeltaBelow
            };
            screening.add(ri, id, kind, delta);
            screening.add(ri, id, MeasureKind::Thickness, median.thickness / interline);
        }
    }

    let bounds = screening.bounds(params);
    let flagged = screening.flagged(&bounds);

    let mut diag = FilterDiagnostics {
        measured: screening.measures.len(),
        flagged: flagged.values().map(Vec::len).sum(),
        bounds: screening.diagnostics(&bounds),
        ..FilterDiagnostics::default()
    };

    for (ri, ids) in flagged {
        if let Some(region) = page.regions_mut().get_mut(ri) {
            diag.discarded += ids.len();
            region.sig_mut().delete_vertices(&ids);
            let (staves, orphans) = region.rebuild_ledgers();
            diag.rebuilt_staves += staves;
            diag.discarded += orphans;
        }
    }
    for region in page.regions_mut() {
        region.rebuild_ledger_lines();
    }

    info!(
        "ledger screening: measured={} flagged={} discarded={}",
        diag.measured, diag.flagged, diag.discarded
    );
    diag
}

/// Screens the committed beams of the whole page on their height.
pub fn screen_beams(page: &mut Page, scale: Scale, params: &EngineParams) -> FilterDiagnostics {
    let mut screening = Screening::default();

    for (ri, region) in page.regions().iter().enumerate() {
        let sig = region.sig();
        for id in sig.inters_of(Shape::Beam) {
            if let Some(inter) = sig.inter(id) {
                let height = scale.normalize(inter.median().thickness);
                screening.add(ri, id, MeasureKind::BeamHeight, height);
            }
        }
    }

    let bounds = screening.bounds(params);
    let flagged = screening.flagged(&bounds);

    let mut diag = FilterDiagnostics {
        measured: screening.measures.len(),
        flagged: flagged.values().map(Vec::len).sum(),
        bounds: screening.diagnostics(&bounds),
        ..FilterDiagnostics::default()
    };

    for (ri, ids) in flagged {
        if let Some(region) = page.regions_mut().get_mut(ri) {
            diag.discarded += ids.len();
            region.sig_mut().delete_vertices(&ids);
        }
    }

    info!(
        "beam screening: measured={} flagged={} discarded={}",
        diag.measured, diag.flagged, diag.discarded
    );
    diag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_screening_produces_no_bounds() {
        let screening = Screening::default();
        let params = EngineParams::default();
        assert!(screening.bounds(&params).is_empty());
        assert!(screening.flagged(&BTreeMap::new()).is_empty());
    }

    #[test]
    fn values_on_the_bound_pass() {
        let mut screening = Screening::default();
        for (i, v) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            screening.add(0, InterId(i as u32), MeasureKind::BeamHeight, v);
        }
        // mean = 2, sigma = 1; bounds exactly [1, 3] with the defaults.
        let params = EngineParams::default();
        let bounds = screening.bounds(&params);
        let (low, high) = bounds[&MeasureKind::BeamHeight];
        assert!((low - 1.0).abs() < 1e-12);
        assert!((high - 3.0).abs() < 1e-12);
        assert!(screening.flagged(&bounds).is_empty());
    }

    #[test]
    fn single_outlier_is_flagged() {
        let mut screening = Screening::default();
        for (i, v) in [1.0, 1.0, 1.05, 0.95, 1.6].into_iter().enumerate() {
            screening.add(0, InterId(i as u32), MeasureKind::DeltaBelow, v);
        }
        let params = EngineParams::default();
        let flagged = screening.flagged(&screening.bounds(&params));
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[&0], vec![InterId(4)]);
    }

    #[test]
    fn wider_deviation_never_narrows_the_interval() {
        let params = EngineParams::default();

        let mut tight = Screening::default();
        let mut wide = Screening::default();
        // Same cardinality and mean, different spread.
        for (i, (a, b)) in [(0.9, 0.5), (1.0, 1.0), (1.1, 1.5)].into_iter().enumerate() {
            tight.add(0, InterId(i as u32), MeasureKind::Thickness, a);
            wide.add(0, InterId(i as u32), MeasureKind::Thickness, b);
        }

        let (t_low, t_high) = tight.bounds(&params)[&MeasureKind::Thickness];
        let (w_low, w_high) = wide.bounds(&params)[&MeasureKind::Thickness];
        assert!(w_low <= t_low);
        assert!(w_high >= t_high);
    }

    #[test]
    fn categories_are_screened_independently() {
        let mut screening = Screening::default();
        // Tight thickness cluster, one far-off delta measurement. The delta
        // category has a single member, so its interval degenerates to the
        // member itself and nothing is flagged there either.
        for (i, v) in [0.2, 0.21, 0.19, 0.2].into_iter().enumerate() {
            screening.add(0, InterId(i as u32), MeasureKind::Thickness, v);
        }
        screening.add(0, InterId(9), MeasureKind::DeltaAbove, 5.0);

        let params = EngineParams::default();
        let flagged = screening.flagged(&screening.bounds(&params));
        assert!(flagged.is_empty());
    }
}
