//! Beam candidate detection.
//!
//! Beams are horizontal filaments noticeably thicker than a staff line.
//! Candidates are gated on length and height, then graded from length,
//! blackness evidence and closeness to the page-typical beam height computed
//! by the stage prolog.

use super::{Detector, DetectorError, RawCandidate};
use crate::page::{Page, Region};
use crate::params::EngineParams;
use crate::scale::Scale;
use crate::sig::{Interpretation, InterId, Shape, StaffId};
use log::debug;

/// Sheet-wide precomputation for the Beams stage.
#[derive(Clone, Copy, Debug)]
pub struct BeamsContext {
    /// Typical beam height in interline units, 0 when no evidence exists.
    pub typical_height: f64,
}

/// Estimates the page-typical beam height from all regions (prolog duty).
pub fn typical_beam_height(page: &Page, scale: Scale, params: &EngineParams) -> BeamsContext {
    let min_height = scale.to_pixels(params.beam.min_height);
    let max_height = scale.to_pixels(params.beam.max_height);
    let mut heights: Vec<f64> = page
        .regions()
        .iter()
        .flat_map(|region| region.filaments.iter())
        .filter(|f| f.median.thickness >= min_height && f.median.thickness <= max_height)
        .map(|f| scale.normalize(f.median.thickness))
        .collect();
    if heights.is_empty() {
        return BeamsContext {
            typical_height: 0.0,
        };
    }
    heights.sort_by(f64::total_cmp);
    BeamsContext {
        typical_height: heights[heights.len() / 2],
    }
}

/// Detector for plain beam candidates.
pub struct BeamsDetector;

impl Detector for BeamsDetector {
    type Ctx = BeamsContext;

    fn name(&self) -> &'static str {
        "beams"
    }

    fn propose(
        &self,
        region: &Region,
        ctx: &BeamsContext,
        scale: Scale,
        params: &EngineParams,
    ) -> Result<Vec<RawCandidate>, DetectorError> {
        let min_length = scale.to_pixels(params.beam.min_length);
        let min_height = scale.to_pixels(params.beam.min_height);
        let max_height = scale.to_pixels(params.beam.max_height);

        let mut out = Vec::new();
        let mut too_short = 0usize;
        let mut off_height = 0usize;

        for filament in &region.filaments {
            let length = filament.median.length();
            let height = filament.median.thickness;
            if height < min_height || height > max_height {
                off_height += 1;
                continue;
            }
            if length < min_length {
                too_short += 1;
                continue;
            }

            let length_term = (length / (4.0 * scale.interline() as f64)).min(1.0);
            let weight_term = filament.weight.clamp(0.0, 1.0);
            let height_term = if ctx.typical_height > 0.0 {
                let h = scale.normalize(height);
                (1.0 - (h - ctx.typical_height).abs() / ctx.typical_height).clamp(0.0, 1.0)
            } else {
                0.5
            };
            let grade = 0.4 * length_term + 0.3 * weight_term + 0.3 * height_term;

            let staff = nearest_staff(region, filament.median.center().y);
            let mut candidate = RawCandidate {
                shape: Shape::Beam,
                median: filament.median,
                grade,
                staff,
                line_index: None,
                replaces: None,
            };
            candidate.grade = candidate.grade.clamp(0.0, 1.0);
            out.push(candidate);
        }

        debug!(
            "{} {}: kept={} too_short={} off_height={}",
            self.name(),
            region.id(),
            out.len(),
            too_short,
            off_height
        );
        Ok(out)
    }

    fn commit(
        &self,
        region: &mut Region,
        accepted: &[RawCandidate],
        _scale: Scale,
        _params: &EngineParams,
    ) -> Result<Vec<InterId>, DetectorError> {
        let mut ids = Vec::with_capacity(accepted.len());
        for candidate in accepted {
            let mut inter = Interpretation::new(candidate.shape, candidate.median, candidate.grade);
            if let Some(staff) = candidate.staff {
                inter = inter.on_staff(staff);
            }
            ids.push(region.sig_mut().add_vertex(inter));
        }
        Ok(ids)
    }
}

/// Weak staff attribution: the staff whose vertical range is closest to `y`.
fn nearest_staff(region: &Region, y: f64) -> Option<StaffId> {
    region
        .staves()
        .iter()
        .min_by(|a, b| {
            let da = distance_to_staff(a.first_line_y(), a.last_line_y(), y);
            let db = distance_to_staff(b.first_line_y(), b.last_line_y(), y);
            da.total_cmp(&db)
        })
        .map(|staff| staff.id())
}

fn distance_to_staff(top: f64, bottom: f64, y: f64) -> f64 {
    if y < top {
        top - y
    } else if y > bottom {
        y - bottom
    } else {
        0.0
    }
}
