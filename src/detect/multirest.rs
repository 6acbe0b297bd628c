//! Multi-measure rest recognition.
//!
//! A multi-measure rest looks like an unusually long beam lying on the staff
//! middle line, closed by a short vertical serif at each end. Recognition
//! runs after plain beam detection and rewrites qualifying beams into a
//! composite: one multi-rest vertex, two serif vertices, two support edges,
//! with the original beam deleted in the same commit.

use super::{Detector, DetectorError, RawCandidate};
use crate::page::{Region, VerticalStub};
use crate::params::EngineParams;
use crate::scale::Scale;
use crate::sig::{
    HorizontalSide, InterId, Interpretation, Median, Relation, Shape,
};
use log::debug;

/// Detector rewriting long middle-line beams into multi-measure rests.
pub struct MultiRestDetector;

impl Detector for MultiRestDetector {
    type Ctx = ();

    fn name(&self) -> &'static str {
        "multi-rest"
    }

    fn propose(
        &self,
        region: &Region,
        _ctx: &(),
        scale: Scale,
        params: &EngineParams,
    ) -> Result<Vec<RawCandidate>, DetectorError> {
        let min_length = params.multi_rest.min_length_factor * scale.interline() as f64;
        let max_shift = scale.to_pixels(params.multi_rest.max_line_shift);
        let search_dx = scale.to_pixels(params.multi_rest.serif_search_dx);
        let min_serif_height = scale.to_pixels(params.multi_rest.min_serif_height);

        let mut out = Vec::new();
        let mut too_short = 0usize;
        let mut off_line = 0usize;
        let mut no_serif = 0usize;

        for beam_id in region.sig().inters_of(Shape::Beam) {
            let Some(beam) = region.sig().inter(beam_id) else {
                continue;
            };
            let median = *beam.median();

            if median.length() < min_length {
                too_short += 1;
                continue;
            }

            // The horizontal bar of a multi-rest sits on the middle line of
            // exactly one staff.
            let Some(staff) = region
                .staves()
                .iter()
                .find(|s| (median.center().y - s.middle_line_y()).abs() <= max_shift)
            else {
                off_line += 1;
                continue;
            };

            let left = find_serif(region, &median, median.x_min(), search_dx, min_serif_height);
            let right = find_serif(region, &median, median.x_max(), search_dx, min_serif_height);
            if left.is_none() || right.is_none() {
                no_serif += 1;
                continue;
            }

            out.push(RawCandidate {
                shape: Shape::MultiRest,
                median,
                grade: beam.grade(),
                staff: Some(staff.id()),
                line_index: None,
                replaces: Some(beam_id),
            });
        }

        debug!(
            "{} {}: kept={} too_short={} off_line={} no_serif={}",
            self.name(),
            region.id(),
            out.len(),
            too_short,
            off_line,
            no_serif
        );
        Ok(out)
    }

    fn commit(
        &self,
        region: &mut Region,
        accepted: &[RawCandidate],
        scale: Scale,
        params: &EngineParams,
    ) -> Result<Vec<InterId>, DetectorError> {
        let search_dx = scale.to_pixels(params.multi_rest.serif_search_dx);
        let min_serif_height = scale.to_pixels(params.multi_rest.min_serif_height);

        let mut ids = Vec::new();
        for candidate in accepted {
            let beam_id = candidate.replaces.ok_or_else(|| {
                DetectorError::failed(self.name(), "multi-rest candidate without source beam")
            })?;
            if !region.sig().contains(beam_id) {
                // The beam was removed between propose and commit.
                debug!("{} {}: stale candidate for {beam_id}", self.name(), region.id());
                continue;
            }

            let median = candidate.median;
            let left =
                find_serif(region, &median, median.x_min(), search_dx, min_serif_height);
            let right =
                find_serif(region, &median, median.x_max(), search_dx, min_serif_height);
            let (Some(left), Some(right)) = (left, right) else {
                debug!("{} {}: serifs vanished for {beam_id}", self.name(), region.id());
                continue;
            };

            // Build the replacement first, then retract the beam: the graph
            // never holds a half-built composite.
            let mut rest = Interpretation::new(Shape::MultiRest, median, candidate.grade);
            if let Some(staff) = candidate.staff {
                rest = rest.on_staff(staff);
            }
            let rest_id = region.sig_mut().add_vertex(rest);

            for (stub, side) in [(left, HorizontalSide::Left), (right, HorizontalSide::Right)] {
                let serif_median =
                    Median::vertical(stub.x, stub.y1, stub.y2, stub.thickness);
                let serif_id = region.sig_mut().add_vertex(Interpretation::new(
                    Shape::Serif,
                    serif_median,
                    candidate.grade,
                ));
                region
                    .sig_mut()
                    .add_edge(rest_id, serif_id, Relation::RestSerif { side })?;
            }

            region.sig_mut().delete_vertices(&[beam_id]);
            ids.push(rest_id);
        }
        Ok(ids)
    }
}

/// Looks for a vertical stub closing the bar near abscissa `end_x`.
fn find_serif(
    region: &Region,
    bar: &Median,
    end_x: f64,
    search_dx: f64,
    min_height: f64,
) -> Option<VerticalStub> {
    let bar_y = bar.y_at(end_x.clamp(bar.x_min(), bar.x_max()));
    region
        .stubs
        .iter()
        .filter(|stub| {
            (stub.x - end_x).abs() <= search_dx
                && stub.height() >= min_height
                && bar_y >= stub.y1.min(stub.y2)
                && bar_y <= stub.y1.max(stub.y2)
        })
        .min_by(|a, b| (a.x - end_x).abs().total_cmp(&(b.x - end_x).abs()))
        .copied()
}
