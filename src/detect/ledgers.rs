//! Ledger candidate detection.
//!
//! Virtual ledger lines are processed one after the other, going away from
//! the reference staff, above and below. Each line uses the previous line's
//! accepted ledgers (or the staff boundary line for the first one) as its
//! ordinate reference, and the lookup stops at the first empty line.
//!
//! Candidates whose middle falls inside a good beam are discarded: a ledger
//! cannot live inside a beam. Overlapping candidates on the same line are
//! committed with mutual exclusions, then reduced by grade so that only the
//! best one survives.

use super::{Detector, DetectorError, RawCandidate};
use crate::page::Region;
use crate::params::EngineParams;
use crate::scale::Scale;
use crate::sig::{
    ExclusionCause, InterId, Interpretation, Median, Relation, Shape, StaffId,
};
use log::debug;
use std::collections::BTreeMap;

/// Detector for ledger candidates around every staff.
pub struct LedgersDetector;

impl Detector for LedgersDetector {
    type Ctx = ();

    fn name(&self) -> &'static str {
        "ledgers"
    }

    fn propose(
        &self,
        region: &Region,
        _ctx: &(),
        scale: Scale,
        params: &EngineParams,
    ) -> Result<Vec<RawCandidate>, DetectorError> {
        let min_length = scale.to_pixels(params.ledger.min_length);
        let max_thickness = scale.to_pixels(params.ledger.max_thickness);
        let max_shift = scale.to_pixels(params.ledger.max_delta_shift);
        let min_overlap = scale.to_pixels(params.ledger.min_abscissa_overlap);

        let good_beams = good_beam_medians(region, params);
        let mut claimed = vec![false; region.filaments.len()];
        let mut out = Vec::new();

        for staff in region.staves() {
            for direction in [-1i32, 1] {
                // Reference spans of the previous line: (x_min, x_max, y).
                let mut references = vec![(
                    staff.left(),
                    staff.right(),
                    if direction < 0 {
                        staff.first_line_y()
                    } else {
                        staff.last_line_y()
                    },
                )];

                for step in 1.. {
                    let index = direction * step;
                    let mut line: Vec<(usize, RawCandidate)> = Vec::new();

                    for (fid, filament) in region.filaments.iter().enumerate() {
                        if claimed[fid] {
                            continue;
                        }
                        let median = &filament.median;
                        if median.thickness > max_thickness || median.length() < min_length {
                            continue;
                        }

                        // Ordinate reference from an abscissa-overlapping span.
                        let Some(&(_, _, ref_y)) = references.iter().find(|(lo, hi, _)| {
                            median.x_max().min(*hi) - median.x_min().max(*lo) >= min_overlap
                        }) else {
                            continue;
                        };

                        let expected = ref_y + direction as f64 * staff.interline();
                        let x_mid = median.center().x;
                        let delta = (median.y_at(x_mid) - expected).abs();
                        if delta > max_shift {
                            continue;
                        }

                        if inside_good_beam(&good_beams, x_mid, median.y_at(x_mid)) {
                            continue;
                        }

                        let delta_term = 1.0 - delta / max_shift;
                        let length_term =
                            (median.length() / (2.0 * staff.interline())).min(1.0);
                        let grade = (0.6 * delta_term + 0.4 * length_term).clamp(0.0, 1.0);

                        line.push((
                            fid,
                            RawCandidate {
                                shape: Shape::Ledger,
                                median: *median,
                                grade,
                                staff: Some(staff.id()),
                                line_index: Some(index),
                                replaces: None,
                            },
                        ));
                    }

                    if line.is_empty() {
                        break;
                    }

                    references = line
                        .iter()
                        .map(|(_, c)| (c.median.x_min(), c.median.x_max(), c.median.center().y))
                        .collect();
                    for (fid, candidate) in line {
                        claimed[fid] = true;
                        out.push(candidate);
                    }
                }
            }
        }

        debug!("{} {}: proposed={}", self.name(), region.id(), out.len());
        Ok(out)
    }

    fn commit(
        &self,
        region: &mut Region,
        accepted: &[RawCandidate],
        scale: Scale,
        params: &EngineParams,
    ) -> Result<Vec<InterId>, DetectorError> {
        let min_overlap = scale.to_pixels(params.ledger.min_abscissa_overlap);

        // Group by (staff, line index) and insert inner lines first so that
        // neighbor references exist when the outer lines arrive.
        let mut groups: BTreeMap<(usize, u32, i32), Vec<&RawCandidate>> = BTreeMap::new();
        for candidate in accepted {
            let staff = candidate.staff.ok_or_else(|| {
                DetectorError::failed(self.name(), "ledger candidate without staff")
            })?;
            let index = candidate.line_index.ok_or_else(|| {
                DetectorError::failed(self.name(), "ledger candidate without line index")
            })?;
            groups
                .entry((staff.0, index.unsigned_abs(), index))
                .or_default()
                .push(candidate);
        }

        let mut survivors = Vec::new();
        for ((staff_idx, _, index), mut group) in groups {
            group.sort_by(|a, b| a.median.x_min().total_cmp(&b.median.x_min()));

            // Insert the whole line, with exclusions between overlapping
            // neighbors, then reduce by grade.
            let mut ids: Vec<InterId> = Vec::with_capacity(group.len());
            for candidate in &group {
                let inter = Interpretation::new(candidate.shape, candidate.median, candidate.grade)
                    .on_staff(StaffId(staff_idx))
                    .at_line(index);
                ids.push(region.sig_mut().add_vertex(inter));
            }

            let mut losers = Vec::new();
            for w in 0..group.len() {
                for v in w + 1..group.len() {
                    // Sorted by x_min: once a rival starts past this
                    // candidate's end, so do all the following ones.
                    if group[v].median.x_min() >= group[w].median.x_max() {
                        break;
                    }
                    if group[w].median.x_overlap(&group[v].median) <= 0.0 {
                        continue;
                    }
                    region.sig_mut().add_edge(
                        ids[w],
                        ids[v],
                        Relation::Exclusion {
                            cause: ExclusionCause::Overlap,
                        },
                    )?;
                    let loser = if group[w].grade >= group[v].grade { v } else { w };
                    losers.push(ids[loser]);
                }
            }
            losers.sort_unstable();
            losers.dedup();
            if !losers.is_empty() {
                debug!(
                    "{} {}: line {index} reduced {} overlapping candidates",
                    self.name(),
                    region.id(),
                    losers.len()
                );
                region.sig_mut().delete_vertices(&losers);
            }

            for id in ids {
                if !region.sig().contains(id) {
                    continue;
                }
                link_to_reference(region, StaffId(staff_idx), index, id, min_overlap)?;
                if let Some(staff) = region.staff_mut(StaffId(staff_idx)) {
                    staff.add_ledger(index, id);
                }
                survivors.push(id);
            }
        }

        Ok(survivors)
    }
}

/// Medians of the good beams committed earlier in the pipeline.
fn good_beam_medians(region: &Region, params: &EngineParams) -> Vec<Median> {
    region
        .sig()
        .query(|inter| inter.shape() == Shape::Beam && inter.grade() >= params.beam.good_grade)
        .into_iter()
        .filter_map(|id| region.sig().inter(id))
        .map(|inter| *inter.median())
        .collect()
}

fn inside_good_beam(beams: &[Median], x: f64, y: f64) -> bool {
    beams.iter().any(|beam| {
        x >= beam.x_min()
            && x <= beam.x_max()
            && (y - beam.y_at(x)).abs() <= 0.5 * beam.thickness
    })
}

/// Links a committed ledger to its ordinate reference on the previous line.
fn link_to_reference(
    region: &mut Region,
    staff_id: StaffId,
    index: i32,
    id: InterId,
    min_overlap: f64,
) -> Result<(), DetectorError> {
    let prev_index = if index < 0 { index + 1 } else { index - 1 };
    if prev_index == 0 {
        return Ok(()); // The staff boundary line itself is the reference.
    }
    let median = match region.sig().inter(id) {
        Some(inter) => *inter.median(),
        None => return Ok(()),
    };
    let reference = region
        .staff(staff_id)
        .and_then(|staff| staff.ledgers_at(prev_index))
        .and_then(|ids| {
            ids.iter()
                .copied()
                .find(|prev| {
                    region
                        .sig()
                        .inter(*prev)
                        .is_some_and(|p| p.median().x_overlap(&median) >= min_overlap)
                })
        });
    if let Some(reference) = reference {
        region
            .sig_mut()
            .add_edge(id, reference, Relation::LedgerNeighbor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Region, RegionId, Staff};
    use crate::scale::Scale;

    fn region() -> Region {
        Region::new(
            RegionId(0),
            vec![Staff::new(StaffId(0), 100.0, 20.0, 0.0, 600.0)],
        )
    }

    fn candidate(x1: f64, x2: f64, grade: f64) -> RawCandidate {
        RawCandidate {
            shape: Shape::Ledger,
            median: Median::horizontal(x1, x2, 200.0, 3.0),
            grade,
            staff: Some(StaffId(0)),
            line_index: Some(1),
            replaces: None,
        }
    }

    #[test]
    fn commit_with_a_malformed_candidate_inserts_nothing() {
        let mut region = region();
        region.sig_mut().add_vertex(Interpretation::new(
            Shape::Beam,
            Median::horizontal(0.0, 80.0, 140.0, 10.0),
            0.8,
        ));
        let before = region.sig().vertex_count();

        let mut orphan = candidate(100.0, 140.0, 0.7);
        orphan.staff = None;
        let accepted = [candidate(50.0, 90.0, 0.8), orphan];

        let err = LedgersDetector
            .commit(&mut region, &accepted, Scale::new(20), &EngineParams::default())
            .unwrap_err();
        assert!(matches!(err, DetectorError::Failed { .. }));
        // The whole batch is validated before the first insertion, so the
        // valid candidate did not slip in either.
        assert_eq!(region.sig().vertex_count(), before);
        assert_eq!(region.sig().edge_count(), 0);
        assert!(region.staves()[0].ledgers_at(1).is_none());
    }

    #[test]
    fn wide_candidate_excludes_every_overlapping_rival() {
        let mut region = region();
        // One strong wide candidate overlapping two weak narrow ones; the
        // second narrow one is not adjacent to the wide one in x order.
        let accepted = [
            candidate(0.0, 100.0, 0.9),
            candidate(10.0, 20.0, 0.5),
            candidate(30.0, 40.0, 0.5),
        ];
        let survivors = LedgersDetector
            .commit(&mut region, &accepted, Scale::new(20), &EngineParams::default())
            .unwrap();

        assert_eq!(survivors.len(), 1);
        let sig = region.sig();
        assert_eq!(sig.inters_of(Shape::Ledger), survivors);
        assert_eq!(sig.inter(survivors[0]).unwrap().median().x_max(), 100.0);
        assert_eq!(region.staves()[0].ledgers_at(1).map(<[_]>::len), Some(1));
    }
}
