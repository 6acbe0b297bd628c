//! Staff geometry and its derived ledger index.
//!
//! Beyond the five core lines, a staff maintains a map of the ledgers found
//! around it, keyed by line offset (+/-1 is the first ledger below/above).
//! The map is a positional index derived from the region's interpretation
//! graph: any vertex removal that could desynchronize it must be followed by
//! [`Staff::rebuild_ledger_map`] before the owning stage completes.

use crate::sig::{InterId, Shape, Sig, StaffId};
use std::collections::BTreeMap;

/// Virtual line through the ledgers at one index, recomputed by
/// [`Staff::rebuild_ledger_lines`] whenever the ledger set changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LedgerLine {
    pub y: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub count: usize,
}

/// One staff of a region: line geometry plus the ledger index.
#[derive(Clone, Debug)]
pub struct Staff {
    id: StaffId,
    top: f64,
    interline: f64,
    left: f64,
    right: f64,
    line_count: usize,
    ledger_map: BTreeMap<i32, Vec<InterId>>,
    ledger_lines: BTreeMap<i32, LedgerLine>,
}

impl Staff {
    pub fn new(id: StaffId, top: f64, interline: f64, left: f64, right: f64) -> Self {
        Self {
            id,
            top,
            interline,
            left,
            right,
            line_count: 5,
            ledger_map: BTreeMap::new(),
            ledger_lines: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> StaffId {
        self.id
    }

    /// Staff-local interline, in pixels.
    pub fn interline(&self) -> f64 {
        self.interline
    }

    /// Refines the staff-local interline from fresh line measurements.
    pub fn set_interline(&mut self, interline: f64) {
        self.interline = interline;
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn set_abscissa_range(&mut self, left: f64, right: f64) {
        self.left = left;
        self.right = right;
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Ordinate of line `n`, counted from 0 at the top line.
    pub fn line_y(&self, n: usize) -> f64 {
        self.top + n as f64 * self.interline
    }

    pub fn first_line_y(&self) -> f64 {
        self.line_y(0)
    }

    pub fn last_line_y(&self) -> f64 {
        self.line_y(self.line_count - 1)
    }

    pub fn middle_line_y(&self) -> f64 {
        0.5 * (self.first_line_y() + self.last_line_y())
    }

    /// Expected ordinate of the ledger line at `index` (negative above the
    /// staff, positive below; 0 is not a ledger position).
    pub fn ledger_y(&self, index: i32) -> f64 {
        debug_assert!(index != 0, "ledger index 0 is the staff itself");
        if index < 0 {
            self.first_line_y() + index as f64 * self.interline
        } else {
            self.last_line_y() + index as f64 * self.interline
        }
    }

    /// Ordinate of the reference line one step toward the staff: the
    /// previous ledger line, or the staff boundary line for `|index| == 1`.
    pub fn ledger_reference_y(&self, index: i32) -> f64 {
        match index {
            -1 => self.first_line_y(),
            1 => self.last_line_y(),
            i if i < 0 => self.ledger_y(i + 1),
            i => self.ledger_y(i - 1),
        }
    }

    /// Records an accepted ledger at the provided index.
    pub fn add_ledger(&mut self, index: i32, id: InterId) {
        self.ledger_map.entry(index).or_default().push(id);
    }

    pub fn ledgers_at(&self, index: i32) -> Option<&[InterId]> {
        self.ledger_map.get(&index).map(Vec::as_slice)
    }

    pub fn ledger_map(&self) -> &BTreeMap<i32, Vec<InterId>> {
        &self.ledger_map
    }

    pub fn ledger_lines(&self) -> &BTreeMap<i32, LedgerLine> {
        &self.ledger_lines
    }

    /// Re-derives the whole ledger chain of this staff from the graph.
    ///
    /// Walks outward from the staff on each side; a ledger survives only if
    /// its abscissa range overlaps the kept coverage of the previous line
    /// (the staff itself for `|index| == 1`). Removing an inner ledger thus
    /// drops the outer ledgers it was supporting. Returns the orphaned
    /// vertices, which the caller must delete from the graph.
    pub fn rebuild_ledger_map(&mut self, sig: &Sig) -> Vec<InterId> {
        let mut by_index: BTreeMap<i32, Vec<InterId>> = BTreeMap::new();
        for id in sig.query(|inter| {
            inter.shape() == Shape::Ledger
                && inter.staff() == Some(self.id)
                && inter.line_index().is_some()
        }) {
            if let Some(inter) = sig.inter(id) {
                if let Some(index) = inter.line_index() {
                    by_index.entry(index).or_default().push(id);
                }
            }
        }

        let mut orphans = Vec::new();
        self.ledger_map.clear();

        for direction in [-1i32, 1] {
            // Abscissa coverage of the previous line, staff range at first.
            let mut coverage = vec![(self.left, self.right)];

            for step in 1.. {
                let index = direction * step;
                let Some(mut ids) = by_index.remove(&index) else {
                    break;
                };

                let mut kept = Vec::new();
                for id in ids.drain(..) {
                    let supported = sig.inter(id).is_some_and(|inter| {
                        let median = inter.median();
                        coverage.iter().any(|(lo, hi)| {
                            median.x_max().min(*hi) - median.x_min().max(*lo) > 0.0
                        })
                    });
                    if supported {
                        kept.push(id);
                    } else {
                        orphans.push(id);
                    }
                }

                if kept.is_empty() {
                    break;
                }
                kept.sort_by(|a, b| {
                    let xa = sig.inter(*a).map_or(0.0, |i| i.median().x_min());
                    let xb = sig.inter(*b).map_or(0.0, |i| i.median().x_min());
                    xa.total_cmp(&xb)
                });
                coverage = kept
                    .iter()
                    .filter_map(|id| sig.inter(*id))
                    .map(|inter| (inter.median().x_min(), inter.median().x_max()))
                    .collect();
                self.ledger_map.insert(index, kept);
            }

            // Whatever remains on this side lost its chain to the staff.
            let stranded: Vec<i32> = by_index
                .keys()
                .copied()
                .filter(|i| i.signum() == direction)
                .collect();
            for index in stranded {
                if let Some(ids) = by_index.remove(&index) {
                    orphans.extend(ids);
                }
            }
        }

        orphans
    }

    /// Recomputes the virtual ledger lines from the current ledger map.
    ///
    /// Downstream consumers expect this derived geometry to always be
    /// present and current, so the epilog calls it for every staff, discard
    /// or not.
    pub fn rebuild_ledger_lines(&mut self, sig: &Sig) {
        self.ledger_lines.clear();
        for (&index, ids) in &self.ledger_map {
            let medians: Vec<_> = ids.iter().filter_map(|id| sig.inter(*id)).collect();
            if medians.is_empty() {
                continue;
            }
            let y = medians
                .iter()
                .map(|inter| inter.median().center().y)
                .sum::<f64>()
                / medians.len() as f64;
            let x_min = medians
                .iter()
                .map(|inter| inter.median().x_min())
                .fold(f64::INFINITY, f64::min);
            let x_max = medians
                .iter()
                .map(|inter| inter.median().x_max())
                .fold(f64::NEG_INFINITY, f64::max);
            self.ledger_lines.insert(
                index,
                LedgerLine {
                    y,
                    x_min,
                    x_max,
                    count: medians.len(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::{Interpretation, Median};

    fn staff() -> Staff {
        Staff::new(StaffId(0), 100.0, 20.0, 0.0, 400.0)
    }

    fn ledger(sig: &mut Sig, staff: &mut Staff, index: i32, x1: f64, x2: f64) -> InterId {
        let y = staff.ledger_y(index);
        let id = sig.add_vertex(
            Interpretation::new(Shape::Ledger, Median::horizontal(x1, x2, y, 3.0), 0.7)
                .on_staff(staff.id())
                .at_line(index),
        );
        staff.add_ledger(index, id);
        id
    }

    #[test]
    fn line_geometry() {
        let staff = staff();
        assert_eq!(staff.first_line_y(), 100.0);
        assert_eq!(staff.last_line_y(), 180.0);
        assert_eq!(staff.middle_line_y(), 140.0);
        assert_eq!(staff.ledger_y(-2), 60.0);
        assert_eq!(staff.ledger_y(1), 200.0);
        assert_eq!(staff.ledger_reference_y(2), 200.0);
        assert_eq!(staff.ledger_reference_y(-1), 100.0);
    }

    #[test]
    fn rebuild_drops_orphaned_outer_ledgers() {
        let mut sig = Sig::new();
        let mut st = staff();
        let inner = ledger(&mut sig, &mut st, 1, 100.0, 140.0);
        let outer = ledger(&mut sig, &mut st, 2, 110.0, 150.0);

        // Inner ledger removed from the graph: the outer one loses support.
        sig.delete_vertices(&[inner]);
        let orphans = st.rebuild_ledger_map(&sig);
        assert_eq!(orphans, vec![outer]);
        assert!(st.ledgers_at(1).is_none());
        assert!(st.ledgers_at(2).is_none());
    }

    #[test]
    fn rebuild_keeps_supported_chain() {
        let mut sig = Sig::new();
        let mut st = staff();
        let a = ledger(&mut sig, &mut st, -1, 100.0, 140.0);
        let b = ledger(&mut sig, &mut st, -2, 110.0, 150.0);

        let orphans = st.rebuild_ledger_map(&sig);
        assert!(orphans.is_empty());
        assert_eq!(st.ledgers_at(-1), Some(&[a][..]));
        assert_eq!(st.ledgers_at(-2), Some(&[b][..]));

        st.rebuild_ledger_lines(&sig);
        let line = st.ledger_lines().get(&-1).copied().unwrap();
        assert_eq!(line.y, 80.0);
        assert_eq!(line.count, 1);
    }
}
