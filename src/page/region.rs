//! Region: one staff system, the unit of parallel work and failure
//! isolation.
//!
//! A region owns its interpretation graph, its staves and its pre-extracted
//! geometric primitives. No other region may mutate them; cross-region reads
//! go through the read-only accessors on [`crate::page::Page`].

use super::staff::Staff;
use crate::sig::{Median, Sig, StaffId};
use crate::step::Step;
use serde::Serialize;
use std::collections::BTreeMap;

/// Index of a region within its page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RegionId(pub usize);

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A horizontal stick of connected runs, the raw evidence detectors consume.
///
/// Produced by the excluded pixel-level extraction; `weight` carries the
/// blackness evidence in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Filament {
    pub median: Median,
    pub weight: f64,
}

/// A short vertical stub, the serif evidence used by multi-rest recognition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VerticalStub {
    pub x: f64,
    pub y1: f64,
    pub y2: f64,
    pub thickness: f64,
}

impl VerticalStub {
    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }

    pub fn center_y(&self) -> f64 {
        0.5 * (self.y1 + self.y2)
    }
}

/// Outcome of one stage for one region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RegionStatus {
    Completed,
    Skipped,
    Failed(String),
}

/// An independently processed subdivision of the page.
#[derive(Clone, Debug)]
pub struct Region {
    id: RegionId,
    staves: Vec<Staff>,
    sig: Sig,
    pub filaments: Vec<Filament>,
    pub stubs: Vec<VerticalStub>,
    statuses: BTreeMap<Step, RegionStatus>,
}

impl Region {
    pub fn new(id: RegionId, staves: Vec<Staff>) -> Self {
        Self {
            id,
            staves,
            sig: Sig::new(),
            filaments: Vec::new(),
            stubs: Vec::new(),
            statuses: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn staves(&self) -> &[Staff] {
        &self.staves
    }

    pub fn staves_mut(&mut self) -> &mut [Staff] {
        &mut self.staves
    }

    pub fn staff(&self, id: StaffId) -> Option<&Staff> {
        self.staves.get(id.0)
    }

    pub fn staff_mut(&mut self, id: StaffId) -> Option<&mut Staff> {
        self.staves.get_mut(id.0)
    }

    pub fn sig(&self) -> &Sig {
        &self.sig
    }

    pub fn sig_mut(&mut self) -> &mut Sig {
        &mut self.sig
    }

    pub fn status(&self, step: Step) -> Option<&RegionStatus> {
        self.statuses.get(&step)
    }

    pub fn set_status(&mut self, step: Step, status: RegionStatus) {
        self.statuses.insert(step, status);
    }

    /// Whether the provided stage completed for this region.
    pub fn is_done(&self, step: Step) -> bool {
        matches!(self.statuses.get(&step), Some(RegionStatus::Completed))
    }

    /// Rebuilds the ledger map of every staff, deleting orphaned ledgers
    /// from the graph. Returns `(staves_rebuilt, orphans_deleted)`.
    pub fn rebuild_ledgers(&mut self) -> (usize, usize) {
        let mut orphan_total = 0;
        for staff in &mut self.staves {
            let orphans = staff.rebuild_ledger_map(&self.sig);
            orphan_total += orphans.len();
            if !orphans.is_empty() {
                self.sig.delete_vertices(&orphans);
            }
        }
        (self.staves.len(), orphan_total)
    }

    /// Recomputes the derived ledger-line geometry of every staff.
    pub fn rebuild_ledger_lines(&mut self) {
        for staff in &mut self.staves {
            staff.rebuild_ledger_lines(&self.sig);
        }
    }
}
