//! Page model: regions, staves and sheet-wide state.

mod region;
mod staff;

pub use region::{Filament, Region, RegionId, RegionStatus, VerticalStub};
pub use staff::{LedgerLine, Staff};

use crate::scale::Scale;
use crate::step::Step;
use serde::Serialize;
use std::collections::BTreeMap;

/// Page-level outcome of one stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PageStatus {
    /// Per-region phase and epilog completed.
    Done,
    /// The stage determined it was inapplicable and left the page untouched.
    Skipped,
}

/// A scanned page partitioned into regions (staff systems).
#[derive(Clone, Debug, Default)]
pub struct Page {
    regions: Vec<Region>,
    scale: Option<Scale>,
    statuses: BTreeMap<Step, PageStatus>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a region built from the provided staves and returns its id.
    pub fn add_region(&mut self, staves: Vec<Staff>) -> RegionId {
        let id = RegionId(self.regions.len());
        self.regions.push(Region::new(id, staves));
        id
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut [Region] {
        &mut self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.0)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(id.0)
    }

    /// Read-only neighbor access for detectors peeking across a system
    /// boundary; never hands out mutable state.
    pub fn region_above(&self, id: RegionId) -> Option<&Region> {
        id.0.checked_sub(1).and_then(|i| self.regions.get(i))
    }

    pub fn scale(&self) -> Option<Scale> {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Scale) {
        self.scale = Some(scale);
    }

    pub fn status(&self, step: Step) -> Option<PageStatus> {
        self.statuses.get(&step).copied()
    }

    pub(crate) fn mark(&mut self, step: Step, status: PageStatus) {
        self.statuses.insert(step, status);
    }

    /// Whether the stage ran to completion on this page.
    pub fn is_done(&self, step: Step) -> bool {
        matches!(self.status(step), Some(PageStatus::Done))
    }

    /// Whether the stage's output is available: it either ran to completion
    /// or skipped itself cleanly (a skip leaves prior state valid).
    pub fn is_satisfied(&self, step: Step) -> bool {
        self.status(step).is_some()
    }
}
