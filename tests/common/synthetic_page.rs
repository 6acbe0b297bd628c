//! Builders for small synthetic pages.
//!
//! All geometry uses one canonical staff: top line at y = 100, interline
//! 20 px, so the last line sits at y = 180 and the first ledger below the
//! staff at y = 200.

use score_engine::page::{Filament, Page, Region, VerticalStub};
use score_engine::sig::{Median, StaffId};
use score_engine::Staff;

pub const TOP: f64 = 100.0;
pub const INTERLINE: f64 = 20.0;
pub const LEFT: f64 = 0.0;
pub const RIGHT: f64 = 600.0;

pub fn staff(id: usize) -> Staff {
    Staff::new(StaffId(id), TOP, INTERLINE, LEFT, RIGHT)
}

/// A page with `regions` one-staff regions, each carrying its five staff
/// line filaments.
pub fn page_with_regions(regions: usize) -> Page {
    let mut page = Page::new();
    for _ in 0..regions {
        let id = page.add_region(vec![staff(0)]);
        if let Some(region) = page.region_mut(id) {
            add_staff_lines(region);
        }
    }
    page
}

/// Adds the five long staff-line filaments of the canonical staff.
pub fn add_staff_lines(region: &mut Region) {
    for n in 0..5 {
        region.filaments.push(Filament {
            median: Median::horizontal(LEFT, RIGHT, TOP + INTERLINE * n as f64, 2.0),
            weight: 0.9,
        });
    }
}

/// Adds a short thin filament, the raw evidence of one ledger.
pub fn add_ledger_filament(region: &mut Region, x1: f64, x2: f64, y: f64) {
    region.filaments.push(Filament {
        median: Median::horizontal(x1, x2, y, 3.0),
        weight: 0.8,
    });
}

/// Adds a thick filament, the raw evidence of one beam.
pub fn add_beam_filament(region: &mut Region, x1: f64, x2: f64, y: f64, thickness: f64) {
    region.filaments.push(Filament {
        median: Median::horizontal(x1, x2, y, thickness),
        weight: 0.85,
    });
}

/// Adds a vertical serif stub centered on ordinate `y`.
pub fn add_stub(region: &mut Region, x: f64, y: f64) {
    region.stubs.push(VerticalStub {
        x,
        y1: y - 20.0,
        y2: y + 20.0,
        thickness: 4.0,
    });
}
