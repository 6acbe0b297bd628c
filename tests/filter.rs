mod common;

use common::synthetic_page::{staff, INTERLINE};
use score_engine::filter::{screen_beams, screen_ledgers};
use score_engine::params::EngineParams;
use score_engine::scale::Scale;
use score_engine::sig::{InterId, Interpretation, Median, Shape, StaffId};
use score_engine::{Page, Region, RegionId, Staff};

fn page_with_one_region() -> Page {
    let mut page = Page::new();
    page.add_region(vec![staff(0)]);
    page
}

/// Commits a ledger into the graph and the staff's positional index.
fn commit_ledger(region: &mut Region, index: i32, x1: f64, x2: f64, y: f64) -> InterId {
    commit_ledger_on(region, 0, index, x1, x2, y, 3.0)
}

fn commit_ledger_on(
    region: &mut Region,
    staff: usize,
    index: i32,
    x1: f64,
    x2: f64,
    y: f64,
    thickness: f64,
) -> InterId {
    let inter = Interpretation::new(Shape::Ledger, Median::horizontal(x1, x2, y, thickness), 0.8)
        .on_staff(StaffId(staff))
        .at_line(index);
    let id = region.sig_mut().add_vertex(inter);
    region.staff_mut(StaffId(staff)).unwrap().add_ledger(index, id);
    id
}

fn commit_beam(region: &mut Region, x1: f64, x2: f64, y: f64, thickness: f64) -> InterId {
    region.sig_mut().add_vertex(Interpretation::new(
        Shape::Beam,
        Median::horizontal(x1, x2, y, thickness),
        0.8,
    ))
}

#[test]
fn ledger_screening_discards_the_single_outlier() {
    common::init_logs();
    let mut page = page_with_one_region();
    let region = page.region_mut(RegionId(0)).unwrap();

    // Reference line (last staff line) at y = 180; deltas in interline units
    // are 1.0, 1.0, 1.05, 0.95 and a wild 1.6.
    let reference = 180.0;
    let deltas = [1.0, 1.0, 1.05, 0.95, 1.6];
    let mut ids = Vec::new();
    for (i, delta) in deltas.into_iter().enumerate() {
        let x1 = 50.0 + 100.0 * i as f64;
        ids.push(commit_ledger(region, 1, x1, x1 + 40.0, reference + delta * INTERLINE));
    }

    let diag = screen_ledgers(&mut page, &EngineParams::default());
    // Two measurements per ledger: ordinate delta and thickness.
    assert_eq!(diag.measured, 10);
    assert_eq!(diag.flagged, 1);
    assert_eq!(diag.discarded, 1);
    assert_eq!(diag.rebuilt_staves, 1);

    let region = page.region(RegionId(0)).unwrap();
    assert!(!region.sig().contains(ids[4]));
    assert_eq!(region.staves()[0].ledgers_at(1).map(<[_]>::len), Some(4));
}

#[test]
fn discarding_an_inner_ledger_cascades_to_its_dependents() {
    common::init_logs();
    let mut page = page_with_one_region();
    let region = page.region_mut(RegionId(0)).unwrap();

    // Four well-placed first ledgers and one shifted outlier that alone
    // supports a second-line ledger above it.
    for i in 0..4 {
        let x1 = 50.0 + 100.0 * i as f64;
        commit_ledger(region, 1, x1, x1 + 40.0, 200.0);
    }
    let outlier = commit_ledger(region, 1, 500.0, 560.0, 212.0);
    // Well-placed relative to the nominal second line, but chained to the
    // outlier: nothing else covers its abscissa range.
    let dependent = commit_ledger(region, 2, 510.0, 550.0, 220.0);

    let diag = screen_ledgers(&mut page, &EngineParams::default());
    assert_eq!(diag.flagged, 1);
    // The flagged outlier plus the orphan it was supporting.
    assert_eq!(diag.discarded, 2);

    let region = page.region(RegionId(0)).unwrap();
    assert!(!region.sig().contains(outlier));
    assert!(!region.sig().contains(dependent));
    assert!(region.staves()[0].ledgers_at(2).is_none());
}

#[test]
fn wide_sigma_coefficients_flag_nothing() {
    let mut page = page_with_one_region();
    let region = page.region_mut(RegionId(0)).unwrap();
    for (i, delta) in [1.0, 1.0, 1.05, 0.95, 1.6].into_iter().enumerate() {
        let x1 = 50.0 + 100.0 * i as f64;
        commit_ledger(region, 1, x1, x1 + 40.0, 180.0 + delta * INTERLINE);
    }

    let mut params = EngineParams::default();
    params.filter.delta_sigma_low = -4.0;
    params.filter.delta_sigma_high = 4.0;

    let diag = screen_ledgers(&mut page, &params);
    assert_eq!(diag.flagged, 0);
    assert_eq!(diag.discarded, 0);
    assert_eq!(
        page.region(RegionId(0)).unwrap().sig().inters_of(Shape::Ledger).len(),
        5
    );
}

#[test]
fn screening_an_empty_page_is_a_no_op() {
    let mut page = page_with_one_region();
    let diag = screen_ledgers(&mut page, &EngineParams::default());
    assert_eq!(diag.measured, 0);
    assert_eq!(diag.flagged, 0);
    assert!(diag.bounds.is_empty());
}

#[test]
fn screening_is_idempotent_once_outliers_are_gone() {
    let mut page = page_with_one_region();
    let region = page.region_mut(RegionId(0)).unwrap();
    for (i, delta) in [1.05, 0.95, 1.05, 0.95, 1.6].into_iter().enumerate() {
        let x1 = 50.0 + 100.0 * i as f64;
        commit_ledger(region, 1, x1, x1 + 40.0, 180.0 + delta * INTERLINE);
    }

    let params = EngineParams::default();
    let first = screen_ledgers(&mut page, &params);
    assert_eq!(first.discarded, 1);

    // The surviving population is tight enough to pass its own bounds.
    let second = screen_ledgers(&mut page, &params);
    assert_eq!(second.flagged, 0);
    assert_eq!(second.discarded, 0);
}

#[test]
fn thickness_is_normalized_by_the_owning_staff() {
    common::init_logs();
    let mut page = Page::new();
    let small = Staff::new(StaffId(0), 100.0, 20.0, 0.0, 600.0);
    let large = Staff::new(StaffId(1), 300.0, 40.0, 0.0, 600.0);
    page.add_region(vec![small, large]);
    let region = page.region_mut(RegionId(0)).unwrap();

    // The same 0.2-interline relative thickness on both staves; the absolute
    // pixel thickness scales with the staff size.
    for i in 0..4 {
        let x1 = 50.0 + 100.0 * i as f64;
        commit_ledger_on(region, 0, 1, x1, x1 + 40.0, 200.0, 4.0);
    }
    for i in 0..2 {
        let x1 = 80.0 + 150.0 * i as f64;
        commit_ledger_on(region, 1, 1, x1, x1 + 60.0, 500.0, 8.0);
    }

    let diag = screen_ledgers(&mut page, &EngineParams::default());
    assert_eq!(diag.measured, 12);
    assert_eq!(diag.flagged, 0);
    assert_eq!(
        page.region(RegionId(0)).unwrap().sig().inters_of(Shape::Ledger).len(),
        6
    );
}

#[test]
fn beam_screening_discards_the_odd_height() {
    common::init_logs();
    let mut page = page_with_one_region();
    let region = page.region_mut(RegionId(0)).unwrap();

    // Heights in interline units: 0.5, 0.5, 0.52, 0.48 and a wild 1.2.
    let heights = [10.0, 10.0, 10.4, 9.6, 24.0];
    let mut ids = Vec::new();
    for (i, h) in heights.into_iter().enumerate() {
        let x1 = 50.0 + 120.0 * i as f64;
        ids.push(commit_beam(region, x1, x1 + 80.0, 140.0, h));
    }

    let diag = screen_beams(&mut page, Scale::new(20), &EngineParams::default());
    assert_eq!(diag.measured, 5);
    assert_eq!(diag.flagged, 1);
    assert_eq!(diag.discarded, 1);

    let sig = page.region(RegionId(0)).unwrap().sig();
    assert!(!sig.contains(ids[4]));
    assert_eq!(sig.inters_of(Shape::Beam).len(), 4);
}
