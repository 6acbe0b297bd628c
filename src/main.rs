use score_engine::page::Filament;
use score_engine::params::EngineParams;
use score_engine::sig::{Median, StaffId};
use score_engine::{Page, Staff, Step, StepEngine};

fn main() {
    // Demo stub: builds a tiny synthetic page and runs the full pipeline
    let mut page = Page::new();
    let region = page.add_region(vec![Staff::new(StaffId(0), 100.0, 20.0, 0.0, 600.0)]);
    if let Some(region) = page.region_mut(region) {
        // Five staff lines plus one ledger just below the staff.
        for n in 0..5 {
            region.filaments.push(Filament {
                median: Median::horizontal(0.0, 600.0, 100.0 + 20.0 * n as f64, 2.0),
                weight: 0.9,
            });
        }
        region.filaments.push(Filament {
            median: Median::horizontal(250.0, 280.0, 200.0, 3.0),
            weight: 0.8,
        });
    }

    let engine = StepEngine::new(EngineParams::default());
    match engine.run_sequence(Step::MultiRests, &mut page) {
        Ok(report) => {
            for step in &report.steps {
                println!("{}: {:?} in {:.2} ms", step.step, step.status, step.total_ms);
            }
            println!("total {:.2} ms", report.total_ms);
        }
        Err(err) => eprintln!("pipeline failed: {err}"),
    }
}
