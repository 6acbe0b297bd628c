#![allow(dead_code)] // each test binary uses its own subset of the helpers

pub mod synthetic_page;

/// Hooks test output into `RUST_LOG`-controlled logging.
pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}
