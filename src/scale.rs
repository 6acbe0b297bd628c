//! Sheet scale: the interline unit and its conversions.
//!
//! Almost every threshold in the engine is expressed as a fraction of the
//! local interline (the vertical distance between two staff lines) so that
//! the same configuration works on pages scanned at any resolution. A few
//! thresholds are raw pixels; parameter docs state the unit in each case.

use serde::{Deserialize, Serialize};

/// An interline-relative length, the unit most parameters are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Fraction(pub f64);

/// Sheet-wide scale information, set by the Scale stage (or a user override).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scale {
    interline: u32,
}

impl Scale {
    pub fn new(interline: u32) -> Self {
        Self { interline }
    }

    /// The main interline value, in pixels.
    pub fn interline(&self) -> u32 {
        self.interline
    }

    /// Converts an interline fraction to pixels.
    pub fn to_pixels(&self, fraction: Fraction) -> f64 {
        fraction.0 * self.interline as f64
    }

    /// Normalizes a pixel measurement into interline units.
    pub fn normalize(&self, pixels: f64) -> f64 {
        pixels / self.interline as f64
    }
}
