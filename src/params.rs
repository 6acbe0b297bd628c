//! Parameter types configuring the recognition stages.
//!
//! Every numeric constant used by a detector or filter lives here with a
//! stated default and unit: either an interline [`Fraction`] or raw pixels.
//! The excluded configuration-loading subsystem supplies user overrides
//! through [`crate::config`]; detectors read these values, never hard-coded
//! literals.

use crate::scale::Fraction;
use serde::Deserialize;

/// Engine-wide parameters controlling the multi-stage pipeline.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// User override of the interline value (pixels). When set, the Scale
    /// stage skips itself cleanly and this value is used throughout.
    pub interline_override: Option<u32>,
    /// Scale measurement knobs.
    pub scale: ScaleParams,
    /// Staff retrieval knobs.
    pub staves: StavesParams,
    /// Beam detection knobs.
    pub beam: BeamParams,
    /// Ledger detection knobs.
    pub ledger: LedgerParams,
    /// Multi-measure rest recognition knobs.
    pub multi_rest: MultiRestParams,
    /// Post-analysis statistical screening knobs.
    pub filter: FilterParams,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            interline_override: None,
            scale: ScaleParams::default(),
            staves: StavesParams::default(),
            beam: BeamParams::default(),
            ledger: LedgerParams::default(),
            multi_rest: MultiRestParams::default(),
            filter: FilterParams::default(),
        }
    }
}

/// Knobs for the interline measurement of the Scale stage.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScaleParams {
    /// Minimum filament length to count as staff-line evidence (raw pixels).
    pub min_line_length_px: f64,
    /// Largest plausible interline (raw pixels); larger gaps are ignored.
    pub max_interline_px: f64,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            min_line_length_px: 100.0,
            max_interline_px: 60.0,
        }
    }
}

/// Knobs for staff extent retrieval.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StavesParams {
    /// Minimum filament length to count as a staff-line member (raw pixels).
    pub min_line_length_px: f64,
    /// Vertical tolerance around an expected line ordinate (interline
    /// fraction).
    pub line_shift: Fraction,
}

impl Default for StavesParams {
    fn default() -> Self {
        Self {
            min_line_length_px: 100.0,
            line_shift: Fraction(0.25),
        }
    }
}

/// Knobs for beam candidate detection.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BeamParams {
    /// Minimum beam length (interline fraction).
    pub min_length: Fraction,
    /// Minimum beam height (interline fraction); thinner sticks are staff
    /// lines or ledgers, not beams.
    pub min_height: Fraction,
    /// Maximum beam height (interline fraction).
    pub max_height: Fraction,
    /// Grade above which a beam is considered good (beams below this do not
    /// veto ledger candidates).
    pub good_grade: f64,
}

impl Default for BeamParams {
    fn default() -> Self {
        Self {
            min_length: Fraction(2.0),
            min_height: Fraction(0.3),
            max_height: Fraction(1.5),
            good_grade: 0.5,
        }
    }
}

/// Knobs for ledger candidate detection.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LedgerParams {
    /// Minimum ledger length (interline fraction).
    pub min_length: Fraction,
    /// Maximum ledger thickness (interline fraction).
    pub max_thickness: Fraction,
    /// Maximum ordinate shift from the expected virtual line (interline
    /// fraction).
    pub max_delta_shift: Fraction,
    /// Minimum abscissa overlap with the reference on the previous line
    /// (interline fraction).
    pub min_abscissa_overlap: Fraction,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            min_length: Fraction(0.8),
            max_thickness: Fraction(0.4),
            max_delta_shift: Fraction(0.4),
            min_abscissa_overlap: Fraction(0.5),
        }
    }
}

/// Knobs for multi-measure rest recognition.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MultiRestParams {
    /// Minimum candidate length, in interline multiples. A beam shorter than
    /// `min_length_factor * interline` pixels is never proposed.
    pub min_length_factor: f64,
    /// Maximum ordinate shift from the staff middle line (interline
    /// fraction).
    pub max_line_shift: Fraction,
    /// Horizontal search range for a serif around each end (interline
    /// fraction).
    pub serif_search_dx: Fraction,
    /// Minimum serif height (interline fraction).
    pub min_serif_height: Fraction,
}

impl Default for MultiRestParams {
    fn default() -> Self {
        Self {
            min_length_factor: 4.0,
            max_line_shift: Fraction(0.3),
            serif_search_dx: Fraction(0.75),
            min_serif_height: Fraction(1.0),
        }
    }
}

/// Sigma coefficients of the post-analysis screening.
///
/// Bounds are `mean + low * sigma` and `mean + high * sigma` per measurement
/// category; the pairs need not be symmetric. All values are free
/// parameters, tuned here as defaults only.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Low coefficient for ledger ordinate deltas (negative).
    pub delta_sigma_low: f64,
    /// High coefficient for ledger ordinate deltas (positive).
    pub delta_sigma_high: f64,
    /// Low coefficient for ledger thickness (negative).
    pub thickness_sigma_low: f64,
    /// High coefficient for ledger thickness (positive).
    pub thickness_sigma_high: f64,
    /// Low coefficient for beam heights (negative).
    pub height_sigma_low: f64,
    /// High coefficient for beam heights (positive).
    pub height_sigma_high: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            delta_sigma_low: -1.0,
            delta_sigma_high: 1.0,
            thickness_sigma_low: -1.0,
            thickness_sigma_high: 1.0,
            height_sigma_low: -1.0,
            height_sigma_high: 1.0,
        }
    }
}
