//! Difficulty-rating math.
//!
//! The rating itself is an opaque pure function as far as the rest of the
//! system is concerned; the scanner only cares that it is expensive,
//! deterministic and cancellable between work chunks.

use crate::core::job::CancelToken;

/// Everything the rating pass needs from a chart, copied out so the worker
/// never reads the live catalog.
#[derive(Debug, Clone)]
pub struct RatingInput {
    pub notes: u32,
    pub holds: u32,
    pub jumps: u32,
    pub bpm: f64,
    pub length_secs: f64,
}

/// Strain integration window, one per second of chart.
const MAX_WINDOWS: u32 = 600;

/// Compute a chart's star rating.  Polls the token once per window and
/// returns `None` (no partial result) when cancelled.  Always positive on
/// completion so a computed rating never reads as the unrated sentinel.
pub fn compute(input: &RatingInput, token: &CancelToken) -> Option<f64> {
    let length = input.length_secs.max(1.0);
    let nps = f64::from(input.notes) / length;
    let windows = (length.ceil() as u32).clamp(1, MAX_WINDOWS);

    let mut strain = 0.0;
    for w in 0..windows {
        if token.is_cancelled() {
            return None;
        }
        // Simulated per-window strain: density modulated across the chart,
        // with jump clusters weighing in harder than sustained holds.
        let phase = f64::from(w) / f64::from(windows) * std::f64::consts::PI;
        let local = nps * (1.0 + 0.35 * phase.sin());
        strain += local.powf(1.3);
    }

    let base = (strain / f64::from(windows)).powf(0.78);
    let total = f64::from(input.notes.max(1));
    let jump_share = f64::from(input.jumps) / total;
    let hold_share = f64::from(input.holds) / total;
    let tempo = (input.bpm / 150.0).clamp(0.5, 2.0);

    let stars = base * tempo * (1.0 + 0.6 * jump_share + 0.25 * hold_share);
    Some(stars.clamp(0.05, 15.0))
}
