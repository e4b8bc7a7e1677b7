//! Interpolation and range helpers shared by every component.
//!
//! All functions are pure. [`map_range`] returns `0.0` when the input range is
//! empty (`in_lo == in_hi`) instead of dividing by zero; callers relying on a
//! progress value get "not started" rather than `NaN`.

use rand::Rng;

/// Linear interpolation: `a + (b - a) * t`. `t` is not clamped.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamp `v` into `[lo, hi]`. A NaN input yields `lo`.
#[inline]
pub fn clamp(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        return lo;
    }
    v.max(lo).min(hi)
}

/// Clamp into the unit interval.
#[inline]
pub fn clamp01(v: f32) -> f32 {
    clamp(v, 0.0, 1.0)
}

/// Map `v` from `[in_lo, in_hi]` onto `[out_lo, out_hi]` without clamping.
///
/// Returns `0.0` for a degenerate input range.
#[inline]
pub fn map_range(v: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    let span = in_hi - in_lo;
    if span == 0.0 || !span.is_finite() {
        return 0.0;
    }
    out_lo + (v - in_lo) / span * (out_hi - out_lo)
}

/// Uniform float in `[min, max)`. A reversed range is swapped, an empty one
/// returns `min`.
pub fn random_in_range<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if lo == hi || !lo.is_finite() || !hi.is_finite() {
        return min;
    }
    rng.gen_range(lo..hi)
}

/// Uniform integer in `[min, max]` (inclusive). A reversed range is swapped.
pub fn random_int_in_range<R: Rng + ?Sized>(rng: &mut R, min: i32, max: i32) -> i32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(lo..=hi)
}
