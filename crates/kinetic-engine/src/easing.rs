//! Easing curves for animation timing.
//!
//! Every curve is a plain `fn(f32) -> f32` held in a static table, so looking
//! one up never allocates and the result can be shared by any number of
//! animations. All curves satisfy `f(0) == 0` and `f(1) == 1`; bounce and
//! elastic overshoot in between.
//!
//! # Usage
//!
//! ```
//! use kinetic_engine::easing::{easing_fn, EasingId};
//!
//! let ease = easing_fn(EasingId::EaseOutCubic);
//! let progress = ease(0.5);
//! assert!(progress > 0.5);
//!
//! // Unknown names fall back to linear.
//! assert_eq!(EasingId::parse_or_linear("wobble"), EasingId::Linear);
//! ```

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::MotionError;

/// Signature shared by all easing curves.
pub type EasingFn = fn(f32) -> f32;

/// Identifier of a curve in the easing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EasingId {
    /// No easing.
    #[default]
    Linear,
    /// Cubic acceleration from zero velocity.
    EaseInCubic,
    /// Cubic deceleration to zero velocity.
    EaseOutCubic,
    /// Cubic acceleration until halfway, then deceleration.
    EaseInOutCubic,
    /// Ball dropped on the end value.
    Bounce,
    /// Spring overshooting the end value.
    Elastic,
    /// CSS `ease`, `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    Ease,
    /// CSS `ease-in`, `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,
    /// CSS `ease-out`, `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,
    /// CSS `ease-in-out`, `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,
}

static EASING_TABLE: [(EasingId, &str, EasingFn); 10] = [
    (EasingId::Linear, "linear", linear),
    (EasingId::EaseInCubic, "ease-in-cubic", ease_in_cubic),
    (EasingId::EaseOutCubic, "ease-out-cubic", ease_out_cubic),
    (EasingId::EaseInOutCubic, "ease-in-out-cubic", ease_in_out_cubic),
    (EasingId::Bounce, "bounce", bounce),
    (EasingId::Elastic, "elastic", elastic),
    (EasingId::Ease, "ease", css_ease),
    (EasingId::EaseIn, "ease-in", css_ease_in),
    (EasingId::EaseOut, "ease-out", css_ease_out),
    (EasingId::EaseInOut, "ease-in-out", css_ease_in_out),
];

/// Look up the curve for an id.
#[inline]
pub fn easing_fn(id: EasingId) -> EasingFn {
    EASING_TABLE[id as usize].2
}

impl EasingId {
    /// Every registered curve, in table order.
    pub const ALL: [EasingId; 10] = [
        EasingId::Linear,
        EasingId::EaseInCubic,
        EasingId::EaseOutCubic,
        EasingId::EaseInOutCubic,
        EasingId::Bounce,
        EasingId::Elastic,
        EasingId::Ease,
        EasingId::EaseIn,
        EasingId::EaseOut,
        EasingId::EaseInOut,
    ];

    /// Evaluate the curve at `t`. Input is clamped to [0, 1].
    #[inline]
    pub fn evaluate(self, t: f32) -> f32 {
        easing_fn(self)(t)
    }

    /// Kebab-case name of the curve.
    pub fn name(self) -> &'static str {
        EASING_TABLE[self as usize].1
    }

    /// Parse a curve name, falling back to linear for anything unknown.
    pub fn parse_or_linear(name: &str) -> Self {
        match name.parse() {
            Ok(id) => id,
            Err(_) => {
                tracing::warn!(name, "unknown easing, falling back to linear");
                Self::Linear
            }
        }
    }
}

impl FromStr for EasingId {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        EASING_TABLE
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(needle))
            .map(|(id, _, _)| *id)
            .ok_or_else(|| MotionError::UnknownEasing(s.to_string()))
    }
}

impl fmt::Display for EasingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pins the endpoints so every curve hits 0 and 1 exactly.
#[inline]
fn endpoint(t: f32) -> Option<f32> {
    if t.is_nan() || t <= 0.0 {
        Some(0.0)
    } else if t >= 1.0 {
        Some(1.0)
    } else {
        None
    }
}

fn linear(t: f32) -> f32 {
    endpoint(t).unwrap_or(t)
}

fn ease_in_cubic(t: f32) -> f32 {
    endpoint(t).unwrap_or(t * t * t)
}

fn ease_out_cubic(t: f32) -> f32 {
    endpoint(t).unwrap_or_else(|| 1.0 - (1.0 - t).powi(3))
}

fn ease_in_out_cubic(t: f32) -> f32 {
    endpoint(t).unwrap_or_else(|| {
        if t < 0.5 {
            4.0 * t * t * t
        } else {
            1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
        }
    })
}

fn bounce(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    endpoint(t).unwrap_or_else(|| {
        if t < 1.0 / D1 {
            N1 * t * t
        } else if t < 2.0 / D1 {
            let t = t - 1.5 / D1;
            N1 * t * t + 0.75
        } else if t < 2.5 / D1 {
            let t = t - 2.25 / D1;
            N1 * t * t + 0.9375
        } else {
            let t = t - 2.625 / D1;
            N1 * t * t + 0.984375
        }
    })
}

fn elastic(t: f32) -> f32 {
    const C4: f32 = (2.0 * PI) / 3.0;

    endpoint(t).unwrap_or_else(|| 2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0)
}

fn css_ease(t: f32) -> f32 {
    cubic_bezier(0.25, 0.1, 0.25, 1.0, t)
}

fn css_ease_in(t: f32) -> f32 {
    cubic_bezier(0.42, 0.0, 1.0, 1.0, t)
}

fn css_ease_out(t: f32) -> f32 {
    cubic_bezier(0.0, 0.0, 0.58, 1.0, t)
}

fn css_ease_in_out(t: f32) -> f32 {
    cubic_bezier(0.42, 0.0, 0.58, 1.0, t)
}

/// Evaluate a cubic bezier timing curve at progress `progress`.
///
/// Newton-Raphson finds the curve parameter whose x matches the progress,
/// then the y coordinate at that parameter is returned.
fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32, progress: f32) -> f32 {
    if let Some(edge) = endpoint(progress) {
        return edge;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_y(y1, y2, t)
}

fn solve_bezier_x(x1: f32, x2: f32, target_x: f32) -> f32 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_axis(x1, x2, t) - target_x;
        if x.abs() < 1e-6 {
            break;
        }

        let dx = bezier_x_derivative(x1, x2, t);
        if dx.abs() < 1e-6 {
            break;
        }

        t -= x / dx;
        t = t.clamp(0.0, 1.0);
    }

    t
}

/// One axis of the curve: `3(1-t)²t·p1 + 3(1-t)t²·p2 + t³`.
#[inline]
fn bezier_axis(p1: f32, p2: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    3.0 * mt2 * t * p1 + 3.0 * mt * t2 * p2 + t3
}

#[inline]
fn bezier_y(y1: f32, y2: f32, t: f32) -> f32 {
    bezier_axis(y1, y2, t)
}

/// dx/dt = 3(1-t)²·x1 + 6(1-t)t·(x2-x1) + 3t²·(1-x2)
#[inline]
fn bezier_x_derivative(x1: f32, x2: f32, t: f32) -> f32 {
    let mt = 1.0 - t;
    3.0 * mt * mt * x1 + 6.0 * mt * t * (x2 - x1) + 3.0 * t * t * (1.0 - x2)
}
