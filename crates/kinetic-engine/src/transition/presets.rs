//! Keyframe curves for the built-in transition kinds.
//!
//! Every curve is written for the enter direction; exit curves are the same
//! keyframes mirrored in time. Curves are linear between keyframes, the
//! transition's own easing is applied to the timeline before sampling.

use serde::{Deserialize, Serialize};

use crate::keyframes::{Keyframe, KeyframeAnimation};
use crate::surface::VisualProperty;

/// Edge a sliding surface enters from and exits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideFrom {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Fade,
    Slide(SlideFrom),
    Scale,
    /// An overlay wipes across, the content swaps underneath.
    Curtain,
    /// Content reshapes while an overlay blooms out of its center.
    Morph,
    /// Content rises behind an overlay that drains away.
    Liquid,
}

impl TransitionKind {
    /// Kinds that drive a second overlay surface.
    pub fn uses_overlay(self) -> bool {
        matches!(self, Self::Curtain | Self::Morph | Self::Liquid)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Fade => "fade",
            Self::Slide(SlideFrom::Up) => "slide-up",
            Self::Slide(SlideFrom::Down) => "slide-down",
            Self::Slide(SlideFrom::Left) => "slide-left",
            Self::Slide(SlideFrom::Right) => "slide-right",
            Self::Scale => "scale",
            Self::Curtain => "curtain",
            Self::Morph => "morph",
            Self::Liquid => "liquid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionDirection {
    In,
    Out,
}

impl TransitionDirection {
    pub fn name(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Default slide travel in pixels.
pub const DEFAULT_SLIDE_DISTANCE: f32 = 60.0;

/// Curve for the transitioning surface itself.
pub fn content_keyframes(kind: TransitionKind, direction: TransitionDirection, slide_distance: f32) -> KeyframeAnimation {
    use VisualProperty::*;

    let name = format!("kinetic-{}-{}", kind.name(), direction.name());
    let enter = match kind {
        TransitionKind::Fade => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(Opacity, 0.0))
            .keyframe(1.0, |kf| kf.set(Opacity, 1.0)),
        TransitionKind::Slide(from) => {
            let (property, start) = match from {
                SlideFrom::Up => (TranslateY, -slide_distance),
                SlideFrom::Down => (TranslateY, slide_distance),
                SlideFrom::Left => (TranslateX, -slide_distance),
                SlideFrom::Right => (TranslateX, slide_distance),
            };
            KeyframeAnimation::new(name)
                .keyframe(0.0, |kf| kf.set(property, start).set(Opacity, 0.0))
                .keyframe(1.0, |kf| kf.set(property, 0.0).set(Opacity, 1.0))
        }
        TransitionKind::Scale => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(Scale, 0.8).set(Opacity, 0.0))
            .keyframe(1.0, |kf| kf.set(Scale, 1.0).set(Opacity, 1.0)),
        // Hidden until the overlay fully covers it.
        TransitionKind::Curtain => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(Opacity, 0.0))
            .keyframe(0.5, |kf| kf.set(Opacity, 0.0))
            .keyframe(0.501, |kf| kf.set(Opacity, 1.0))
            .keyframe(1.0, |kf| kf.set(Opacity, 1.0)),
        TransitionKind::Morph => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(Scale, 0.9).set(Rotate, -3.0).set(Opacity, 0.0))
            .keyframe(0.6, |kf| kf.set(Scale, 1.02).set(Rotate, 0.5).set(Opacity, 1.0))
            .keyframe(1.0, |kf| kf.set(Scale, 1.0).set(Rotate, 0.0)),
        TransitionKind::Liquid => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(TranslateY, 40.0).set(Opacity, 0.0))
            .keyframe(0.4, |kf| kf.set(Opacity, 1.0))
            .keyframe(1.0, |kf| kf.set(TranslateY, 0.0)),
    };
    oriented(enter, direction)
}

/// Curve for the overlay of Curtain, Morph and Liquid; `None` for the rest.
pub fn overlay_keyframes(kind: TransitionKind, direction: TransitionDirection) -> Option<KeyframeAnimation> {
    use VisualProperty::*;

    let name = format!("kinetic-{}-overlay-{}", kind.name(), direction.name());
    let enter = match kind {
        // Grows down from the top edge, then retracts downwards.
        TransitionKind::Curtain => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(ClipTop, 0.0).set(ClipBottom, 1.0))
            .keyframe(0.5, |kf| kf.set(ClipTop, 0.0).set(ClipBottom, 0.0))
            .keyframe(1.0, |kf| kf.set(ClipTop, 1.0).set(ClipBottom, 0.0)),
        TransitionKind::Morph => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(Scale, 0.0).set(Opacity, 1.0))
            .keyframe(0.5, |kf| kf.set(Scale, 1.5).set(Opacity, 0.8))
            .keyframe(1.0, |kf| kf.set(Scale, 2.0).set(Opacity, 0.0)),
        TransitionKind::Liquid => KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(ClipTop, 1.0).set(Opacity, 1.0))
            .keyframe(0.5, |kf| kf.set(ClipTop, 0.0))
            .keyframe(1.0, |kf| kf.set(ClipTop, 1.0).set(Opacity, 0.6)),
        TransitionKind::Fade | TransitionKind::Slide(_) | TransitionKind::Scale => return None,
    };
    Some(oriented(enter, direction))
}

fn oriented(enter: KeyframeAnimation, direction: TransitionDirection) -> KeyframeAnimation {
    match direction {
        TransitionDirection::In => enter,
        TransitionDirection::Out => mirrored(enter),
    }
}

/// Play `animation` backwards: offset `t` moves to `1 - t`.
fn mirrored(animation: KeyframeAnimation) -> KeyframeAnimation {
    let KeyframeAnimation {
        name,
        keyframes,
        default_easing,
    } = animation;
    keyframes
        .into_iter()
        .fold(KeyframeAnimation::new(name).default_easing(default_easing), |anim, kf| {
            let mut flipped = Keyframe::new(1.0 - kf.offset);
            flipped.values = kf.values;
            flipped.easing = kf.easing;
            anim.add_keyframe(flipped)
        })
}
