//! Target surfaces: the visual elements animations mutate.
//!
//! The presentation layer owns its surfaces (`Rc<RefCell<S>>`); the engine only
//! ever holds a [`SurfaceRef`], a weak handle. A surface that has been dropped
//! or reports `is_attached() == false` is not live, and every mutation through
//! a `SurfaceRef` checks that first and silently skips otherwise.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::math::lerp;
use crate::types::SurfaceId;

/// A single animatable visual property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualProperty {
    TranslateX,
    TranslateY,
    Scale,
    /// Rotation in degrees.
    Rotate,
    Opacity,
    /// Clip insets are fractions of the surface size, 0 = uncut.
    ClipTop,
    ClipRight,
    ClipBottom,
    ClipLeft,
}

/// Inset clip region as fractions of the surface's size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClipInset {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

/// The visual properties of a surface the engine may write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualState {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
    pub rotate: f32,
    pub opacity: f32,
    pub clip: ClipInset,
}

impl Default for VisualState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl VisualState {
    /// Untransformed, fully opaque, unclipped.
    pub const IDENTITY: VisualState = VisualState {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
        rotate: 0.0,
        opacity: 1.0,
        clip: ClipInset {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        },
    };

    pub fn get(&self, property: VisualProperty) -> f32 {
        match property {
            VisualProperty::TranslateX => self.translate_x,
            VisualProperty::TranslateY => self.translate_y,
            VisualProperty::Scale => self.scale,
            VisualProperty::Rotate => self.rotate,
            VisualProperty::Opacity => self.opacity,
            VisualProperty::ClipTop => self.clip.top,
            VisualProperty::ClipRight => self.clip.right,
            VisualProperty::ClipBottom => self.clip.bottom,
            VisualProperty::ClipLeft => self.clip.left,
        }
    }

    pub fn set(&mut self, property: VisualProperty, value: f32) {
        match property {
            VisualProperty::TranslateX => self.translate_x = value,
            VisualProperty::TranslateY => self.translate_y = value,
            VisualProperty::Scale => self.scale = value,
            VisualProperty::Rotate => self.rotate = value,
            VisualProperty::Opacity => self.opacity = value,
            VisualProperty::ClipTop => self.clip.top = value,
            VisualProperty::ClipRight => self.clip.right = value,
            VisualProperty::ClipBottom => self.clip.bottom = value,
            VisualProperty::ClipLeft => self.clip.left = value,
        }
    }

    pub fn with(mut self, property: VisualProperty, value: f32) -> Self {
        self.set(property, value);
        self
    }

    /// Per-property interpolation.
    pub fn interpolate(&self, to: &VisualState, t: f32) -> VisualState {
        VisualState {
            translate_x: lerp(self.translate_x, to.translate_x, t),
            translate_y: lerp(self.translate_y, to.translate_y, t),
            scale: lerp(self.scale, to.scale, t),
            rotate: lerp(self.rotate, to.rotate, t),
            opacity: lerp(self.opacity, to.opacity, t),
            clip: ClipInset {
                top: lerp(self.clip.top, to.clip.top, t),
                right: lerp(self.clip.right, to.clip.right, t),
                bottom: lerp(self.clip.bottom, to.clip.bottom, t),
                left: lerp(self.clip.left, to.clip.left, t),
            },
        }
    }
}

/// Layout rectangle in document coordinates (logical pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> crate::types::Point {
        crate::types::Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// A visual element the host lets the engine mutate.
pub trait Surface {
    fn id(&self) -> SurfaceId;

    /// Whether the surface is still mounted. Detached surfaces are skipped.
    fn is_attached(&self) -> bool {
        true
    }

    /// Layout rectangle in document coordinates.
    fn bounds(&self) -> Rect;

    /// Current visual state.
    fn visual(&self) -> VisualState;

    /// Write a new visual state.
    fn apply(&mut self, state: &VisualState);

    /// Name of the keyframe animation currently driving the surface, if any.
    fn set_keyframes(&mut self, _name: Option<&str>) {}
}

/// Weak handle to a host-owned surface.
#[derive(Clone)]
pub struct SurfaceRef {
    id: SurfaceId,
    inner: Weak<RefCell<dyn Surface>>,
}

impl std::fmt::Debug for SurfaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRef")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

impl SurfaceRef {
    pub fn new<S: Surface + 'static>(surface: &Rc<RefCell<S>>) -> Self {
        let id = surface.borrow().id();
        let shared: Rc<RefCell<dyn Surface>> = surface.clone();
        Self {
            id,
            inner: Rc::downgrade(&shared),
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Not dropped, not borrowed elsewhere, and attached.
    pub fn is_live(&self) -> bool {
        self.inner
            .upgrade()
            .and_then(|s| s.try_borrow().ok().map(|s| s.is_attached()))
            .unwrap_or(false)
    }

    /// Run `f` against the surface if it is live.
    pub fn with_live<R>(&self, f: impl FnOnce(&mut dyn Surface) -> R) -> Option<R> {
        let surface = self.inner.upgrade()?;
        let mut guard = surface.try_borrow_mut().ok()?;
        if !guard.is_attached() {
            return None;
        }
        Some(f(&mut *guard))
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.with_live(|s| s.bounds())
    }

    pub fn visual(&self) -> Option<VisualState> {
        self.with_live(|s| s.visual())
    }

    /// Apply a state; returns `false` when the surface is not live.
    pub fn apply(&self, state: &VisualState) -> bool {
        self.with_live(|s| s.apply(state)).is_some()
    }

    /// Set one property on top of the current state.
    pub fn set_property(&self, property: VisualProperty, value: f32) -> bool {
        self.with_live(|s| {
            let state = s.visual().with(property, value);
            s.apply(&state);
        })
        .is_some()
    }
}

/// In-memory surface for headless hosts and tests.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    id: SurfaceId,
    bounds: Rect,
    visual: VisualState,
    attached: bool,
    keyframes: Option<String>,
    apply_count: usize,
}

impl MemorySurface {
    pub fn new(bounds: Rect) -> Self {
        Self {
            id: SurfaceId::new(),
            bounds,
            visual: VisualState::IDENTITY,
            attached: true,
            keyframes: None,
            apply_count: 0,
        }
    }

    /// Wrap into the shared form hosts hand to the engine.
    pub fn shared(bounds: Rect) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(bounds)))
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn keyframes(&self) -> Option<&str> {
        self.keyframes.as_deref()
    }

    /// Number of `apply` calls received.
    pub fn apply_count(&self) -> usize {
        self.apply_count
    }
}

impl Surface for MemorySurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn visual(&self) -> VisualState {
        self.visual
    }

    fn apply(&mut self, state: &VisualState) {
        self.visual = *state;
        self.apply_count += 1;
    }

    fn set_keyframes(&mut self, name: Option<&str>) {
        self.keyframes = name.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visual_state_get_set() {
        let mut state = VisualState::IDENTITY;
        state.set(VisualProperty::Opacity, 0.25);
        state.set(VisualProperty::ClipLeft, 0.5);
        assert_eq!(state.get(VisualProperty::Opacity), 0.25);
        assert_eq!(state.clip.left, 0.5);
        assert_eq!(state.get(VisualProperty::Scale), 1.0);
    }

    #[test]
    fn test_visual_state_interpolate() {
        let from = VisualState::IDENTITY.with(VisualProperty::Opacity, 0.0);
        let to = VisualState::IDENTITY.with(VisualProperty::TranslateX, 100.0);
        let mid = from.interpolate(&to, 0.5);
        assert_eq!(mid.opacity, 0.5);
        assert_eq!(mid.translate_x, 50.0);
    }

    #[test]
    fn test_surface_ref_liveness() {
        let surface = MemorySurface::shared(Rect::new(0.0, 0.0, 10.0, 10.0));
        let handle = SurfaceRef::new(&surface);
        assert!(handle.is_live());
        assert!(handle.set_property(VisualProperty::Scale, 2.0));
        assert_eq!(surface.borrow().visual().scale, 2.0);

        surface.borrow_mut().detach();
        assert!(!handle.is_live());
        assert!(!handle.apply(&VisualState::IDENTITY));
        assert_eq!(surface.borrow().apply_count(), 1);
    }

    #[test]
    fn test_surface_ref_dropped_owner() {
        let surface = MemorySurface::shared(Rect::default());
        let handle = SurfaceRef::new(&surface);
        drop(surface);
        assert!(!handle.is_live());
        assert!(handle.bounds().is_none());
    }
}
