//! Keyframe definitions and the shared keyframe registry.
//!
//! This module provides:
//! - `Keyframe`: property values at one offset of a timeline
//! - `KeyframeAnimation`: a named, ordered keyframe curve
//! - `KeyframeRegistry`: the reference-counted table of registered curves
//! - `KeyframeLease`: a registration that is released on drop
//!
//! The registry is the one piece of shared mutable state in the engine. It is
//! an explicit service (clone the handle to share it) so every test can build
//! an isolated instance. Two holders of the same name never clobber each
//! other: identical definitions share one entry through a reference count and
//! a different definition under an existing name is registered under a
//! uniqued name.
//!
//! # Example
//!
//! ```
//! use kinetic_engine::keyframes::{KeyframeAnimation, KeyframeRegistry};
//! use kinetic_engine::surface::VisualProperty;
//!
//! let registry = KeyframeRegistry::new();
//! let fade = KeyframeAnimation::new("fade-in")
//!     .keyframe(0.0, |kf| kf.set(VisualProperty::Opacity, 0.0))
//!     .keyframe(1.0, |kf| kf.set(VisualProperty::Opacity, 1.0));
//!
//! let lease = registry.acquire(fade);
//! assert_eq!(registry.ref_count("fade-in"), 1);
//! drop(lease);
//! assert!(registry.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};

use crate::easing::EasingId;
use crate::error::{MotionError, Result};
use crate::surface::{VisualProperty, VisualState};

/// A single point in a keyframe curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position in the timeline (0.0 to 1.0).
    pub offset: f32,
    pub values: BTreeMap<VisualProperty, f32>,
    /// Easing used when interpolating TO this keyframe.
    pub easing: Option<EasingId>,
}

impl Keyframe {
    pub fn new(offset: f32) -> Self {
        let offset = if offset.is_nan() { 0.0 } else { offset.clamp(0.0, 1.0) };
        Self {
            offset,
            values: BTreeMap::new(),
            easing: None,
        }
    }

    pub fn set(mut self, property: VisualProperty, value: f32) -> Self {
        self.values.insert(property, value);
        self
    }

    pub fn with_easing(mut self, easing: EasingId) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn get(&self, property: VisualProperty) -> Option<f32> {
        self.values.get(&property).copied()
    }
}

/// A named keyframe curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeAnimation {
    pub name: String,
    /// Sorted by offset.
    pub keyframes: Vec<Keyframe>,
    /// Easing for keyframes without their own.
    pub default_easing: EasingId,
}

impl KeyframeAnimation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keyframes: Vec::new(),
            default_easing: EasingId::Linear,
        }
    }

    pub fn default_easing(mut self, easing: EasingId) -> Self {
        self.default_easing = easing;
        self
    }

    /// Add a keyframe using a builder function.
    pub fn keyframe<F>(self, offset: f32, builder: F) -> Self
    where
        F: FnOnce(Keyframe) -> Keyframe,
    {
        self.add_keyframe(builder(Keyframe::new(offset)))
    }

    pub fn add_keyframe(mut self, keyframe: Keyframe) -> Self {
        self.keyframes.push(keyframe);
        self.keyframes.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        self
    }

    /// Rename, keeping the curve.
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Same keyframes and easing, regardless of name.
    pub fn same_curve(&self, other: &KeyframeAnimation) -> bool {
        self.default_easing == other.default_easing && self.keyframes == other.keyframes
    }

    /// Properties touched by any keyframe, in a stable order.
    pub fn animated_properties(&self) -> Vec<VisualProperty> {
        let mut props: Vec<VisualProperty> = self
            .keyframes
            .iter()
            .flat_map(|kf| kf.values.keys().copied())
            .collect();
        props.sort();
        props.dedup();
        props
    }

    /// Find the keyframes bracketing `offset`.
    ///
    /// Returns `(from, to, local_progress)` with `local_progress` in [0, 1]
    /// between the two.
    pub fn find_keyframes(&self, offset: f32) -> Option<(&Keyframe, &Keyframe, f32)> {
        let frames: Vec<&Keyframe> = self.keyframes.iter().collect();
        bracket(&frames, offset)
    }

    /// Value of `property` at `offset`, if any keyframe defines it.
    ///
    /// Keyframes that omit the property are skipped, so the value is
    /// interpolated between the nearest keyframes that define it.
    pub fn value_at(&self, property: VisualProperty, offset: f32) -> Option<f32> {
        let frames: Vec<&Keyframe> = self
            .keyframes
            .iter()
            .filter(|kf| kf.values.contains_key(&property))
            .collect();
        let (from, to, local) = bracket(&frames, offset)?;
        let a = from.get(property)?;
        let b = to.get(property)?;
        let easing = to.easing.unwrap_or(self.default_easing);
        Some(crate::math::lerp(a, b, easing.evaluate(local)))
    }

    /// Sample every animated property at `offset` on top of `base`.
    pub fn sample(&self, offset: f32, base: &VisualState) -> VisualState {
        let mut state = *base;
        for property in self.animated_properties() {
            if let Some(value) = self.value_at(property, offset) {
                state.set(property, value);
            }
        }
        state
    }
}

fn bracket<'a>(frames: &[&'a Keyframe], offset: f32) -> Option<(&'a Keyframe, &'a Keyframe, f32)> {
    let first = *frames.first()?;
    let last = *frames.last()?;
    let offset = if offset.is_nan() { 0.0 } else { offset.clamp(0.0, 1.0) };

    if offset <= first.offset {
        return Some((first, first, 0.0));
    }
    if offset >= last.offset {
        return Some((last, last, 1.0));
    }

    // first.offset < offset < last.offset, so 1 <= to_idx < len.
    let to_idx = frames.iter().position(|kf| kf.offset >= offset)?;
    let from = frames[to_idx - 1];
    let to = frames[to_idx];
    let range = to.offset - from.offset;
    let local = if range > 0.0 {
        ((offset - from.offset) / range).clamp(0.0, 1.0)
    } else {
        1.0
    };
    Some((from, to, local))
}

#[derive(Debug)]
struct Entry {
    animation: Rc<KeyframeAnimation>,
    refs: usize,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<String, Entry>,
    /// New entries ever created.
    registrations: usize,
    next_unique: u64,
}

impl RegistryInner {
    fn insert(&mut self, animation: KeyframeAnimation) -> Rc<KeyframeAnimation> {
        let animation = Rc::new(animation);
        self.entries.insert(
            animation.name.clone(),
            Entry {
                animation: animation.clone(),
                refs: 1,
            },
        );
        self.registrations += 1;
        tracing::trace!(name = %animation.name, "registered keyframes");
        animation
    }

    /// Bump an identical entry under `name`, or report why not.
    fn try_share(&mut self, name: &str, animation: &KeyframeAnimation) -> Option<Option<Rc<KeyframeAnimation>>> {
        let entry = self.entries.get_mut(name)?;
        if entry.animation.same_curve(animation) {
            entry.refs += 1;
            Some(Some(entry.animation.clone()))
        } else {
            Some(None)
        }
    }
}

/// Reference-counted table of keyframe curves.
#[derive(Debug, Clone, Default)]
pub struct KeyframeRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl KeyframeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `animation` under its name, sharing an identical entry.
    ///
    /// A different curve already registered under that name is left alone
    /// and this one is registered as `name-2`, `name-3`, ...
    pub fn acquire(&self, animation: KeyframeAnimation) -> KeyframeLease {
        let mut inner = self.inner.borrow_mut();

        let mut name = animation.name.clone();
        let mut suffix = 1u32;
        let shared = loop {
            match inner.try_share(&name, &animation) {
                Some(Some(shared)) => break shared,
                Some(None) => {
                    suffix += 1;
                    name = format!("{}-{}", animation.name, suffix);
                }
                None => {
                    if suffix > 1 {
                        tracing::debug!(
                            requested = %animation.name,
                            assigned = %name,
                            "keyframe name taken by a different curve"
                        );
                    }
                    break inner.insert(animation.renamed(name));
                }
            }
        };

        KeyframeLease::new(shared, Rc::downgrade(&self.inner))
    }

    /// Register `animation` under a fresh `prefix-<n>` name.
    pub fn acquire_unique(&self, prefix: &str, animation: KeyframeAnimation) -> KeyframeLease {
        let mut inner = self.inner.borrow_mut();
        let name = loop {
            inner.next_unique += 1;
            let candidate = format!("{}-{}", prefix, inner.next_unique);
            if !inner.entries.contains_key(&candidate) {
                break candidate;
            }
        };
        let shared = inner.insert(animation.renamed(name));
        KeyframeLease::new(shared, Rc::downgrade(&self.inner))
    }

    /// Drop one reference to `name`, removing the entry at zero.
    pub fn release(&self, name: &str) -> Result<()> {
        release_in(&self.inner, name)
    }

    pub fn get(&self, name: &str) -> Option<Rc<KeyframeAnimation>> {
        self.inner
            .borrow()
            .entries
            .get(name)
            .map(|e| e.animation.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().entries.contains_key(name)
    }

    pub fn ref_count(&self, name: &str) -> usize {
        self.inner
            .borrow()
            .entries
            .get(name)
            .map(|e| e.refs)
            .unwrap_or(0)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct entries ever created.
    pub fn registration_count(&self) -> usize {
        self.inner.borrow().registrations
    }
}

fn release_in(inner: &RefCell<RegistryInner>, name: &str) -> Result<()> {
    let mut inner = inner.borrow_mut();
    let Some(entry) = inner.entries.get_mut(name) else {
        return Err(MotionError::UnknownKeyframes(name.to_string()));
    };
    entry.refs = entry.refs.saturating_sub(1);
    if entry.refs == 0 {
        inner.entries.remove(name);
        tracing::trace!(name, "deregistered keyframes");
    }
    Ok(())
}

/// One holder's registration of a keyframe curve.
///
/// Released exactly once, by [`release`](Self::release) or on drop.
#[derive(Debug)]
pub struct KeyframeLease {
    animation: Rc<KeyframeAnimation>,
    registry: Weak<RefCell<RegistryInner>>,
    released: bool,
}

impl KeyframeLease {
    fn new(animation: Rc<KeyframeAnimation>, registry: Weak<RefCell<RegistryInner>>) -> Self {
        Self {
            animation,
            registry,
            released: false,
        }
    }

    /// Registered name (may differ from the requested one).
    pub fn name(&self) -> &str {
        &self.animation.name
    }

    pub fn animation(&self) -> &KeyframeAnimation {
        &self.animation
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            if let Err(err) = release_in(&registry, &self.animation.name) {
                tracing::debug!(%err, "keyframe lease outlived its entry");
            }
        }
    }
}

impl Drop for KeyframeLease {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn fade(name: &str) -> KeyframeAnimation {
        KeyframeAnimation::new(name)
            .keyframe(0.0, |kf| kf.set(VisualProperty::Opacity, 0.0))
            .keyframe(1.0, |kf| kf.set(VisualProperty::Opacity, 1.0))
    }

    #[test]
    fn test_keyframes_sorted_on_insert() {
        let anim = KeyframeAnimation::new("x")
            .keyframe(1.0, |kf| kf.set(VisualProperty::Scale, 2.0))
            .keyframe(0.0, |kf| kf.set(VisualProperty::Scale, 1.0))
            .keyframe(0.5, |kf| kf.set(VisualProperty::Scale, 3.0));
        let offsets: Vec<f32> = anim.keyframes.iter().map(|k| k.offset).collect();
        assert_eq!(offsets, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_find_keyframes() {
        let anim = KeyframeAnimation::new("x")
            .keyframe(0.0, |kf| kf.set(VisualProperty::Scale, 1.0))
            .keyframe(0.5, |kf| kf.set(VisualProperty::Scale, 2.0))
            .keyframe(1.0, |kf| kf.set(VisualProperty::Scale, 1.0));

        let (from, to, local) = anim.find_keyframes(0.25).unwrap();
        assert_eq!(from.offset, 0.0);
        assert_eq!(to.offset, 0.5);
        assert!(approx_eq(local, 0.5));

        let (from, to, local) = anim.find_keyframes(0.75).unwrap();
        assert_eq!(from.offset, 0.5);
        assert_eq!(to.offset, 1.0);
        assert!(approx_eq(local, 0.5));

        let (from, to, _) = anim.find_keyframes(1.0).unwrap();
        assert_eq!(from.offset, 1.0);
        assert_eq!(to.offset, 1.0);

        assert!(KeyframeAnimation::new("empty").find_keyframes(0.5).is_none());
    }

    #[test]
    fn test_value_at_linear() {
        let anim = fade("fade");
        assert!(approx_eq(anim.value_at(VisualProperty::Opacity, 0.0).unwrap(), 0.0));
        assert!(approx_eq(anim.value_at(VisualProperty::Opacity, 0.5).unwrap(), 0.5));
        assert!(approx_eq(anim.value_at(VisualProperty::Opacity, 1.0).unwrap(), 1.0));
        assert!(anim.value_at(VisualProperty::Scale, 0.5).is_none());
    }

    #[test]
    fn test_value_at_holds_missing_property() {
        let anim = KeyframeAnimation::new("x")
            .keyframe(0.0, |kf| kf.set(VisualProperty::Opacity, 0.0).set(VisualProperty::Scale, 0.5))
            .keyframe(0.5, |kf| kf.set(VisualProperty::Opacity, 1.0))
            .keyframe(1.0, |kf| kf.set(VisualProperty::Scale, 1.0));
        // Scale skips the middle keyframe.
        assert!(approx_eq(anim.value_at(VisualProperty::Scale, 0.25).unwrap(), 0.625));
        assert!(approx_eq(anim.value_at(VisualProperty::Opacity, 0.75).unwrap(), 1.0));
    }

    #[test]
    fn test_sample_keeps_base_for_untouched_properties() {
        let base = VisualState::IDENTITY.with(VisualProperty::TranslateX, 40.0);
        let state = fade("fade").sample(0.5, &base);
        assert!(approx_eq(state.opacity, 0.5));
        assert_eq!(state.translate_x, 40.0);
    }

    #[test]
    fn test_acquire_shares_identical_curve() {
        let registry = KeyframeRegistry::new();
        let a = registry.acquire(fade("fade"));
        let b = registry.acquire(fade("fade"));
        assert_eq!(a.name(), b.name());
        assert_eq!(registry.ref_count("fade"), 2);
        assert_eq!(registry.registration_count(), 1);

        drop(a);
        assert!(registry.contains("fade"));
        drop(b);
        assert!(!registry.contains("fade"));
    }

    #[test]
    fn test_acquire_uniques_conflicting_curve() {
        let registry = KeyframeRegistry::new();
        let a = registry.acquire(fade("pop"));
        let other = KeyframeAnimation::new("pop")
            .keyframe(0.0, |kf| kf.set(VisualProperty::Scale, 0.0))
            .keyframe(1.0, |kf| kf.set(VisualProperty::Scale, 1.0));
        let b = registry.acquire(other.clone());
        let c = registry.acquire(other);

        assert_eq!(a.name(), "pop");
        assert_eq!(b.name(), "pop-2");
        assert_eq!(c.name(), "pop-2");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ref_count("pop-2"), 2);
        // The original entry is untouched.
        assert!(registry.get("pop").unwrap().same_curve(&fade("pop")));
    }

    #[test]
    fn test_acquire_unique_names() {
        let registry = KeyframeRegistry::new();
        let a = registry.acquire_unique("transition", fade("f"));
        let b = registry.acquire_unique("transition", fade("f"));
        assert_ne!(a.name(), b.name());
        assert!(a.name().starts_with("transition-"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_lease_release_is_idempotent() {
        let registry = KeyframeRegistry::new();
        let _keep = registry.acquire(fade("fade"));
        let mut lease = registry.acquire(fade("fade"));
        lease.release();
        lease.release();
        assert!(lease.is_released());
        assert_eq!(registry.ref_count("fade"), 1);
        drop(lease);
        assert_eq!(registry.ref_count("fade"), 1);
    }

    #[test]
    fn test_release_unknown_name() {
        let registry = KeyframeRegistry::new();
        assert_eq!(
            registry.release("missing"),
            Err(MotionError::UnknownKeyframes("missing".to_string()))
        );
    }

    #[test]
    fn test_lease_outliving_registry() {
        let registry = KeyframeRegistry::new();
        let lease = registry.acquire(fade("fade"));
        drop(registry);
        assert_eq!(lease.name(), "fade");
        drop(lease);
    }
}
