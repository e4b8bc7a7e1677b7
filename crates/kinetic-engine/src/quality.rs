//! Adaptive quality tiers.
//!
//! The host reports device and environment signals whenever they change
//! (resize, network change, memory warning, motion preference). The
//! controller maps them to a [`QualityTier`] and a [`QualityProfile`] and
//! notifies subscribers only when the tier actually changes.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use kinetic_config::{QualityConfig, TierProfileConfig};

use crate::dispatch::{Dispatcher, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Phone,
    Tablet,
    Desktop,
}

impl DeviceClass {
    /// Classify by viewport width in logical pixels.
    pub fn from_width(width: f32) -> Self {
        if width < 768.0 {
            Self::Phone
        } else if width < 1024.0 {
            Self::Tablet
        } else {
            Self::Desktop
        }
    }
}

/// Effective connection type as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
    #[default]
    Unknown,
}

impl EffectiveType {
    pub fn is_slow(self) -> bool {
        matches!(self, Self::Slow2g | Self::TwoG)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceSignals {
    pub device_class: DeviceClass,
    pub pixel_ratio: f32,
    pub network: EffectiveType,
    pub save_data: bool,
    /// Used / limit, when the host can measure it.
    pub heap_used_ratio: Option<f32>,
    pub reduced_motion: bool,
}

impl Default for DeviceSignals {
    fn default() -> Self {
        Self {
            device_class: DeviceClass::Desktop,
            pixel_ratio: 1.0,
            network: EffectiveType::Unknown,
            save_data: false,
            heap_used_ratio: None,
            reduced_motion: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// One step down, saturating at `Low`.
    pub fn downgraded(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }
}

/// Effect budget for the current tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub tier: QualityTier,
    pub particle_count: u32,
    pub shader_complexity: f32,
    /// Applied to animation durations; 0 under reduced motion.
    pub duration_multiplier: f32,
}

impl QualityProfile {
    fn from_tier(tier: QualityTier, config: &TierProfileConfig, reduced_motion: bool) -> Self {
        Self {
            tier,
            particle_count: config.particle_count,
            shader_complexity: config.shader_complexity,
            duration_multiplier: if reduced_motion { 0.0 } else { config.duration_multiplier },
        }
    }
}

/// Tier for `signals` under `config`.
pub fn classify(signals: &DeviceSignals, config: &QualityConfig) -> QualityTier {
    let dense = signals.pixel_ratio >= 3.0;
    let base = match signals.device_class {
        DeviceClass::Desktop if dense => QualityTier::Medium,
        DeviceClass::Desktop => QualityTier::High,
        DeviceClass::Tablet => QualityTier::Medium,
        DeviceClass::Phone if dense => QualityTier::Low,
        DeviceClass::Phone => QualityTier::Medium,
    };

    let memory_pressure = signals
        .heap_used_ratio
        .is_some_and(|ratio| ratio > config.memory_pressure_ratio);
    let constrained = signals.save_data || signals.network.is_slow() || memory_pressure;

    if constrained { base.downgraded() } else { base }
}

struct ControllerState {
    signals: DeviceSignals,
    profile: QualityProfile,
}

/// Holds the current tier and broadcasts changes.
pub struct QualityController {
    config: QualityConfig,
    state: RefCell<ControllerState>,
    dispatcher: Dispatcher<QualityProfile>,
}

impl std::fmt::Debug for QualityController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityController")
            .field("profile", &self.state.borrow().profile)
            .finish()
    }
}

impl QualityController {
    pub fn new(signals: DeviceSignals) -> Self {
        Self::from_config(QualityConfig::default(), signals)
    }

    pub fn from_config(config: QualityConfig, signals: DeviceSignals) -> Self {
        let profile = Self::resolve(&config, &signals);
        tracing::debug!(tier = ?profile.tier, "initial quality tier");
        Self {
            config,
            state: RefCell::new(ControllerState { signals, profile }),
            dispatcher: Dispatcher::new(),
        }
    }

    fn resolve(config: &QualityConfig, signals: &DeviceSignals) -> QualityProfile {
        let tier = classify(signals, config);
        let tier_config = match tier {
            QualityTier::Low => &config.low,
            QualityTier::Medium => &config.medium,
            QualityTier::High => &config.high,
        };
        QualityProfile::from_tier(tier, tier_config, signals.reduced_motion)
    }

    pub fn tier(&self) -> QualityTier {
        self.state.borrow().profile.tier
    }

    pub fn profile(&self) -> QualityProfile {
        self.state.borrow().profile
    }

    pub fn signals(&self) -> DeviceSignals {
        self.state.borrow().signals
    }

    /// Recompute from new signals. Subscribers hear about it only when the
    /// resulting profile differs. Returns whether it did.
    pub fn update(&self, signals: DeviceSignals) -> bool {
        let profile = Self::resolve(&self.config, &signals);
        let previous = {
            let mut state = self.state.borrow_mut();
            state.signals = signals;
            std::mem::replace(&mut state.profile, profile)
        };
        if previous == profile {
            return false;
        }
        if previous.tier != profile.tier {
            tracing::info!(from = ?previous.tier, to = ?profile.tier, "quality tier changed");
        } else {
            tracing::debug!(tier = ?profile.tier, duration_multiplier = profile.duration_multiplier, "quality profile changed");
        }
        self.dispatcher.emit(&profile);
        true
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&QualityProfile) + 'static,
    {
        self.dispatcher.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn signals(device_class: DeviceClass, pixel_ratio: f32) -> DeviceSignals {
        DeviceSignals {
            device_class,
            pixel_ratio,
            ..DeviceSignals::default()
        }
    }

    #[test]
    fn test_base_tiers() {
        let config = QualityConfig::default();
        assert_eq!(classify(&signals(DeviceClass::Desktop, 1.0), &config), QualityTier::High);
        assert_eq!(classify(&signals(DeviceClass::Desktop, 3.0), &config), QualityTier::Medium);
        assert_eq!(classify(&signals(DeviceClass::Tablet, 2.0), &config), QualityTier::Medium);
        assert_eq!(classify(&signals(DeviceClass::Phone, 2.0), &config), QualityTier::Medium);
        assert_eq!(classify(&signals(DeviceClass::Phone, 3.0), &config), QualityTier::Low);
    }

    #[test]
    fn test_constraints_downgrade_one_step() {
        let config = QualityConfig::default();
        let all_bad = DeviceSignals {
            save_data: true,
            network: EffectiveType::Slow2g,
            heap_used_ratio: Some(0.95),
            ..DeviceSignals::default()
        };
        assert_eq!(classify(&all_bad, &config), QualityTier::Medium);

        let at_limit = DeviceSignals {
            heap_used_ratio: Some(0.8),
            ..DeviceSignals::default()
        };
        assert_eq!(classify(&at_limit, &config), QualityTier::High);

        let three_g = DeviceSignals {
            network: EffectiveType::ThreeG,
            ..DeviceSignals::default()
        };
        assert_eq!(classify(&three_g, &config), QualityTier::High);
    }

    #[test]
    fn test_device_class_from_width() {
        assert_eq!(DeviceClass::from_width(375.0), DeviceClass::Phone);
        assert_eq!(DeviceClass::from_width(768.0), DeviceClass::Tablet);
        assert_eq!(DeviceClass::from_width(1440.0), DeviceClass::Desktop);
    }

    #[test]
    fn test_reduced_motion_zeroes_durations() {
        let controller = QualityController::new(DeviceSignals {
            reduced_motion: true,
            ..DeviceSignals::default()
        });
        assert_eq!(controller.tier(), QualityTier::High);
        assert_eq!(controller.profile().duration_multiplier, 0.0);
        assert_eq!(controller.profile().particle_count, TierProfileConfig::HIGH.particle_count);
    }

    #[test]
    fn test_broadcasts_only_on_profile_change() {
        let controller = QualityController::new(DeviceSignals::default());
        let changes = Rc::new(Cell::new(0));
        let c = changes.clone();
        let _sub = controller.subscribe(move |profile| {
            assert_eq!(profile.tier, QualityTier::Medium);
            c.set(c.get() + 1);
        });

        // Same tier, different signals.
        assert!(!controller.update(DeviceSignals {
            pixel_ratio: 2.0,
            ..DeviceSignals::default()
        }));
        assert!(controller.update(DeviceSignals {
            save_data: true,
            ..DeviceSignals::default()
        }));
        assert!(!controller.update(DeviceSignals {
            save_data: true,
            network: EffectiveType::TwoG,
            ..DeviceSignals::default()
        }));
        assert_eq!(changes.get(), 1);
        assert!(controller.signals().save_data);
    }

    #[test]
    fn test_reduced_motion_toggle_is_broadcast() {
        let controller = QualityController::new(DeviceSignals::default());
        let multipliers = Rc::new(RefCell::new(Vec::new()));
        let m = multipliers.clone();
        let _sub = controller.subscribe(move |profile| m.borrow_mut().push(profile.duration_multiplier));

        let reduced = DeviceSignals {
            reduced_motion: true,
            ..DeviceSignals::default()
        };
        assert!(controller.update(reduced));
        assert!(!controller.update(reduced));
        assert!(controller.update(DeviceSignals::default()));

        assert_eq!(controller.tier(), QualityTier::High);
        assert_eq!(
            *multipliers.borrow(),
            vec![0.0, TierProfileConfig::HIGH.duration_multiplier]
        );
    }
}
