//! Error types for the motion engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors a caller can act on.
///
/// Nothing on the per-frame path returns these: bad configuration there is
/// clamped and logged instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// An easing name that is not part of the curve table.
    #[error("unknown easing curve: {0}")]
    UnknownEasing(String),

    /// A keyframe name that is not registered.
    #[error("keyframes not registered: {0}")]
    UnknownKeyframes(String),

    /// A configuration value outside its valid range.
    #[error("invalid {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}
