//! # swipe_gesture
//!
//! Turns two consecutive fingertip positions into a directional swipe, and
//! rate-limits repeated swipes in the same direction.
//!
//! * [`classify`] compares the previous and current [`FingertipSample`]
//!   and names the dominant axis of motion, if it moved far enough.
//! * [`admit`] is a cooldown gate over the classifier output.  A change of
//!   direction always passes; the same direction passes at most once per
//!   cooldown window.
//!
//! Coordinates are normalized to `[0, 1]` on both axes, with `y` growing
//! downward and `x` already mirrored, so "left" is the user's own left as
//! seen in a mirror.
//!
//! No external crates are required.
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use swipe_gesture::{classify, admit, FingertipSample, GateState, Gesture};
//!
//! let mut gate = GateState::default();
//! let before = FingertipSample::new(0.5, 0.5);
//! let after  = FingertipSample::new(0.5, 0.3);
//!
//! let swipe = classify(Some(before), after);
//! assert_eq!(swipe, Some(Gesture::Up));
//! assert_eq!(admit(swipe, Duration::ZERO, &mut gate), Some(Gesture::Up));
//! ```

use std::fmt;
use std::time::Duration;

// ════════════════════════════════════════════════════════════════════════════
// Tunables
// ════════════════════════════════════════════════════════════════════════════

/// Minimum travel along the dominant axis between two frames, in normalized
/// units (10% of the frame).
pub const SWIPE_THRESHOLD: f32 = 0.1;

/// Minimum spacing between two admissions of the *same* gesture.
pub const GESTURE_COOLDOWN: Duration = Duration::from_millis(500);

// ════════════════════════════════════════════════════════════════════════════
// FingertipSample
// ════════════════════════════════════════════════════════════════════════════

/// Normalized position of the tracked fingertip in one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FingertipSample {
    pub x: f32,
    pub y: f32,
}

impl FingertipSample {
    pub fn new(x: f32, y: f32) -> Self {
        FingertipSample { x, y }
    }

    /// Flip horizontally, for detectors that see the raw (unmirrored) frame.
    pub fn mirrored(self) -> Self {
        FingertipSample { x: 1.0 - self.x, y: self.y }
    }

    /// Pull both coordinates into the unit square.  Detectors report points
    /// slightly outside the frame when the fingertip is near an edge.
    pub fn clamped(self) -> Self {
        FingertipSample { x: self.x.clamp(0.0, 1.0), y: self.y.clamp(0.0, 1.0) }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Gesture
// ════════════════════════════════════════════════════════════════════════════

/// A recognised swipe direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gesture {
    Up,
    Down,
    Left,
    Right,
}

impl Gesture {
    pub const ALL: [Gesture; 4] = [Gesture::Up, Gesture::Down, Gesture::Left, Gesture::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Up    => "up",
            Gesture::Down  => "down",
            Gesture::Left  => "left",
            Gesture::Right => "right",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GateState
// ════════════════════════════════════════════════════════════════════════════

/// What the gate remembers between frames.
///
/// `last_fire_time` is the timestamp of the most recently *admitted* gesture,
/// not merely the last one detected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateState {
    pub last_gesture:   Option<Gesture>,
    pub last_fire_time: Duration,
}

// ════════════════════════════════════════════════════════════════════════════
// SwipeConfig
// ════════════════════════════════════════════════════════════════════════════

/// The two thresholds that shape recognition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwipeConfig {
    /// Minimum dominant-axis travel per frame (normalized units).
    pub threshold: f32,
    /// Repeat-suppression window for an unchanged direction.
    pub cooldown:  Duration,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        SwipeConfig {
            threshold: SWIPE_THRESHOLD,
            cooldown:  GESTURE_COOLDOWN,
        }
    }
}

impl SwipeConfig {
    /// Classify the motion from `previous` to `current`.
    ///
    /// Returns `None` without a previous sample, when neither axis travelled
    /// more than `threshold`, or when both axes travelled exactly the same
    /// distance (no diagonals).
    pub fn classify(
        &self,
        previous: Option<FingertipSample>,
        current:  FingertipSample,
    ) -> Option<Gesture> {
        let previous = previous?;
        let dx = current.x - previous.x;
        let dy = current.y - previous.y;

        if dy.abs() > self.threshold && dy.abs() > dx.abs() {
            Some(if dy < 0.0 { Gesture::Up } else { Gesture::Down })
        } else if dx.abs() > self.threshold && dx.abs() > dy.abs() {
            Some(if dx < 0.0 { Gesture::Left } else { Gesture::Right })
        } else {
            None
        }
    }

    /// Pass `gesture` through the cooldown gate at time `now`.
    ///
    /// The state only changes when a gesture is admitted, and
    /// `last_fire_time` never moves backwards.
    pub fn admit(
        &self,
        gesture: Option<Gesture>,
        now:     Duration,
        state:   &mut GateState,
    ) -> Option<Gesture> {
        let gesture = gesture?;
        let changed = state.last_gesture != Some(gesture);
        let expired = now.saturating_sub(state.last_fire_time) > self.cooldown;

        if changed || expired {
            state.last_gesture   = Some(gesture);
            state.last_fire_time = state.last_fire_time.max(now);
            Some(gesture)
        } else {
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Free functions with the default thresholds
// ════════════════════════════════════════════════════════════════════════════

/// [`SwipeConfig::classify`] with [`SWIPE_THRESHOLD`].
pub fn classify(previous: Option<FingertipSample>, current: FingertipSample) -> Option<Gesture> {
    SwipeConfig::default().classify(previous, current)
}

/// [`SwipeConfig::admit`] with [`GESTURE_COOLDOWN`].
pub fn admit(gesture: Option<Gesture>, now: Duration, state: &mut GateState) -> Option<Gesture> {
    SwipeConfig::default().admit(gesture, now, state)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
