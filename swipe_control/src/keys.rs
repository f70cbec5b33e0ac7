//! Arrow-key injection.
//!
//! Admitted gestures are tapped (press, then release) on a [`KeySink`].
//! The real sink goes through `enigo`; the null sink is for dry runs.

use enigo::{Enigo, Key, KeyboardControllable};
use swipe_gesture::Gesture;
use tracing::debug;

// ════════════════════════════════════════════════════════════════════════════
// ArrowKey
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrowKey { Up, Down, Left, Right }

impl From<Gesture> for ArrowKey {
    fn from(g: Gesture) -> Self {
        match g {
            Gesture::Up    => ArrowKey::Up,
            Gesture::Down  => ArrowKey::Down,
            Gesture::Left  => ArrowKey::Left,
            Gesture::Right => ArrowKey::Right,
        }
    }
}

impl ArrowKey {
    fn enigo_key(self) -> Key {
        match self {
            ArrowKey::Up    => Key::UpArrow,
            ArrowKey::Down  => Key::DownArrow,
            ArrowKey::Left  => Key::LeftArrow,
            ArrowKey::Right => Key::RightArrow,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// KeySink — abstraction over enigo / null (for dry runs and testing)
// ════════════════════════════════════════════════════════════════════════════

pub trait KeySink {
    fn press(&mut self, key: ArrowKey);
    fn release(&mut self, key: ArrowKey);

    /// Press then release.
    fn tap(&mut self, key: ArrowKey) {
        self.press(key);
        self.release(key);
    }
}

// ── enigo backend ─────────────────────────────────────────────────────────

pub struct EnigoKeys {
    enigo: Enigo,
}

impl EnigoKeys {
    pub fn new() -> Self {
        EnigoKeys { enigo: Enigo::new() }
    }
}

impl Default for EnigoKeys {
    fn default() -> Self { Self::new() }
}

impl KeySink for EnigoKeys {
    fn press(&mut self, key: ArrowKey)   { self.enigo.key_down(key.enigo_key()); }
    fn release(&mut self, key: ArrowKey) { self.enigo.key_up(key.enigo_key()); }
}

// ── null backend ──────────────────────────────────────────────────────────

pub struct NullKeys;

impl KeySink for NullKeys {
    fn press(&mut self, key: ArrowKey)   { debug!(?key, "dry run: press"); }
    fn release(&mut self, key: ArrowKey) { debug!(?key, "dry run: release"); }
}

// ════════════════════════════════════════════════════════════════════════════
// open_key_sink
// ════════════════════════════════════════════════════════════════════════════

/// The OS sink, or the null sink when `dry_run` is set.
pub fn open_key_sink(dry_run: bool) -> Box<dyn KeySink> {
    if dry_run {
        Box::new(NullKeys)
    } else {
        Box::new(EnigoKeys::new())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
