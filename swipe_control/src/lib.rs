//! # swipe_control
//!
//! Hands-free arrow keys for runner-style games: swipe the index finger and
//! the matching arrow key is pressed and released.
//!
//! ## Gesture → Key mapping
//!
//! | Fingertip motion between two frames | Key |
//! |---|---|
//! | up by more than 10% of the frame | ↑ |
//! | down by more than 10% of the frame | ↓ |
//! | left (as seen in a mirror) by more than 10% | ← |
//! | right (as seen in a mirror) by more than 10% | → |
//!
//! The same direction is repeated at most every 0.5 s; a change of direction
//! goes through at once.  See [`swipe_gesture`] for the exact rules.
//!
//! ## Fingertip sources
//!
//! * (default) **Mouse**: a window where the cursor, while the left button is
//!   held, plays the fingertip.  The window also shows the trail and the last
//!   gesture.  `Q` quits.
//! * **Replay**: a landmark trace from a file or stdin, one
//!   `<seconds> <x> <y> [confidence]` line per frame; pipe a webcam hand
//!   tracker's index fingertip here.
//! * **Hardware mode** (`leap` feature): polls a real LeapMotion controller
//!   via LeapC.

pub mod source;
pub mod keys;
pub mod overlay;
pub mod app;
