//! The driver loop.
//!
//! `Controller` is the only state carried between frames: the gate and the
//! previous fingertip.  `run` pulls frames from a source, steps the
//! controller, and taps admitted gestures on the key sink.

use anyhow::Result;
use swipe_gesture::{FingertipSample, GateState, Gesture, SwipeConfig};
use tracing::{debug, info};

use crate::keys::{ArrowKey, KeySink};
use crate::source::{FingertipSource, Frame};

// ════════════════════════════════════════════════════════════════════════════
// Controller
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct Controller {
    pub config: SwipeConfig,
    gate:       GateState,
    previous:   Option<FingertipSample>,
}

impl Controller {
    pub fn new(config: SwipeConfig) -> Self {
        Controller { config, ..Controller::default() }
    }

    /// Process one frame; returns the gesture to forward, if any.
    ///
    /// A frame without a hand is skipped entirely: nothing is classified
    /// and the previous sample is kept for when tracking resumes.
    pub fn step(&mut self, frame: &Frame) -> Option<Gesture> {
        let tip = frame.tip?;
        let detected = self.config.classify(self.previous, tip);
        self.previous = Some(tip);

        let admitted = self.config.admit(detected, frame.at, &mut self.gate);
        if admitted.is_none() {
            if let Some(g) = detected {
                debug!(gesture = %g, at = ?frame.at, "repeat suppressed by cooldown");
            }
        }
        admitted
    }

    pub fn gate(&self) -> &GateState { &self.gate }
    pub fn previous(&self) -> Option<FingertipSample> { self.previous }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main loop
// ════════════════════════════════════════════════════════════════════════════

/// Counters reported when the loop ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames:  usize,
    /// Frames that carried a fingertip.
    pub samples: usize,
    /// Gestures admitted and sent as key taps.
    pub fired:   usize,
}

/// Drive `source` until it is exhausted or asks to stop.
///
/// A source error ends the loop and is returned; the source releases its
/// device or window when it is dropped by the caller.
pub fn run(
    source: &mut dyn FingertipSource,
    keys:   &mut dyn KeySink,
    config: SwipeConfig,
) -> Result<RunStats> {
    let mut controller = Controller::new(config);
    let mut stats = RunStats::default();

    while let Some(frame) = source.next_frame()? {
        stats.frames += 1;
        if frame.tip.is_some() { stats.samples += 1; }

        let fired = controller.step(&frame);
        if let Some(g) = fired {
            stats.fired += 1;
            info!("Gesture detected: {g}");
            keys.tap(ArrowKey::from(g));
        }

        source.show(&frame, fired);
    }

    info!(frames = stats.frames, samples = stats.samples, fired = stats.fired, "source finished");
    Ok(stats)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::time::Duration;
    use crate::source::ReplaySource;

    fn frame(ms: u64, tip: Option<(f32, f32)>) -> Frame {
        Frame {
            at:  Duration::from_millis(ms),
            tip: tip.map(|(x, y)| FingertipSample::new(x, y)),
        }
    }

    /// Scripted source: yields its frames, then either ends or fails.
    struct Script {
        frames: VecDeque<Frame>,
        fail_at_end: bool,
        shown: Vec<Option<Gesture>>,
    }

    impl Script {
        fn new(frames: Vec<Frame>) -> Self {
            Script { frames: frames.into(), fail_at_end: false, shown: Vec::new() }
        }
    }

    impl FingertipSource for Script {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            match self.frames.pop_front() {
                Some(f) => Ok(Some(f)),
                None if self.fail_at_end => anyhow::bail!("camera unplugged"),
                None => Ok(None),
            }
        }
        fn show(&mut self, _frame: &Frame, fired: Option<Gesture>) {
            self.shown.push(fired);
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<(&'static str, ArrowKey)>);

    impl KeySink for Recorder {
        fn press(&mut self, key: ArrowKey)   { self.0.push(("press", key)); }
        fn release(&mut self, key: ArrowKey) { self.0.push(("release", key)); }
    }

    // ── Controller ────────────────────────────────────────────────────────

    #[test]
    fn first_sample_only_primes() {
        let mut c = Controller::default();
        assert_eq!(c.step(&frame(0, Some((0.5, 0.5)))), None);
        assert_eq!(c.previous(), Some(FingertipSample::new(0.5, 0.5)));
    }

    #[test]
    fn swipe_up_then_still() {
        let mut c = Controller::default();
        c.step(&frame(0, Some((0.5, 0.5))));
        assert_eq!(c.step(&frame(0, Some((0.5, 0.3)))), Some(Gesture::Up));
        assert_eq!(c.step(&frame(33, Some((0.5, 0.3)))), None);
    }

    #[test]
    fn no_hand_keeps_previous_sample() {
        let mut c = Controller::default();
        c.step(&frame(0, Some((0.5, 0.5))));
        assert_eq!(c.step(&frame(33, None)), None);
        assert_eq!(c.previous(), Some(FingertipSample::new(0.5, 0.5)));
        // tracking resumes: compared against the sample before the gap
        assert_eq!(c.step(&frame(66, Some((0.8, 0.5)))), Some(Gesture::Right));
    }

    #[test]
    fn no_hand_does_not_touch_gate() {
        let mut c = Controller::default();
        c.step(&frame(0, Some((0.5, 0.5))));
        c.step(&frame(10, Some((0.5, 0.2))));
        let before = *c.gate();
        c.step(&frame(2_000, None));
        assert_eq!(*c.gate(), before);
    }

    #[test]
    fn repeated_direction_is_rate_limited() {
        let mut c = Controller::default();
        let ys = [0.9, 0.75, 0.6, 0.45, 0.3];
        let fired: Vec<_> = ys.iter().enumerate()
            .map(|(i, &y)| c.step(&frame(i as u64 * 100, Some((0.5, y)))))
            .collect();
        assert_eq!(fired, vec![None, Some(Gesture::Up), None, None, None]);
        // 600 ms after the first admission the same swipe fires again
        assert_eq!(c.step(&frame(700, Some((0.5, 0.15)))), Some(Gesture::Up));
    }

    #[test]
    fn direction_change_fires_immediately() {
        let mut c = Controller::default();
        c.step(&frame(0, Some((0.5, 0.5))));
        assert_eq!(c.step(&frame(30, Some((0.5, 0.3)))), Some(Gesture::Up));
        assert_eq!(c.step(&frame(60, Some((0.5, 0.5)))), Some(Gesture::Down));
        assert_eq!(c.step(&frame(90, Some((0.2, 0.5)))), Some(Gesture::Left));
    }

    // ── run ───────────────────────────────────────────────────────────────

    #[test]
    fn run_taps_each_admitted_gesture_once() {
        let mut src = Script::new(vec![
            frame(0,   Some((0.5, 0.5))),
            frame(33,  Some((0.5, 0.3))),   // up
            frame(66,  None),
            frame(100, Some((0.5, 0.15))),  // up again, suppressed
            frame(133, Some((0.8, 0.15))),  // right
        ]);
        let mut keys = Recorder::default();
        let stats = run(&mut src, &mut keys, SwipeConfig::default()).unwrap();

        assert_eq!(stats, RunStats { frames: 5, samples: 4, fired: 2 });
        assert_eq!(keys.0, vec![
            ("press", ArrowKey::Up),    ("release", ArrowKey::Up),
            ("press", ArrowKey::Right), ("release", ArrowKey::Right),
        ]);
        assert_eq!(src.shown, vec![None, Some(Gesture::Up), None, None, Some(Gesture::Right)]);
    }

    #[test]
    fn run_propagates_capture_failure() {
        let mut src = Script::new(vec![frame(0, Some((0.5, 0.5)))]);
        src.fail_at_end = true;
        let mut keys = Recorder::default();
        let err = run(&mut src, &mut keys, SwipeConfig::default()).unwrap_err();
        assert!(err.to_string().contains("camera unplugged"));
        assert!(keys.0.is_empty());
    }

    #[test]
    fn run_on_empty_source() {
        let mut src = Script::new(Vec::new());
        let stats = run(&mut src, &mut Recorder::default(), SwipeConfig::default()).unwrap();
        assert_eq!(stats, RunStats::default());
    }

    #[test]
    fn run_from_replay_trace() {
        let trace = "\
# seconds x y confidence
0.00 0.50 0.50 0.95
0.03 0.50 0.30 0.95
0.06 0.50 0.30 0.95
0.10 -
0.13 0.20 0.30 0.50
0.16 0.20 0.30 0.90
";
        let mut src = ReplaySource::new(Cursor::new(trace));
        let mut keys = Recorder::default();
        let stats = run(&mut src, &mut keys, SwipeConfig::default()).unwrap();

        // the low-confidence jump is ignored, the confident one is a left swipe
        assert_eq!(stats.fired, 2);
        assert_eq!(keys.0[0], ("press", ArrowKey::Up));
        assert_eq!(keys.0[2], ("press", ArrowKey::Left));
    }

    #[test]
    fn custom_thresholds_flow_through() {
        let cfg = SwipeConfig { threshold: 0.05, cooldown: Duration::from_millis(50) };
        let mut src = Script::new(vec![
            frame(0,  Some((0.5, 0.5))),
            frame(10, Some((0.5, 0.43))),
            frame(70, Some((0.5, 0.36))),
        ]);
        let stats = run(&mut src, &mut Recorder::default(), cfg).unwrap();
        assert_eq!(stats.fired, 2);
    }
}
