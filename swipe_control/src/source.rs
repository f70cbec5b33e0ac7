//! Fingertip sources: recorded/piped landmark traces, LeapMotion hardware,
//! and (in [`crate::overlay`]) the mouse.
//!
//! The driver loop pulls one [`Frame`] at a time and doesn't care where the
//! fingertip came from.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use swipe_gesture::{FingertipSample, Gesture};
use tracing::debug;

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

/// One processed frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// Time since the start of the run.
    pub at:  Duration,
    /// Index fingertip, or `None` when no hand was tracked this frame.
    pub tip: Option<FingertipSample>,
}

// ════════════════════════════════════════════════════════════════════════════
// FingertipSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`Frame`]s to the driver loop.
pub trait FingertipSource {
    /// Block until the next frame is available.
    ///
    /// `Ok(None)` means the source is exhausted or the user asked to stop.
    /// An error means capture failed and the loop should end.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Called once per frame after the gate has run.  Sources with a window
    /// draw their overlay here.
    fn show(&mut self, _frame: &Frame, _fired: Option<Gesture>) {}
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource — recorded or piped landmark trace
// ════════════════════════════════════════════════════════════════════════════

/// Minimum detector confidence accepted by default.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.8;

/// Reads a fingertip trace, one frame per line:
///
/// ```text
/// # seconds  x     y     [confidence]
/// 0.000      0.50  0.50  0.97
/// 0.033      0.50  0.30
/// 0.066      -
/// ```
///
/// `-` in place of the coordinates is a frame with no hand.  Any external
/// landmark detector that can print the index fingertip can drive the
/// controller this way by piping into stdin.
pub struct ReplaySource<R> {
    reader:         R,
    line:           String,
    line_no:        usize,
    last_at:        Duration,
    mirror:         bool,
    min_confidence: f32,
}

impl ReplaySource<Box<dyn BufRead>> {
    /// Open a trace file, or stdin when `path` is `-`.
    pub fn open(path: &str) -> Result<Self> {
        let reader: Box<dyn BufRead> = if path == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(path)
                .with_context(|| format!("cannot open replay trace {path}"))?;
            Box::new(BufReader::new(file))
        };
        Ok(ReplaySource::new(reader))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        ReplaySource {
            reader,
            line:           String::new(),
            line_no:        0,
            last_at:        Duration::ZERO,
            mirror:         false,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    /// Flip x on every sample (for traces taken from an unmirrored camera).
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Parse one line.  `Ok(None)` for blank lines and comments.
    fn parse_line(&self, text: &str) -> Result<Option<Frame>> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(None);
        }

        let fields: Vec<&str> = text.split_whitespace().collect();
        let secs: f64 = fields[0].parse()
            .with_context(|| format!("bad timestamp {:?}", fields[0]))?;
        let at = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("timestamp {secs} is not a usable number of seconds"))?;
        if at < self.last_at {
            bail!("timestamp {secs} goes backwards");
        }

        let tip = match &fields[1..] {
            ["-"] => None,
            [x, y] => Some(self.sample(x, y)?),
            [x, y, conf] => {
                let conf = parse_coord(conf, "confidence")?;
                if conf < self.min_confidence {
                    debug!(line = self.line_no, conf, "low-confidence detection dropped");
                    None
                } else {
                    Some(self.sample(x, y)?)
                }
            }
            _ => bail!("expected `<seconds> <x> <y> [confidence]` or `<seconds> -`"),
        };

        Ok(Some(Frame { at, tip }))
    }

    fn sample(&self, x: &str, y: &str) -> Result<FingertipSample> {
        let tip = FingertipSample::new(parse_coord(x, "x")?, parse_coord(y, "y")?).clamped();
        Ok(if self.mirror { tip.mirrored() } else { tip })
    }
}

fn parse_coord(field: &str, what: &str) -> Result<f32> {
    let v: f32 = field.parse().with_context(|| format!("bad {what} {field:?}"))?;
    if !v.is_finite() {
        bail!("{what} {field:?} is not finite");
    }
    Ok(v)
}

impl<R: BufRead> FingertipSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            self.line.clear();
            let n = self.reader.read_line(&mut self.line)
                .context("reading replay trace")?;
            if n == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let parsed = self.parse_line(&self.line)
                .with_context(|| format!("replay trace line {}", self.line_no))?;
            if let Some(frame) = parsed {
                self.last_at = frame.at;
                return Ok(Some(frame));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PollFailures — give up on a device that keeps failing
// ════════════════════════════════════════════════════════════════════════════

/// Consecutive device poll failures tolerated before capture counts as lost.
pub const MAX_POLL_FAILURES: u32 = 50;

/// Counts back-to-back poll failures; any success resets the run.
#[cfg_attr(not(feature = "leap"), allow(dead_code))]
#[derive(Debug, Default)]
struct PollFailures {
    run: u32,
}

#[cfg_attr(not(feature = "leap"), allow(dead_code))]
impl PollFailures {
    fn success(&mut self) { self.run = 0; }

    /// Record a failure; errors once the limit is reached.
    fn failure(&mut self, cause: impl std::fmt::Debug) -> Result<()> {
        self.run += 1;
        if self.run >= MAX_POLL_FAILURES {
            bail!("device poll failed {} times in a row, last error: {cause:?}", self.run);
        }
        debug!(run = self.run, ?cause, "device poll failed");
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Fingertip source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// The first tracked hand's index fingertip is mapped from the device's
/// interaction volume (millimetres above the sensor) into the unit square,
/// with y flipped so that it grows downward like image coordinates.
#[cfg(feature = "leap")]
pub struct LeapSource {
    connection: leaprs::Connection,
    started:    std::time::Instant,
    failures:   PollFailures,
}

#[cfg(feature = "leap")]
impl LeapSource {
    // Interaction volume (empirically tuned)
    const X_HALF_SPAN: f32 = 200.0;  // mm either side of the sensor
    const Y_MIN:       f32 = 100.0;  // mm above the sensor
    const Y_SPAN:      f32 = 300.0;

    pub fn open() -> Result<Self> {
        use leaprs::*;

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| anyhow::anyhow!("failed to create LeapC connection: {e:?}"))?;
        connection.open()
            .map_err(|e| anyhow::anyhow!("failed to open LeapMotion device: {e:?}"))?;

        Ok(LeapSource {
            connection,
            started:  std::time::Instant::now(),
            failures: PollFailures::default(),
        })
    }

    fn normalize(x_mm: f32, y_mm: f32) -> FingertipSample {
        FingertipSample::new(
            (x_mm + Self::X_HALF_SPAN) / (2.0 * Self::X_HALF_SPAN),
            1.0 - (y_mm - Self::Y_MIN) / Self::Y_SPAN,
        )
        .clamped()
    }
}

#[cfg(feature = "leap")]
impl FingertipSource for LeapSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use leaprs::*;

        loop {
            let msg = match self.connection.poll(100) {
                Ok(m)  => { self.failures.success(); m }
                Err(e) => {
                    self.failures.failure(e)
                        .context("LeapMotion capture lost")?;
                    continue;
                }
            };

            if let Event::Tracking(frame) = msg.event() {
                let at  = self.started.elapsed();
                let tip = frame.hands().next().and_then(|hand| {
                    let fingers: Vec<_> = hand.digits().collect();
                    let index = fingers.get(1)?;
                    let p = index.distal().next_joint();
                    Some(Self::normalize(p.x, p.y))
                });
                return Ok(Some(Frame { at, tip }));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn replay(text: &str) -> ReplaySource<Cursor<String>> {
        ReplaySource::new(Cursor::new(text.to_string()))
    }

    fn drain<S: FingertipSource>(src: &mut S) -> Vec<Frame> {
        let mut out = Vec::new();
        while let Some(f) = src.next_frame().unwrap() { out.push(f); }
        out
    }

    #[test]
    fn reads_samples_and_gaps() {
        let mut src = replay("0.0 0.5 0.5\n0.5 -\n1.0 0.25 0.75 0.9\n");
        let frames = drain(&mut src);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].tip, Some(FingertipSample::new(0.5, 0.5)));
        assert_eq!(frames[1].tip, None);
        assert_eq!(frames[1].at, Duration::from_millis(500));
        assert_eq!(frames[2].tip, Some(FingertipSample::new(0.25, 0.75)));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let mut src = replay("# header\n\n   \n0.0 0.5 0.5\n# trailing\n");
        assert_eq!(drain(&mut src).len(), 1);
    }

    #[test]
    fn low_confidence_is_no_hand() {
        let mut src = replay("0.0 0.5 0.5 0.79\n0.1 0.5 0.5 0.8\n");
        let frames = drain(&mut src);
        assert_eq!(frames[0].tip, None);
        assert!(frames[1].tip.is_some());
    }

    #[test]
    fn custom_min_confidence() {
        let mut src = replay("0.0 0.5 0.5 0.4\n").min_confidence(0.3);
        assert!(drain(&mut src)[0].tip.is_some());
    }

    #[test]
    fn mirror_flips_x() {
        let mut src = replay("0.0 0.25 0.5\n").mirror(true);
        assert_eq!(drain(&mut src)[0].tip, Some(FingertipSample::new(0.75, 0.5)));
    }

    #[test]
    fn edge_overshoot_is_clamped() {
        let mut src = replay("0.0 -0.02 1.01\n");
        assert_eq!(drain(&mut src)[0].tip, Some(FingertipSample::new(0.0, 1.0)));
    }

    #[test]
    fn backwards_timestamp_is_an_error() {
        let mut src = replay("1.0 0.5 0.5\n0.5 0.5 0.5\n");
        assert!(src.next_frame().unwrap().is_some());
        let err = src.next_frame().unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");
    }

    #[test]
    fn malformed_lines_are_errors() {
        for bad in ["abc 0.5 0.5", "0.0 0.5", "0.0 x 0.5", "0.0 0.5 0.5 0.9 7", "-1 0.5 0.5", "0.0 NaN 0.5",
                    "1e20 0.5 0.5", "inf 0.5 0.5"] {
            let mut src = replay(bad);
            assert!(src.next_frame().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn poll_failures_give_up_after_limit() {
        let mut f = PollFailures::default();
        for _ in 1..MAX_POLL_FAILURES {
            assert!(f.failure("timeout").is_ok());
        }
        let err = f.failure("device lost").unwrap_err();
        assert!(err.to_string().contains("device lost"), "{err}");
    }

    #[test]
    fn poll_success_resets_failure_run() {
        let mut f = PollFailures::default();
        for _ in 0..(MAX_POLL_FAILURES * 3) {
            assert!(f.failure("timeout").is_ok());
            if f.run == MAX_POLL_FAILURES - 1 { f.success(); }
        }
    }

    #[test]
    fn empty_trace_is_exhausted() {
        let mut src = replay("");
        assert!(src.next_frame().unwrap().is_none());
    }
}
