//! swipe_control command-line entry point.

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use swipe_gesture::{SwipeConfig, GESTURE_COOLDOWN, SWIPE_THRESHOLD};
use tracing::info;

use swipe_control::app::run;
use swipe_control::keys::open_key_sink;
use swipe_control::overlay::Overlay;
use swipe_control::source::{FingertipSource, ReplaySource, DEFAULT_MIN_CONFIDENCE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Mouse in the overlay window stands in for the fingertip
    Mouse,
    /// Landmark trace from --replay
    Replay,
    /// LeapMotion controller (requires the `leap` feature)
    Leap,
}

#[derive(Parser, Debug)]
#[command(name = "swipe_control", version, about = "Swipe your index finger, press the arrow keys")]
struct Cli {
    /// Where fingertip positions come from
    #[arg(long, value_enum, default_value_t = SourceKind::Mouse)]
    source: SourceKind,

    /// Trace file for the replay source (`-` reads stdin)
    #[arg(long, default_value = "-")]
    replay: String,

    /// Flip replayed x coordinates (trace recorded from an unmirrored camera)
    #[arg(long)]
    mirror: bool,

    /// Replayed detections below this confidence count as "no hand"
    #[arg(long, default_value_t = DEFAULT_MIN_CONFIDENCE)]
    min_confidence: f32,

    /// Minimum fingertip travel per frame, as a fraction of the frame
    #[arg(long, default_value_t = SWIPE_THRESHOLD)]
    threshold: f32,

    /// Minimum time between two identical gestures, in milliseconds
    #[arg(long, default_value_t = GESTURE_COOLDOWN.as_millis() as u64)]
    cooldown_ms: u64,

    /// Log gestures without pressing any keys
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Range-check the numeric flags and build the recognizer settings.
    fn swipe_config(&self) -> Result<SwipeConfig> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            bail!("--threshold must be between 0 and 1, got {}", self.threshold);
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            bail!("--min-confidence must be between 0 and 1, got {}", self.min_confidence);
        }
        Ok(SwipeConfig {
            threshold: self.threshold,
            cooldown:  Duration::from_millis(self.cooldown_ms),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swipe_control=info".into()),
        )
        .init();

    let config = cli.swipe_config()?;

    info!("swipe_control v{} starting", env!("CARGO_PKG_VERSION"));
    info!(source = ?cli.source, threshold = config.threshold, cooldown = ?config.cooldown,
          dry_run = cli.dry_run, "configuration");

    let mut source = open_source(&cli, config)?;
    let mut keys   = open_key_sink(cli.dry_run);

    run(source.as_mut(), keys.as_mut(), config)?;
    Ok(())
}

fn open_source(cli: &Cli, config: SwipeConfig) -> Result<Box<dyn FingertipSource>> {
    Ok(match cli.source {
        SourceKind::Mouse => Box::new(Overlay::new(config.threshold)?),
        SourceKind::Replay => Box::new(
            ReplaySource::open(&cli.replay)?
                .mirror(cli.mirror)
                .min_confidence(cli.min_confidence),
        ),
        SourceKind::Leap => open_leap()?,
    })
}

#[cfg(feature = "leap")]
fn open_leap() -> Result<Box<dyn FingertipSource>> {
    Ok(Box::new(swipe_control::source::LeapSource::open()?))
}

#[cfg(not(feature = "leap"))]
fn open_leap() -> Result<Box<dyn FingertipSource>> {
    bail!("this build has no LeapMotion support; rebuild with `--features leap`")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("swipe_control").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_give_default_config() {
        assert_eq!(cli(&[]).swipe_config().unwrap(), SwipeConfig::default());
    }

    #[test]
    fn flags_flow_into_config() {
        let c = cli(&["--threshold", "0.2", "--cooldown-ms", "250"]).swipe_config().unwrap();
        assert_eq!(c.threshold, 0.2);
        assert_eq!(c.cooldown, Duration::from_millis(250));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        assert!(cli(&["--threshold", "0"]).swipe_config().is_err());
        assert!(cli(&["--threshold", "1.5"]).swipe_config().is_err());
    }

    #[test]
    fn out_of_range_min_confidence_is_rejected() {
        assert!(cli(&["--min-confidence", "5"]).swipe_config().is_err());
        assert!(cli(&["--min-confidence=-0.1"]).swipe_config().is_err());
        assert!(cli(&["--min-confidence", "1"]).swipe_config().is_ok());
        assert!(cli(&["--min-confidence", "0"]).swipe_config().is_ok());
    }
}
