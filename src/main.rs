//! Expression input: turn facial expressions from a landmark stream into
//! keyboard actions.

use anyhow::{Context, Result};
use clap::Parser;
use expression_keys::{
    action::{InputInjector, LogInjector},
    app::{AppOptions, ExpressionApp},
    config::{Config, ConfigStore, EXAMPLE_CONFIG},
    keyboard_control::X11Injector,
    landmark_source::ReplaySource,
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Landmark recording to process (JSON lines, one frame per line)
    #[arg(short, long, required_unless_present = "print_example_config")]
    landmarks: Option<PathBuf>,

    /// Path to configuration file (YAML or JSON)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Calibrate thresholds on the first frames
    #[arg(long)]
    calibrate: bool,

    /// Log actions instead of injecting key presses
    #[arg(long)]
    dry_run: bool,

    /// Override the number of frames an expression must be held
    #[arg(long)]
    hold_frames: Option<u32>,

    /// Pace frames at the configured tick interval
    #[arg(long)]
    realtime: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_example_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_example_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Expression Input");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::load_or_default(path)
        }
        None => Config::default(),
    };
    if let Some(hold_frames) = args.hold_frames {
        config.settings.hold_frames = hold_frames;
    }
    config.validate().context("Invalid configuration")?;
    let store = ConfigStore::new(args.config.clone(), config);

    let landmarks = args
        .landmarks
        .context("--landmarks is required")?;
    let source = ReplaySource::open(&landmarks)
        .with_context(|| format!("Failed to open {}", landmarks.display()))?;

    let injector: Box<dyn InputInjector> = if args.dry_run {
        Box::new(LogInjector::new())
    } else {
        match X11Injector::new() {
            Ok(injector) => {
                info!("X11 keyboard injection initialized");
                Box::new(injector)
            }
            Err(e) => {
                warn!("Failed to initialize keyboard injection: {e}. Falling back to dry run");
                Box::new(LogInjector::new())
            }
        }
    };

    let options = AppOptions {
        calibrate: args.calibrate,
        realtime: args.realtime,
    };
    let mut app = ExpressionApp::new(store, source, injector, options);
    let summary = app.run()?;

    info!(
        "Done: {} frames ({} without face), {} actions fired, {} failed",
        summary.frames,
        summary.frames_without_face,
        summary.total_fired(),
        summary.failed_actions
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_landmarks_required_unless_printing_config() {
        assert!(Args::try_parse_from(["expression-keys"]).is_err());

        let args = Args::try_parse_from(["expression-keys", "--print-example-config"]).unwrap();
        assert!(args.landmarks.is_none());

        let args = Args::try_parse_from([
            "expression-keys",
            "-l",
            "recording.jsonl",
            "--hold-frames",
            "3",
            "--dry-run",
            "--calibrate",
        ])
        .unwrap();
        assert_eq!(args.landmarks, Some(PathBuf::from("recording.jsonl")));
        assert_eq!(args.hold_frames, Some(3));
        assert!(args.dry_run && args.calibrate && !args.realtime);
    }
}
