//! `snaperz`: simulates a Snaperz extender until it retracts or loops.
//!
//! Settings come from an optional TOML file and are overridden by flags.
//! Status lines are logged through `tracing` (filter with `RUST_LOG`); the
//! final result is printed to stdout.
//!
//! **Usage:**
//! ```
//! snaperz --length <L> --period <P> [--engine scalar|windowed] [--backend auto|portable|avx2]
//!         [--width u8|u16|u32] [--loop-check off|fast|slow] [--status-interval <N>]
//!         [--pulse-limit <N>] [--config <file.toml>]
//! ```
//!
//! **Config file:**
//! ```toml
//! [extender]
//! length = 65
//! period = 12
//!
//! [engine]
//! kind = "windowed"
//! backend = "auto"
//!
//! [run]
//! loop_check = "fast"
//! status_interval = 100000000
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use snaperz::{
    run_engine, Backend, EngineKind, EngineOptions, ExtenderConfig, LoopDetection, RunOptions,
    SegmentWidth, DEFAULT_STATUS_INTERVAL,
};
use tracing_subscriber::EnvFilter;

/// Simulate a Snaperz extender.
#[derive(Parser, Debug, Default)]
#[command(
    name = "snaperz",
    about = "Simulate a Snaperz extender until it retracts or enters a loop"
)]
struct Args {
    /// Extender length L (number of pistons).
    #[arg(long)]
    length: Option<u32>,

    /// Clock period P.
    #[arg(long)]
    period: Option<u32>,

    /// Simulation engine.
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,

    /// Lane backend for the windowed engine.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Segment width for the windowed engine (default: narrowest fit).
    #[arg(long, value_enum)]
    width: Option<WidthArg>,

    /// Loop detection mode.
    #[arg(long, value_enum)]
    loop_check: Option<LoopCheck>,

    /// Pulses between status lines (0 disables them).
    #[arg(long)]
    status_interval: Option<u64>,

    /// Give up after this many pulses.
    #[arg(long)]
    pulse_limit: Option<u64>,

    /// TOML file with `[extender]`, `[engine]` and `[run]` sections.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineArg {
    Scalar,
    Windowed,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Scalar => Self::Scalar,
            EngineArg::Windowed => Self::Windowed,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Portable,
    Avx2,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Self::Auto,
            BackendArg::Portable => Self::Portable,
            BackendArg::Avx2 => Self::Avx2,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WidthArg {
    U8,
    U16,
    U32,
}

impl From<WidthArg> for SegmentWidth {
    fn from(arg: WidthArg) -> Self {
        match arg {
            WidthArg::U8 => Self::U8,
            WidthArg::U16 => Self::U16,
            WidthArg::U32 => Self::U32,
        }
    }
}

/// Loop detection setting, including "off".
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LoopCheck {
    Off,
    Fast,
    Slow,
}

impl LoopCheck {
    fn mode(self) -> Option<LoopDetection> {
        match self {
            Self::Off => None,
            Self::Fast => Some(LoopDetection::Fast),
            Self::Slow => Some(LoopDetection::Slow),
        }
    }
}

/// Contents of a `--config` file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    extender: ExtenderSection,
    engine: EngineSection,
    run: RunSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ExtenderSection {
    length: Option<u32>,
    period: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EngineSection {
    kind: Option<EngineKind>,
    backend: Option<Backend>,
    width: Option<SegmentWidth>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RunSection {
    loop_check: Option<LoopCheck>,
    status_interval: Option<u64>,
    pulse_limit: Option<u64>,
}

fn load_config(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

/// Fully resolved settings for one run.
#[derive(Debug, PartialEq, Eq)]
struct Settings {
    config: ExtenderConfig,
    engine: EngineOptions,
    run: RunOptions,
}

/// Merge flags over file values over defaults.
fn resolve(args: &Args, file: FileConfig) -> Result<Settings> {
    let length = args
        .length
        .or(file.extender.length)
        .context("missing extender length: pass --length or set [extender] length")?;
    let period = args
        .period
        .or(file.extender.period)
        .context("missing clock period: pass --period or set [extender] period")?;
    let config = ExtenderConfig::new(length, period).context("invalid extender configuration")?;

    let engine = EngineOptions {
        kind: args
            .engine
            .map(EngineKind::from)
            .or(file.engine.kind)
            .unwrap_or_default(),
        backend: args
            .backend
            .map(Backend::from)
            .or(file.engine.backend)
            .unwrap_or_default(),
        width: args.width.map(SegmentWidth::from).or(file.engine.width),
    };

    let loop_check = args
        .loop_check
        .or(file.run.loop_check)
        .unwrap_or(LoopCheck::Fast);
    let status_interval = args
        .status_interval
        .or(file.run.status_interval)
        .unwrap_or(DEFAULT_STATUS_INTERVAL);
    let run = RunOptions {
        loop_check: loop_check.mode(),
        status_interval: (status_interval > 0).then_some(status_interval),
        pulse_limit: args.pulse_limit.or(file.run.pulse_limit),
    };

    Ok(Settings {
        config,
        engine,
        run,
    })
}

/// Start-up line naming the extender being run.
fn banner(config: &ExtenderConfig) -> String {
    format!(
        "Running {} extender, {} tick period.",
        config.length(),
        config.period()
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let settings = resolve(&args, file)?;

    println!("{}", banner(&settings.config));
    let report = run_engine(settings.config, &settings.engine, &settings.run)
        .context("failed to build the simulation engine")?;
    println!("{report}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn file(text: &str) -> FileConfig {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_file_values_used() {
        let settings = resolve(
            &Args::default(),
            file(
                r#"
                [extender]
                length = 65
                period = 24

                [engine]
                kind = "scalar"
                width = "u16"

                [run]
                loop_check = "off"
                status_interval = 0
                pulse_limit = 1000
                "#,
            ),
        )
        .unwrap();
        assert_eq!(settings.config, ExtenderConfig::new(65, 24).unwrap());
        assert_eq!(settings.engine.kind, EngineKind::Scalar);
        assert_eq!(settings.engine.backend, Backend::Auto);
        assert_eq!(settings.engine.width, Some(SegmentWidth::U16));
        assert_eq!(settings.run.loop_check, None);
        assert_eq!(settings.run.status_interval, None);
        assert_eq!(settings.run.pulse_limit, Some(1000));
    }

    #[test]
    fn test_flags_override_file() {
        let args = Args::parse_from([
            "snaperz",
            "--period",
            "40",
            "--loop-check",
            "slow",
            "--backend",
            "portable",
        ]);
        let settings = resolve(
            &args,
            file("[extender]\nlength = 20\nperiod = 12\n[run]\nloop_check = \"fast\"\n"),
        )
        .unwrap();
        assert_eq!(settings.config.period(), 40);
        assert_eq!(settings.config.length(), 20);
        assert_eq!(settings.run.loop_check, Some(LoopDetection::Slow));
        assert_eq!(settings.engine.backend, Backend::Portable);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["snaperz", "--length", "65", "--period", "12"]);
        let settings = resolve(&args, FileConfig::default()).unwrap();
        assert_eq!(settings.engine, EngineOptions::default());
        assert_eq!(settings.run, RunOptions::default());
    }

    #[test]
    fn test_missing_length_is_error() {
        let args = Args::parse_from(["snaperz", "--period", "12"]);
        let err = resolve(&args, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("missing extender length"));
    }

    #[test]
    fn test_invalid_period_is_error() {
        let args = Args::parse_from(["snaperz", "--length", "5", "--period", "4"]);
        let err = resolve(&args, FileConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("period 4 is too short"));
    }

    #[test]
    fn test_banner() {
        let config = ExtenderConfig::new(65, 12).unwrap();
        assert_eq!(banner(&config), "Running 65 extender, 12 tick period.");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<FileConfig>("[run]\nloop = \"fast\"\n").is_err());
    }
}
