//! PURE-IT desktop runner: EMG acquisition, CTS screening and rehabilitation

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pureit_core::classification::{Detector, VerdictSummary};
use pureit_core::config::loader::ConfigLoader;
use pureit_core::config::SystemConfig;
use pureit_core::hal::simulation::{
    EmgSimulationConfig, FlexSimulationConfig, SyntheticEmgSource, SyntheticFlexSource,
};
use pureit_core::hal::{open_serial_port, EmgBatchSource, LoggingRelay, OperatorSurface, ReplayEmgSource};
use pureit_core::processing::EmgPipeline;
use pureit_core::rehab::{RehabSession, RehabTick};
use pureit_core::scheduler::{EmgScheduler, TickStatus};
use pureit_core::sink::CsvSink;
use pureit_core::utils::{MockTimeProvider, MonotonicTimeProvider};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pureit-desktop", version, about = "PURE-IT EMG and CTS screening runner")]
struct Cli {
    /// TOML configuration file (defaults to pureit.toml, then config/pureit.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use the synthetic devices instead of real hardware
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Live EMG acquisition with a persisted conditioning artifact
    Emg {
        /// Replay device rows from a CSV file
        #[arg(long)]
        replay: Option<PathBuf>,
        /// Artifact path, overriding the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Record the flex glove and screen for CTS
    Detect {
        /// Serial port, overriding the configuration
        #[arg(long)]
        port: Option<String>,
    },
    /// Drive the stimulation relay for the configured time
    Rehab {
        /// Duration in seconds, overriding the configuration
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Validate a configuration file
    CheckConfig { path: PathBuf },
    /// Write the effective configuration as TOML
    ExportConfig { path: PathBuf },
}

/// Operator surface for a terminal
struct ConsoleSurface;

impl OperatorSurface for ConsoleSurface {
    fn show_status(&mut self, message: &str) {
        println!("{}", message);
    }

    fn show_verdict(&mut self, summary: &VerdictSummary) {
        println!("Result: {}", summary.verdict);
        println!("  {} CTS rows, {} No CTS rows", summary.positive, summary.negative);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let info = pureit_core::version_info();
    info!("{} v{}", info.name, info.version);

    match cli.command {
        Command::CheckConfig { path } => {
            ConfigLoader::validate_config_file(&path)?;
            println!("{}: ok", path.display());
            Ok(())
        }
        Command::ExportConfig { path } => {
            let config = load_config(cli.config)?;
            ConfigLoader::export_config(&config, &path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Emg { replay, output } => {
            let config = load_config(cli.config)?;
            run_emg(&config, cli.simulate, replay, output).await
        }
        Command::Detect { port } => {
            let mut config = load_config(cli.config)?;
            if let Some(port) = port {
                config.flex.port = port;
            }
            run_detect(config, cli.simulate).await
        }
        Command::Rehab { duration } => {
            let mut config = load_config(cli.config)?;
            if let Some(duration) = duration {
                config.rehab.duration_s = duration;
            }
            run_rehab(&config).await
        }
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<SystemConfig> {
    let loader = match path {
        Some(path) => {
            if !path.exists() {
                bail!("configuration file {} does not exist", path.display());
            }
            ConfigLoader::with_paths(vec![path])
        }
        None => ConfigLoader::new(),
    };
    let config = loader.load_system_config().context("loading configuration")?;
    info!("{}", config.summary());
    Ok(config)
}

async fn run_emg(
    config: &SystemConfig,
    simulate: bool,
    replay: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let emg = &config.emg;
    let source: Box<dyn EmgBatchSource> = match replay {
        Some(path) => Box::new(ReplayEmgSource::for_session(path, emg)?),
        None if simulate => Box::new(SyntheticEmgSource::new(EmgSimulationConfig::for_session(emg))?),
        None => bail!("no EMG device link on the desktop; use --simulate or --replay"),
    };

    let artifact = output.unwrap_or_else(|| emg.artifact_path.clone());
    let pipeline = EmgPipeline::new(emg, Arc::new(MonotonicTimeProvider::new()))?
        .with_sink(CsvSink::create(&artifact)?);
    let mut scheduler = EmgScheduler::new(source, pipeline, emg);

    let mut ticker = tokio::time::interval(scheduler.tick_interval());
    let report_every = (1000 / emg.tick_interval_ms).max(1);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if scheduler.tick()? == TickStatus::Finished {
                    break;
                }
                let stats = scheduler.stats();
                if stats.ticks % report_every == 0 {
                    info!(
                        "{:.1} s elapsed, envelope {:.3}",
                        scheduler.elapsed().as_secs_f64(),
                        scheduler.pipeline().envelope_display().latest().unwrap_or_default()
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Acquisition stopped by operator");
                break;
            }
        }
    }

    let summary = scheduler.finish()?;
    println!(
        "{} samples over {:.2} s, filtered {:.3}..{:.3}, envelope peak {:.3}",
        summary.samples, summary.duration_s, summary.filtered_min, summary.filtered_max, summary.envelope_max
    );
    println!("Artifact: {}", artifact.display());
    Ok(())
}

async fn run_detect(config: SystemConfig, simulate: bool) -> anyhow::Result<()> {
    let detector = Detector::from_config(&config)?;
    let (stop_tx, stop_rx) = crossbeam::channel::bounded::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.try_send(());
        }
    });

    let outcome = if simulate {
        let clock = Arc::new(MockTimeProvider::new(0));
        let mut source = SyntheticFlexSource::new(FlexSimulationConfig {
            calibration: config.flex.calibration.clone(),
            schedule: config.flex.protocol.clone(),
            ..FlexSimulationConfig::default()
        })
        .with_clock(clock.clone());

        tokio::task::spawn_blocking(move || {
            let mut surface = ConsoleSurface;
            detector.recorder().prepare(&mut source)?;
            detector.run(&mut source, clock.as_ref(), Some(&stop_rx), &mut surface)
        })
        .await?
    } else {
        let mut surface = ConsoleSurface;
        let mut source = match open_serial_port(&config.flex) {
            Ok(source) => source,
            Err(e) => {
                surface.report_error(&e);
                return Ok(());
            }
        };
        surface.show_status("Hold still...");
        tokio::time::sleep(Duration::from_millis(config.flex.settle_ms)).await;

        tokio::task::spawn_blocking(move || {
            let clock = MonotonicTimeProvider::new();
            detector.recorder().prepare(&mut source)?;
            detector.run(&mut source, &clock, Some(&stop_rx), &mut surface)
        })
        .await?
    };

    match outcome {
        Ok(result) => {
            info!(
                "{} samples recorded, {} classified ({} contraction / {} relaxation)",
                result.samples_recorded,
                result.rows_classified,
                result.condition_counts[0],
                result.condition_counts[1]
            );
            Ok(())
        }
        // Already on the operator surface; back to idle
        Err(e) if e.is_operator_reportable() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn run_rehab(config: &SystemConfig) -> anyhow::Result<()> {
    let mut relay = LoggingRelay::new(config.rehab.relay_pin, config.rehab.relay_active_low);
    let mut surface = ConsoleSurface;
    let mut session = RehabSession::start(&mut relay, &config.rehab)?;
    surface.show_status(&session.status_line());

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let tick = session.tick();
                surface.show_status(&session.status_line());
                if matches!(tick, RehabTick::Complete { .. }) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Rehabilitation stopped by operator");
                break;
            }
        }
    }

    let elapsed_s = session.finish()?;
    surface.show_status(&format!("Rehab done ({} s)", elapsed_s));
    Ok(())
}
