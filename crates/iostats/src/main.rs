use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use iostats::config::Cli;
use iostats::config::Commands;
use iostats::config::ProbeArgs;
use iostats::config::RunArgs;
use iostats::encoders::create_encoder;
use iostats::logging;
use iostats::sink::EncodedSink;
use iostats::source::ProcDiskstats;
use iostats::IoCheck;
use tokio::signal;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();
    logging::init();

    match cli.command {
        Commands::Run(run_args) => run_daemon(run_args).await,
        Commands::Probe(probe_args) => run_probe(probe_args).await,
    }
}

async fn run_daemon(run_args: RunArgs) -> Result<()> {
    let options = run_args
        .check
        .check_options()
        .context("invalid check configuration")?;
    let (writer, _guard) = logging::metrics_writer(&run_args.metrics_file)?;
    let mut sink = EncodedSink::new(create_encoder(&run_args.check.metrics_format), writer);
    let mut check = IoCheck::configure(options, ProcDiskstats::with_root(&run_args.check.root));

    tracing::info!(
        interval_secs = run_args.interval_secs,
        metrics_file = %run_args.metrics_file.display(),
        format = %run_args.check.metrics_format,
        "Starting iostats check loop"
    );

    let mut tick = interval(Duration::from_secs(run_args.interval_secs.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match tokio::task::block_in_place(|| check.run(&mut sink)) {
                    Ok(report) => tracing::debug!(?report, "Check cycle committed"),
                    Err(e) => {
                        let e = anyhow::Error::new(e);
                        tracing::warn!("Check cycle failed, retrying next interval: {e:#}");
                    }
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    Ok(())
}

async fn run_probe(probe_args: ProbeArgs) -> Result<()> {
    let options = probe_args
        .check
        .check_options()
        .context("invalid check configuration")?;
    let mut sink = EncodedSink::new(
        create_encoder(&probe_args.check.metrics_format),
        std::io::stdout(),
    );
    let mut check = IoCheck::configure(options, ProcDiskstats::with_root(&probe_args.check.root));

    let baseline = tokio::task::block_in_place(|| check.run(&mut sink))?;
    tracing::info!(
        tracked = baseline.tracked,
        "Recorded baseline, sampling again in {}s",
        probe_args.interval_secs
    );

    tokio::time::sleep(Duration::from_secs(probe_args.interval_secs)).await;

    let report = tokio::task::block_in_place(|| check.run(&mut sink))?;
    tracing::info!(?report, "Probe finished");
    Ok(())
}
