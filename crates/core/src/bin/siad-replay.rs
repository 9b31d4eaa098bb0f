use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use siad::config::{set_logger, Config};
use siad::replay::{parse_trace, replay, TraceEvent};
use siad::transport::CongestionControlAlgorithm;
use tracing::level_filters::LevelFilter;

/// Replay an ACK/loss trace through a congestion controller and print the
/// window after every event.
#[derive(Parser, Debug)]
#[command(name = "siad-replay", version, about)]
struct Args {
    /// Trace file, or `-` for stdin.
    trace: PathBuf,

    /// TOML configuration file.
    #[arg(long, env = "SIAD_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured algorithm (`siad` or `newreno`).
    #[arg(long)]
    algorithm: Option<CongestionControlAlgorithm>,

    /// Override the configured segment size (bytes).
    #[arg(long)]
    segment_size: Option<u32>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<LevelFilter>,

    /// Print SIAD statistics after the last event.
    #[arg(long)]
    summary: bool,
}

fn read_trace(path: &Path) -> anyhow::Result<String> {
    let mut content = String::new();
    if path.as_os_str() == "-" {
        io::stdin()
            .read_to_string(&mut content)
            .context("reading trace from stdin")?;
    } else {
        content = std::fs::read_to_string(path)
            .with_context(|| format!("reading trace {}", path.display()))?;
    }
    Ok(content)
}

fn describe(event: &TraceEvent) -> String {
    match event {
        TraceEvent::Ack { rtt, segments } => format!("ack {} {segments}", rtt.as_millis()),
        TraceEvent::Loss { bytes_in_flight } => format!("loss {bytes_in_flight}"),
        TraceEvent::Recovered => "recovered".to_string(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(algorithm) = args.algorithm {
        config.congestion_control.algorithm = algorithm;
    }
    if let Some(segment_size) = args.segment_size {
        config.segment_size = segment_size;
    }
    set_logger(Some(args.log_level.unwrap_or(config.log_level)));

    let events = parse_trace(&read_trace(&args.trace)?)?;
    let mut tcb = config.socket_state()?;
    let mut controller = config.congestion_controller()?;
    tracing::info!(
        algorithm = %config.congestion_control.algorithm,
        segment_size = config.segment_size,
        events = events.len(),
        "Replaying trace"
    );

    let steps = replay(&mut controller, &mut tcb, &events);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(out, "step\tevent\tcwnd\tssthresh")?;
    for step in &steps {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            step.step,
            describe(&step.event),
            step.cwnd,
            step.ssthresh
        )?;
    }
    if args.summary {
        if let Some(stats) = controller.siad_stats(&tcb) {
            writeln!(out, "# {stats:?}")?;
        }
    }
    out.flush()?;
    Ok(())
}
