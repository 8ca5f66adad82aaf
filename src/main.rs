use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use arbor_config::HostConfig;
use arbor_runtime::WorkflowHost;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod demo;

use demo::{Launch, LaunchReport, LaunchScreen};

/// Arbor - composable workflow trees with keyed reconciliation
#[derive(Parser)]
#[command(name = "arbor")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a countdown workflow, printing each rendering as a JSON line
  Countdown {
    /// Number to count down from
    #[arg(long, default_value_t = 5)]
    from: u64,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Path to a host config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Countdown {
      from,
      interval_ms,
      config,
    }) => {
      run_countdown(from, Duration::from_millis(interval_ms), config)?;
    }
    None => {
      println!("arbor - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

fn run_countdown(from: u64, interval: Duration, config: Option<PathBuf>) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_countdown_async(from, interval, config).await })
}

async fn run_countdown_async(from: u64, interval: Duration, config: Option<PathBuf>) -> Result<()> {
  let config = match config {
    Some(path) => HostConfig::from_path(&path)
      .with_context(|| format!("failed to load host config: {}", path.display()))?,
    None => HostConfig::labeled("countdown"),
  };

  let mut host = WorkflowHost::with_config(Launch { from, interval }, config)
    .context("failed to create workflow host")?;
  info!(
    label = %host.config().label,
    policy = ?host.config().render_policy,
    from,
    "countdown started"
  );
  let renderings = host.renderings();
  let outputs = host
    .take_outputs()
    .context("workflow host outputs already taken")?;

  let cancel = CancellationToken::new();
  let ((), reported) = tokio::join!(
    host.run(cancel.clone()),
    report(renderings, outputs, cancel)
  );
  reported
}

/// Print renderings until the root reports, then stop the host.
async fn report(
  mut renderings: watch::Receiver<LaunchScreen>,
  mut outputs: mpsc::UnboundedReceiver<LaunchReport>,
  cancel: CancellationToken,
) -> Result<()> {
  print_json(&*renderings.borrow_and_update())?;

  // Nothing to count down
  if renderings.borrow().launched {
    cancel.cancel();
    return Ok(());
  }

  loop {
    tokio::select! {
      changed = renderings.changed() => {
        if changed.is_err() {
          break;
        }
        print_json(&*renderings.borrow_and_update())?;
      }
      output = outputs.recv() => {
        // The final rendering is published alongside the output
        if renderings.has_changed().unwrap_or(false) {
          print_json(&*renderings.borrow_and_update())?;
        }
        if let Some(output) = output {
          print_json(&output)?;
        }
        break;
      }
      _ = tokio::signal::ctrl_c() => {
        eprintln!("Interrupted");
        break;
      }
    }
  }

  cancel.cancel();
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string(value)?);
  Ok(())
}
