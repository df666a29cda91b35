//! Keeper / crank for the jackpot program.
//!
//! Polls the pot account and issues at most one transition per cycle until
//! interrupted.

use anyhow::Context;
use clap::Parser;
use keeper_service::{init_tracing, Backend, KeeperConfig, KeeperService, LogFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "jackpot-keeper", version, about = "Advance jackpot rounds on schedule")]
struct Args {
    /// JSON configuration file
    #[arg(long, env = "KEEPER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    rpc_url: Option<String>,

    #[arg(long)]
    relay_url: Option<String>,

    #[arg(long)]
    program_id: Option<String>,

    /// Seconds between cycles
    #[arg(long)]
    poll_interval: Option<u64>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Run against an in-process program instead of the network
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Err(e) = run(args).await {
        tracing::error!("keeper failed to start: {e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let backend = if args.simulate {
        Backend::Simulated
    } else {
        Backend::Live
    };
    let service = KeeperService::build(&config, backend).context("building keeper")?;

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(cancel.clone()));

    service.run(cancel).await;
    Ok(())
}

/// File, then environment, then flags
fn resolve_config(args: &Args) -> anyhow::Result<KeeperConfig> {
    let mut config = KeeperConfig::load(args.config.as_deref()).context("loading configuration")?;
    config
        .apply_env()
        .context("applying environment overrides")?;

    if let Some(url) = &args.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(url) = &args.relay_url {
        config.relay_url = url.clone();
    }
    if let Some(id) = &args.program_id {
        config.program_id = id.clone();
    }
    if let Some(secs) = args.poll_interval {
        config.poll_interval_secs = secs;
    }

    Ok(config)
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM, only Ctrl-C stops the keeper");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown requested, finishing current cycle");
    cancel.cancel();
}
