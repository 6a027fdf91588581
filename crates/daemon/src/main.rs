//! `observer` daemon: publishes the current epoch's report on a fixed cadence.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use observer_app::AppBuilder;
use observer_core::{ReportProducer, ReportSink};
use observer_crypto::SigningKeypair;
use observer_ledger::{
    BalanceReporter, DataItemUploader, GatewayClient, HeightSource, MemoryLedger, ReportIndex,
    TurboClient,
};
use observer_publisher::{EpochReportProducer, LedgerReportSink, ObserverConfig, ReportScheduler};
use tracing::info;

const SERVICE: &str = "observer";

#[derive(Debug, Parser)]
#[command(name = "observer", version, about = "Publishes epoch observer reports")]
struct Args {
    /// Settings file (defaults to the platform config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Existing wallet key file (32 raw bytes or 64 hex chars).
    #[arg(long)]
    wallet: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Publish to an in-memory ledger instead of the network.
    #[arg(long)]
    dry_run: bool,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

struct Ledger {
    index: Arc<dyn ReportIndex>,
    uploader: Arc<dyn DataItemUploader>,
    balance: Arc<dyn BalanceReporter>,
    heights: Arc<dyn HeightSource>,
}

fn network_ledger(config: &ObserverConfig, keypair: Arc<SigningKeypair>) -> Result<Ledger> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let gateway = Arc::new(
        GatewayClient::new(&config.gateway_url, timeout).context("failed to build gateway client")?,
    );
    let turbo = Arc::new(
        TurboClient::new(&config.upload_url, &config.payment_url, keypair, timeout)
            .context("failed to build Turbo client")?,
    );
    Ok(Ledger {
        index: gateway.clone(),
        uploader: turbo.clone(),
        balance: turbo,
        heights: gateway,
    })
}

fn dry_run_ledger() -> Ledger {
    let ledger = Arc::new(MemoryLedger::default());
    Ledger {
        index: ledger.clone(),
        uploader: ledger.clone(),
        balance: ledger.clone(),
        heights: ledger,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = AppBuilder::<ObserverConfig>::new(SERVICE)
        .verbose(args.verbose)
        .json_logs(args.json_logs);
    if let Some(path) = &args.config {
        builder = builder.config_path(path);
    }
    if let Some(path) = &args.wallet {
        builder = builder.wallet_path(path);
    }
    let app = builder.build().context("failed to initialize observer")?;

    let mut config = app.settings.config.clone();
    config.apply_env_overrides(|key| std::env::var(key).ok());

    if !config.run_observer {
        info!("run_observer is disabled, exiting");
        return Ok(());
    }

    let ledger = if args.dry_run {
        info!("dry run: publishing to in-memory ledger");
        dry_run_ledger()
    } else {
        network_ledger(&config, app.keypair.clone())?
    };

    let producer: Arc<dyn ReportProducer> = Arc::new(EpochReportProducer::new(
        ledger.heights,
        config.epoch_settings(),
        app.keypair.address(),
    ));
    let sink: Arc<dyn ReportSink> = Arc::new(LedgerReportSink::new(
        ledger.index,
        ledger.uploader,
        ledger.balance,
        app.keypair.clone(),
    ));
    let scheduler = ReportScheduler::new(producer, sink);

    if args.once {
        let saved = scheduler.run_cycle().await;
        info!(
            report_tx_id = saved
                .as_ref()
                .and_then(|s| s.report_tx_id.as_deref())
                .unwrap_or("none"),
            "single cycle finished"
        );
        return Ok(());
    }

    let handle = scheduler.spawn();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received, stopping scheduler");
    handle.abort();
    Ok(())
}
