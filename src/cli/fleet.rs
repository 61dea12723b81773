//! Launch, supervise and plan benchmark fleets

use anyhow::{bail, Context, Result};
use fleet_bench_core::{
    Batch, BatchStamp, FleetConfig, FleetOrchestrator, InstanceDescriptor, OrchestratorBuilder,
    Role, ShutdownSignals, Supervision, Supervisor, TopologyTable,
};

use super::LaunchArgs;

/// Whether to keep going after a batch
enum Flow {
    Continue,
    Shutdown,
}

fn build(config: FleetConfig, hostname: String) -> Result<FleetOrchestrator> {
    OrchestratorBuilder::new()
        .config(config)
        .local_host(hostname)
        .build()
        .context("invalid configuration")
}

/// Run the transfer-engine fleet once per configured batch size
pub async fn run_transfer(
    config: FleetConfig,
    hostname: String,
    role: Role,
    launch: LaunchArgs,
) -> Result<()> {
    let orchestrator = build(config, hostname)?;
    let te = &orchestrator.config().transfer_engine;
    let block_size = te.block_size;
    let batch_sizes = te.batch_sizes.clone();

    if launch.dry_run {
        for (seq, &batch_size) in (1..).zip(&batch_sizes) {
            println!("# batch size {batch_size}");
            let plan = orchestrator.plan_transfer_batch(role, block_size, batch_size)?;
            print_plan(&orchestrator, &plan, seq);
        }
        return Ok(());
    }

    // Handlers go in before any launch so no signal finds processes unowned
    let mut signals = install_signals()?;
    let mut supervisor = Supervisor::from_config(&orchestrator.config().supervisor);

    if launch.detach {
        let &[batch_size] = batch_sizes.as_slice() else {
            bail!(
                "--detach launches a single batch, but {} batch sizes are configured",
                batch_sizes.len()
            );
        };
        let batch = orchestrator
            .run_transfer_batch(role, block_size, batch_size)
            .await
            .with_context(|| format!("failed to launch transfer batch (batch size {batch_size})"))?;
        detach(&mut supervisor, &mut signals, batch).await;
        return Ok(());
    }

    for batch_size in batch_sizes {
        let batch = orchestrator
            .run_transfer_batch(role, block_size, batch_size)
            .await
            .with_context(|| format!("failed to launch transfer batch (batch size {batch_size})"))?;

        if let Flow::Shutdown = supervise(&mut supervisor, &mut signals, batch).await {
            return Ok(());
        }
        tracing::info!(batch_size, "Transfer batch finished");
    }
    Ok(())
}

/// Run the write-bandwidth fleet
pub async fn run_write_bw(
    config: FleetConfig,
    hostname: String,
    role: Role,
    launch: LaunchArgs,
) -> Result<()> {
    let orchestrator = build(config, hostname)?;

    if launch.dry_run {
        let plan = orchestrator.plan_write_bw_batch(role)?;
        print_plan(&orchestrator, &plan, 1);
        return Ok(());
    }

    let mut signals = install_signals()?;
    let mut supervisor = Supervisor::from_config(&orchestrator.config().supervisor);

    let batch = orchestrator
        .run_write_bw_batch(role)
        .await
        .context("failed to launch write-bandwidth batch")?;

    if launch.detach {
        detach(&mut supervisor, &mut signals, batch).await;
    } else {
        supervise(&mut supervisor, &mut signals, batch).await;
    }
    Ok(())
}

/// Validate the configuration and print what would be launched
pub fn validate(config: FleetConfig, hostname: String, role: Role) -> Result<()> {
    let orchestrator = build(config, hostname)?;
    let config = orchestrator.config();

    let topology = TopologyTable::from_config(&config.topology)?;
    println!("host:     {} ({role})", orchestrator.local_host());
    println!("metadata: {}", config.meta_server_address()?);
    println!("remote:   {}", config.remote_address()?);
    println!("results:  {}", config.output.results_dir.display());
    println!("slots:    {}", topology.slot_count());
    for slot in topology.slots() {
        println!(
            "  [{:02}] accelerator {} device {} port {}",
            slot.index, slot.accelerator_id, slot.device_name, slot.port
        );
    }

    let te = &config.transfer_engine;
    for (seq, &batch_size) in (1..).zip(&te.batch_sizes) {
        println!("\n# transfer-engine, batch size {batch_size}");
        let plan = orchestrator.plan_transfer_batch(role, te.block_size, batch_size)?;
        print_plan(&orchestrator, &plan, seq);
    }

    println!("\n# write-bandwidth");
    let plan = orchestrator.plan_write_bw_batch(role)?;
    print_plan(&orchestrator, &plan, 1);

    tracing::info!("Configuration is valid");
    Ok(())
}

/// Print commands and log paths; `seq` is the batch's number within the run
fn print_plan(orchestrator: &FleetOrchestrator, plan: &[InstanceDescriptor], seq: u32) {
    let stamp = BatchStamp::now().numbered(seq);
    let launcher = orchestrator.launcher();
    for (slot, descriptor) in plan.iter().enumerate() {
        println!("[{slot:02}] {}", launcher.command(descriptor));
        println!("     log: {}", launcher.log_path(slot, descriptor, &stamp).display());
    }
}

fn install_signals() -> Result<ShutdownSignals> {
    ShutdownSignals::install().context("failed to install signal handlers")
}

/// Leave a batch running in its own process groups
///
/// A signal that arrived while the batch was launching stops it instead.
async fn detach(supervisor: &mut Supervisor, signals: &mut ShutdownSignals, batch: Batch) {
    tokio::task::yield_now().await;
    if let Some(signal) = signals.pending() {
        supervisor.adopt(batch);
        let report = supervisor.stop_all().await;
        tracing::info!(
            %signal,
            stopped = report.stopped.len(),
            failed = report.failures.len(),
            "Signal received during launch, batch stopped"
        );
        return;
    }

    for handle in batch.into_handles() {
        tracing::info!(
            slot = handle.slot(),
            pid = handle.pid(),
            log_path = %handle.log_path().display(),
            "Detached benchmark"
        );
    }
}

/// Wait for a batch to finish; on SIGINT/SIGTERM stop everything
async fn supervise(
    supervisor: &mut Supervisor,
    signals: &mut ShutdownSignals,
    batch: Batch,
) -> Flow {
    supervisor.adopt(batch);
    match supervisor.supervise(signals).await {
        Supervision::Completed(records) => {
            let failed = records.iter().filter(|r| !r.success()).count();
            if failed > 0 {
                tracing::warn!(failed, total = records.len(), "Some benchmarks failed, see their logs");
            }
            Flow::Continue
        }
        Supervision::Interrupted { signal, report } => {
            tracing::info!(
                %signal,
                stopped = report.stopped.len(),
                failed = report.failures.len(),
                "Shutdown complete"
            );
            Flow::Shutdown
        }
    }
}
