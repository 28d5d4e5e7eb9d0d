use std::future::Future;

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{Instrument as _, error, info, info_span, warn};

use crate::{
    config::settings::Settings,
    gateway::DynamicGateway,
    error::StrategyError,
    runner::{
        stop_signal::{StopHandle, StopSignal},
        strategy_runner::{RunSummary, StrategyRunner},
    },
    scenario::strategies::StrategyKind,
    types::instrument::Instrument,
};

type WorkerExit = (Instrument, Result<RunSummary, StrategyError>);

/// Starts one worker per configured pair and waits for all of them.
///
/// Workers share the gateway and the stop flag and nothing else. A worker
/// that fails never takes the others down with it.
pub struct Supervisor {
    settings: Settings,
    kind: StrategyKind,
    gateway: DynamicGateway,
}

impl Supervisor {
    pub fn new(settings: Settings, kind: StrategyKind, gateway: DynamicGateway) -> Self {
        Self {
            settings,
            kind,
            gateway,
        }
    }

    /// Runs until every worker has exited. `shutdown` resolving raises the
    /// stop flag for all of them.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let (handle, stop) = StopSignal::new();
        let watcher = tokio::spawn(watch_shutdown(shutdown, handle));

        let mut workers = JoinSet::new();

        for (index, instrument) in self.settings.pairs.iter().enumerate() {
            if index > 0 && stop.sleep(self.settings.startup_stagger).await {
                info!("stop requested during startup, remaining pairs not started");
                break;
            }

            match self.spawn_worker(&mut workers, instrument, stop.clone()) {
                Ok(()) => info!(pair = %instrument, "worker launched"),
                Err(error) => error!(pair = %instrument, %error, "invalid pair configuration, pair skipped"),
            }
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((instrument, Ok(summary))) => {
                    info!(pair = %instrument, cycles = summary.cycles, "worker finished")
                }
                Ok((instrument, Err(error))) => {
                    error!(pair = %instrument, %error, "worker ended with error")
                }
                Err(error) => error!(%error, "worker task panicked"),
            }
        }

        watcher.abort();
        info!("all workers stopped");

        Ok(())
    }

    fn spawn_worker(
        &self,
        workers: &mut JoinSet<WorkerExit>,
        instrument: &Instrument,
        stop: StopSignal,
    ) -> Result<()> {
        let config = self.settings.pair_config(instrument)?;
        let runner = StrategyRunner::new(config, self.kind, self.gateway.clone(), stop);
        let span = info_span!("worker", pair = %instrument);
        let instrument = instrument.clone();

        workers.spawn(async move { (instrument, runner.run().await) }.instrument(span));

        Ok(())
    }
}

async fn watch_shutdown(shutdown: impl Future<Output = ()>, handle: StopHandle) {
    shutdown.await;
    warn!("shutdown requested, stopping workers after their current cycle");
    handle.stop();
}

/// Resolves on ctrl-c. If the handler cannot be installed the process only
/// stops when every worker has exited on its own.
pub async fn ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
