use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::coordination::Workforce;
use crate::config::DriverConfig;
use crate::storage::traits::SnapshotStore;

/// Real-time loops around a [`Workforce`]: stepping, propagation and periodic saves.
/// Each loop skips missed ticks, so a stalled or paused run never catches up in a burst.
pub struct Driver {
    workforce: Arc<Workforce>,
    store: Option<Arc<dyn SnapshotStore>>,
    config: DriverConfig,
}

pub struct DriverHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    workforce: Arc<Workforce>,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl Driver {
    pub fn new(workforce: Arc<Workforce>, config: DriverConfig) -> Self {
        Self {
            workforce,
            store: None,
            config,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn start(self) -> DriverHandle {
        let (shutdown, receiver) = watch::channel(false);
        let mut tasks = Vec::new();

        let hours_per_step = self.config.hours_per_step;
        tasks.push(spawn_loop(
            "step",
            self.config.step_interval_ms,
            receiver.clone(),
            self.workforce.clone(),
            move |workforce| {
                let report = workforce.step(hours_per_step);
                for error in &report.errors {
                    log::error!("Step error: {}", error);
                }
            },
        ));

        tasks.push(spawn_loop(
            "propagation",
            self.config.propagation_interval_ms,
            receiver.clone(),
            self.workforce.clone(),
            |workforce| {
                workforce.propagate();
            },
        ));

        if let Some(store) = self.store.clone() {
            let workforce = self.workforce.clone();
            let mut shutdown_rx = receiver;
            let period = Duration::from_millis(self.config.persistence_interval_ms.max(1));
            tasks.push(tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if workforce.is_paused() {
                                continue;
                            }
                            if let Err(e) = store.save(&workforce.snapshot()).await {
                                log::error!("Periodic save to {} failed: {:#}", store.describe(), e);
                            }
                        }
                        _ = shutdown_rx.changed() => break,
                    }
                }
            }));
        }

        log::info!(
            "Driver started: {}h per step every {}ms",
            self.config.hours_per_step,
            self.config.step_interval_ms
        );

        DriverHandle {
            shutdown,
            tasks,
            workforce: self.workforce,
            store: self.store,
        }
    }
}

fn spawn_loop<F>(
    name: &'static str,
    period_ms: u64,
    mut shutdown: watch::Receiver<bool>,
    workforce: Arc<Workforce>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut(&Workforce) + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(period_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !workforce.is_paused() {
                        tick(&workforce);
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        log::debug!("{} loop stopped", name);
    })
}

impl DriverHandle {
    pub fn workforce(&self) -> &Arc<Workforce> {
        &self.workforce
    }

    /// Stops every loop, waits for them, then writes a final snapshot.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                log::error!("Driver task ended abnormally: {}", e);
            }
        }

        if let Some(store) = &self.store {
            store.save(&self.workforce.snapshot()).await?;
            log::info!("Final snapshot written to {}", store.describe());
        }
        Ok(())
    }
}
