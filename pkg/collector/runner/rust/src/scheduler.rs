// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::check::{Check, CheckContext};
use crate::executor::{CheckExecutor, ExecuteError};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// One configured check instance plus its collection cadence.
pub struct ScheduledInstance {
    pub check_name: String,
    pub instance_id: String,
    pub interval: Duration,
    pub deadline: Duration,
    pub check: Box<dyn Check>,
    pub ctx: CheckContext,
}

/// Dispatches every scheduled instance on its own task, so a hanging
/// subprocess in one check never stalls the others.
pub struct Scheduler {
    executor: Arc<CheckExecutor>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(executor: Arc<CheckExecutor>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            executor,
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    /// Spawn the collection loop for one instance. The first collection
    /// happens immediately, then every `interval`.
    pub fn schedule(&mut self, instance: ScheduledInstance) {
        let executor = Arc::clone(&self.executor);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let ScheduledInstance {
                check_name,
                instance_id,
                interval,
                deadline,
                mut check,
                ctx,
            } = instance;

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("[{instance_id}] scheduled every {}s", interval.as_secs());

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match executor
                            .execute(&check_name, &instance_id, check.as_mut(), &ctx, deadline)
                            .await
                        {
                            Ok(run) => info!(
                                "[{instance_id}] run finished in {}ms: {}",
                                run.duration.as_millis(),
                                run.outcome
                            ),
                            Err(ExecuteError::Busy(_)) => {
                                warn!("[{instance_id}] previous run still in progress, skipping tick")
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("[{instance_id}] collection loop stopped");
        });

        self.tasks.push(handle);
    }

    /// Flip the shutdown flag and join every collection loop, aborting the
    /// ones that do not stop within the join timeout.
    pub async fn shutdown(self) {
        let Self {
            shutdown_tx, tasks, ..
        } = self;
        let _ = shutdown_tx.send(true);

        for task in tasks {
            let abort = task.abort_handle();
            if time::timeout(JOIN_TIMEOUT, task).await.is_err() {
                warn!(
                    "collection task did not stop within {}s, aborting",
                    JOIN_TIMEOUT.as_secs()
                );
                abort.abort();
            }
        }
    }
}
