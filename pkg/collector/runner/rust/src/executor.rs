// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use log::{debug, warn};
use thiserror::Error;
use tokio::time;

use crate::check::{Check, CheckContext, CheckRun, Outcome};
use crate::state::RunState;

#[derive(Debug, Error)]
pub enum ExecuteError {
    /// A run for this instance is already in flight. Reported to the
    /// dispatching caller; the check itself never sees it.
    #[error("check instance '{0}' already has a run in progress")]
    Busy(String),
}

/// Drives check runs against a deadline and turns every failure mode into a
/// finalized [`CheckRun`]. A check failure never propagates to the caller.
///
/// The set of in-flight instance ids is the executor's only shared state; it
/// guards the at-most-one-concurrent-run-per-instance invariant.
#[derive(Debug, Default)]
pub struct CheckExecutor {
    running: Mutex<HashSet<String>>,
}

impl CheckExecutor {
    pub fn new() -> Self {
        Self {
            running: Mutex::new(HashSet::new()),
        }
    }

    pub async fn execute(
        &self,
        check_name: &str,
        instance_id: &str,
        check: &mut dyn Check,
        ctx: &CheckContext,
        deadline: Duration,
    ) -> Result<CheckRun, ExecuteError> {
        {
            let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
            if !running.insert(instance_id.to_string()) {
                return Err(ExecuteError::Busy(instance_id.to_string()));
            }
        }

        let run = self
            .execute_inner(check_name, instance_id, check, ctx, deadline)
            .await;

        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(instance_id);

        Ok(run)
    }

    async fn execute_inner(
        &self,
        check_name: &str,
        instance_id: &str,
        check: &mut dyn Check,
        ctx: &CheckContext,
        deadline: Duration,
    ) -> CheckRun {
        let started_at = SystemTime::now();
        let start = Instant::now();
        let mut state = RunState::Pending;
        advance(&mut state, RunState::Running, instance_id);
        debug!("[{instance_id}] run dispatched (deadline {}s)", deadline.as_secs());

        let outcome = match time::timeout(deadline, check.check(ctx)).await {
            Ok(Ok(())) => {
                advance(&mut state, RunState::Succeeded, instance_id);
                let warnings = ctx.take_warnings();
                if warnings.is_empty() {
                    Outcome::Ok
                } else {
                    Outcome::Warning(warnings)
                }
            }
            Ok(Err(e)) => {
                advance(&mut state, RunState::Failed, instance_id);
                ctx.take_warnings();
                warn!("[{instance_id}] check failed: {e:#}");
                Outcome::Failed(format!("{e:#}"))
            }
            Err(_) => {
                // The routine's future is dropped here; live subprocesses die
                // through their kill-on-drop handles.
                advance(&mut state, RunState::TimedOut, instance_id);
                ctx.take_warnings();
                warn!(
                    "[{instance_id}] run exceeded deadline ({}s), abandoned",
                    deadline.as_secs()
                );
                Outcome::TimedOut
            }
        };

        CheckRun {
            check_name: check_name.to_string(),
            instance_id: instance_id.to_string(),
            started_at,
            finished_at: SystemTime::now(),
            duration: start.elapsed(),
            outcome,
        }
    }
}

fn advance(state: &mut RunState, next: RunState, instance_id: &str) {
    debug_assert!(
        state.can_transition_to(next),
        "[{instance_id}] illegal run state transition {state} -> {next}"
    );
    *state = next;
}
