// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::process::ProcessRunner;
use crate::sink::{Sink, metric, service_check};

/// One unit of periodic collection logic. Anything implementing `check` over
/// the fixed context qualifies; there is no base type to inherit from.
#[async_trait]
pub trait Check: Send {
    /// Collect once for this instance. Return an error to mark the run
    /// failed; non-fatal problems go through [`CheckContext::warning`].
    async fn check(&mut self, ctx: &CheckContext) -> Result<()>;
}

/// Execution context handed to a check for the duration of one instance.
///
/// Carries the check id, the process runner and the sink, plus the submission
/// helpers checks actually call. Warnings accumulate per run and are drained
/// by the executor when the run finalizes.
pub struct CheckContext {
    check_id: String,
    runner: ProcessRunner,
    sink: Arc<dyn Sink>,
    warnings: Mutex<Vec<String>>,
}

impl CheckContext {
    pub fn new(check_id: impl Into<String>, runner: ProcessRunner, sink: Arc<dyn Sink>) -> Self {
        Self {
            check_id: check_id.into(),
            runner,
            sink,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub fn sink(&self) -> &dyn Sink {
        self.sink.as_ref()
    }

    /// Send Gauge metric
    pub fn gauge(&self, name: &str, value: f64, tags: &[String]) -> Result<()> {
        self.submit(metric::Type::Gauge, name, value, tags)
    }

    /// Send Rate metric
    pub fn rate(&self, name: &str, value: f64, tags: &[String]) -> Result<()> {
        self.submit(metric::Type::Rate, name, value, tags)
    }

    /// Send Count metric
    pub fn count(&self, name: &str, value: f64, tags: &[String]) -> Result<()> {
        self.submit(metric::Type::Count, name, value, tags)
    }

    /// Send Monotonic Count metric
    pub fn monotonic_count(&self, name: &str, value: f64, tags: &[String]) -> Result<()> {
        self.submit(metric::Type::MonotonicCount, name, value, tags)
    }

    /// Send Service Check
    pub fn service_check(
        &self,
        name: &str,
        status: service_check::Status,
        tags: &[String],
        message: &str,
    ) -> Result<()> {
        self.sink.submit_service_check(service_check::ServiceCheck {
            check_id: self.check_id.clone(),
            name: name.to_string(),
            status,
            tags: tags.to_vec(),
            message: message.to_string(),
        })
    }

    /// Record a non-fatal problem. The run still succeeds but its outcome is
    /// downgraded to [`Outcome::Warning`].
    pub fn warning(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("[{}] {message}", self.check_id);
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub(crate) fn take_warnings(&self) -> Vec<String> {
        std::mem::take(
            &mut *self
                .warnings
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn submit(
        &self,
        metric_type: metric::Type,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> Result<()> {
        self.sink.submit_metric(metric::Metric {
            check_id: self.check_id.clone(),
            metric_type,
            name: name.to_string(),
            value,
            tags: tags.to_vec(),
            timestamp: None,
        })
    }
}

/// Final outcome of one check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// Returned cleanly but recorded warnings along the way.
    Warning(Vec<String>),
    Failed(String),
    TimedOut,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok | Outcome::Warning(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => write!(f, "ok"),
            Outcome::Warning(warnings) => write!(f, "ok with {} warning(s)", warnings.len()),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
            Outcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Record of one check invocation, created at dispatch and finalized exactly
/// once when the routine returns or the deadline fires.
#[derive(Debug, Clone)]
pub struct CheckRun {
    pub check_name: String,
    pub instance_id: String,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
    pub duration: Duration,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;

    fn recording_ctx() -> (CheckContext, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let ctx = CheckContext::new(
            "testcheck:0",
            ProcessRunner::new(),
            Arc::clone(&sink) as Arc<dyn Sink>,
        );
        (ctx, sink)
    }

    #[test]
    fn test_gauge_reaches_sink() {
        let (ctx, sink) = recording_ctx();
        ctx.gauge("some.metric", 1.5, &["env:test".to_string()])
            .unwrap();

        let metrics = sink.metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].check_id, "testcheck:0");
        assert_eq!(metrics[0].name, "some.metric");
        assert_eq!(metrics[0].metric_type, metric::Type::Gauge);
        assert_eq!(metrics[0].value, 1.5);
        assert_eq!(metrics[0].tags, ["env:test"]);
    }

    #[test]
    fn test_service_check_reaches_sink() {
        let (ctx, sink) = recording_ctx();
        ctx.service_check("some.can_run", service_check::Status::Critical, &[], "boom")
            .unwrap();

        let service_checks = sink.service_checks();
        assert_eq!(service_checks.len(), 1);
        assert_eq!(service_checks[0].status, service_check::Status::Critical);
        assert_eq!(service_checks[0].message, "boom");
    }

    #[test]
    fn test_warnings_drain_once() {
        let (ctx, _sink) = recording_ctx();
        ctx.warning("first");
        ctx.warning("second");
        assert_eq!(ctx.take_warnings(), ["first", "second"]);
        assert!(ctx.take_warnings().is_empty());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Ok.to_string(), "ok");
        assert_eq!(
            Outcome::Warning(vec!["w".into()]).to_string(),
            "ok with 1 warning(s)"
        );
        assert_eq!(Outcome::Failed("boom".into()).to_string(), "failed: boom");
        assert_eq!(Outcome::TimedOut.to_string(), "timed out");
        assert!(Outcome::Ok.is_ok());
        assert!(Outcome::Warning(vec![]).is_ok());
        assert!(!Outcome::TimedOut.is_ok());
    }
}
