// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::sync::{Mutex, PoisonError};

use anyhow::Result;

use crate::sink::{Sink, metric::Metric, service_check::ServiceCheck};

/// Sink that records every submission for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    metrics: Mutex<Vec<Metric>>,
    service_checks: Mutex<Vec<ServiceCheck>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Vec<Metric> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn service_checks(&self) -> Vec<ServiceCheck> {
        self.service_checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.metrics().into_iter().map(|m| m.name).collect()
    }

    pub fn submission_count(&self) -> usize {
        self.metrics().len() + self.service_checks().len()
    }
}

impl Sink for RecordingSink {
    fn submit_metric(&self, metric: Metric) -> Result<()> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(metric);
        Ok(())
    }

    fn submit_service_check(&self, service_check: ServiceCheck) -> Result<()> {
        self.service_checks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(service_check);
        Ok(())
    }
}
