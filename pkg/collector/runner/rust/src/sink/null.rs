// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;

use crate::sink::{Sink, metric, service_check};

/// Discards every submission. Used where a run must not touch the pipeline,
/// e.g. fixtures exercising only the subprocess path.
pub struct Null {}

impl Sink for Null {
    fn submit_metric(&self, _metric: metric::Metric) -> Result<()> {
        Ok(())
    }

    fn submit_service_check(&self, _service_check: service_check::ServiceCheck) -> Result<()> {
        Ok(())
    }
}
