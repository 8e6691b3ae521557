// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;

use crate::sink::{Sink, metric, service_check};

/// Prints every submission; the sink used by the standalone binary.
pub struct Console {}

impl Sink for Console {
    fn submit_metric(&self, metric: metric::Metric) -> Result<()> {
        println!("submit_metric: {:#?}", metric);
        Ok(())
    }

    fn submit_service_check(&self, service_check: service_check::ServiceCheck) -> Result<()> {
        println!("submit_service_check: {:#?}", service_check);
        Ok(())
    }
}
