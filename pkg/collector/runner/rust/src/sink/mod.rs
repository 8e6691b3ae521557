// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::Result;

pub mod console;
pub use self::console::Console;

pub mod null;
pub use self::null::Null;

/// Boundary to the metrics pipeline. A check may submit any number of
/// metrics and service checks per run, including none at all.
pub trait Sink: Send + Sync {
    fn submit_metric(&self, metric: metric::Metric) -> Result<()>;
    fn submit_service_check(&self, service_check: service_check::ServiceCheck) -> Result<()>;
}

pub mod metric {
    use std::time::SystemTime;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum Type {
        Gauge,
        Rate,
        Count,
        MonotonicCount,
    }

    #[derive(Debug, Clone)]
    pub struct Metric {
        pub check_id: String,
        pub metric_type: Type,
        pub name: String,
        pub value: f64,
        /// `key:value` formatted tags.
        pub tags: Vec<String>,
        /// Submission time; `None` means "now" per sink policy.
        pub timestamp: Option<SystemTime>,
    }
}

pub mod service_check {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub enum Status {
        Ok = 0,
        Warning,
        Critical,
        Unknown,
    }

    #[derive(Debug, Clone)]
    pub struct ServiceCheck {
        pub check_id: String,
        pub name: String,
        pub status: Status,
        pub tags: Vec<String>,
        pub message: String,
    }
}
