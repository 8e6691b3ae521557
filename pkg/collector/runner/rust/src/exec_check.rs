// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value;

use crate::check::{Check, CheckContext};
use crate::command::Command;
use crate::config::{DEFAULT_CHECK_TIMEOUT, DEFAULT_COLLECTION_INTERVAL};
use crate::process::TerminationCause;
use crate::sink::service_check::Status;

pub const CHECK_NAME: &str = "exec";

const SERVICE_CHECK_NAME: &str = "exec.can_run";

fn default_interval() -> u64 {
    DEFAULT_COLLECTION_INTERVAL
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecInitConfig {
    /// Default command timeout (seconds) for every instance in the file.
    pub timeout: Option<u64>,
}

/// The recognized options of one exec instance. Unknown keys are rejected at
/// instantiation, not discovered at collection time.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecInstanceConfig {
    pub name: Option<String>,
    /// argv; the first element is the executable.
    pub command: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub working_dir: Option<String>,
    /// Command timeout in seconds; overrides init_config.
    pub timeout: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_interval")]
    pub min_collection_interval: u64,
}

/// Built-in check that runs a configured command and reports whether it ran,
/// how long it took and how it exited.
pub struct ExecCheck {
    instance: ExecInstanceConfig,
    timeout: Duration,
}

impl ExecCheck {
    /// Validates the configuration once; misconfiguration never reaches a run.
    pub fn new(init_config: &Value, instance: &Value) -> Result<Self> {
        let init: ExecInitConfig = if init_config.is_null() {
            ExecInitConfig::default()
        } else {
            serde_yaml::from_value(init_config.clone()).context("parsing exec init_config")?
        };
        let instance: ExecInstanceConfig =
            serde_yaml::from_value(instance.clone()).context("parsing exec instance")?;
        if instance.command.is_empty() {
            bail!("exec instance requires a non-empty command");
        }

        let timeout =
            Duration::from_secs(instance.timeout.or(init.timeout).unwrap_or(DEFAULT_CHECK_TIMEOUT));
        Ok(Self { instance, timeout })
    }

    fn command(&self) -> Command {
        let argv = &self.instance.command;
        let mut command = Command::new(&argv[0])
            .args(argv[1..].iter().cloned())
            .timeout(self.timeout);
        for (key, value) in &self.instance.env {
            command = command.env(key, value);
        }
        if let Some(dir) = &self.instance.working_dir {
            command = command.working_dir(dir);
        }
        command
    }
}

pub fn factory(init_config: &Value, instance: &Value) -> Result<Box<dyn Check>> {
    Ok(Box::new(ExecCheck::new(init_config, instance)?))
}

#[async_trait]
impl Check for ExecCheck {
    async fn check(&mut self, ctx: &CheckContext) -> Result<()> {
        let result = ctx.runner().run(&self.command()).await?;

        let tags = &self.instance.tags;
        ctx.gauge("exec.run.duration", result.elapsed.as_secs_f64(), tags)?;

        match result.cause {
            TerminationCause::Exited => {
                let code = result.exit_code.unwrap_or(-1);
                ctx.gauge("exec.run.exit_code", code as f64, tags)?;
                if code == 0 {
                    ctx.service_check(SERVICE_CHECK_NAME, Status::Ok, tags, "")?;
                } else {
                    // Non-zero exit is data about the target, not a failure
                    // of the collection itself.
                    ctx.service_check(
                        SERVICE_CHECK_NAME,
                        Status::Critical,
                        tags,
                        &format!("command exited with code {code}"),
                    )?;
                }
            }
            TerminationCause::Killed => {
                ctx.service_check(
                    SERVICE_CHECK_NAME,
                    Status::Critical,
                    tags,
                    "command was killed by a signal",
                )?;
            }
            TerminationCause::TimedOut => {
                let message = format!("command timed out after {}s", self.timeout.as_secs());
                ctx.warning(message.clone());
                ctx.service_check(SERVICE_CHECK_NAME, Status::Critical, tags, &message)?;
            }
            TerminationCause::LaunchFailed => {
                bail!("failed to launch '{}'", self.instance.command[0]);
            }
        }

        if result.stdout.truncated || result.stderr.truncated {
            ctx.warning(format!(
                "captured output truncated ({} bytes discarded)",
                result.stdout.discarded + result.stderr.discarded
            ));
        }

        Ok(())
    }
}
