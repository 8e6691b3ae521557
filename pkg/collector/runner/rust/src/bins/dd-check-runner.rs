// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use tokio::signal::unix::{SignalKind, signal};

use dd_check_runner::check::CheckContext;
use dd_check_runner::config::{self, CheckFile, CommonOptions};
use dd_check_runner::executor::CheckExecutor;
use dd_check_runner::process::ProcessRunner;
use dd_check_runner::registry::Registry;
use dd_check_runner::scheduler::{ScheduledInstance, Scheduler};
use dd_check_runner::sink::{Console, Sink};

#[derive(Parser)]
#[command(name = "dd-check-runner", version, about = "Runs agent checks on a schedule")]
struct Args {
    /// Directory holding per-check YAML configuration files.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Run every configured instance once, then exit.
    #[arg(long)]
    once: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: log::Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::init_with_level(args.log_level)?;
    info!(
        "dd-check-runner starting (version {})",
        env!("CARGO_PKG_VERSION")
    );

    let dir = args.config_dir.unwrap_or_else(config::config_dir);
    let files = if dir.is_dir() {
        config::load_check_files(&dir)?
    } else {
        warn!("config directory {} does not exist", dir.display());
        Vec::new()
    };
    info!("loaded {} check config(s)", files.len());

    let registry = Registry::with_builtin_checks();
    let runner = ProcessRunner::new();
    let sink: Arc<dyn Sink> = Arc::new(Console {});
    let executor = Arc::new(CheckExecutor::new());

    let instances = build_instances(&registry, &runner, &sink, files);
    info!("configured {} check instance(s)", instances.len());

    if args.once {
        for mut instance in instances {
            match executor
                .execute(
                    &instance.check_name,
                    &instance.instance_id,
                    instance.check.as_mut(),
                    &instance.ctx,
                    instance.deadline,
                )
                .await
            {
                Ok(run) => info!(
                    "[{}] run finished in {}ms: {}",
                    run.instance_id,
                    run.duration.as_millis(),
                    run.outcome
                ),
                Err(e) => warn!("[{}] {e}", instance.instance_id),
            }
        }
        return Ok(());
    }

    let mut scheduler = Scheduler::new(Arc::clone(&executor));
    for instance in instances {
        scheduler.schedule(instance);
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    info!("dd-check-runner shutting down");
    scheduler.shutdown().await;
    Ok(())
}

/// Turn loaded config files into scheduled instances. Instances that fail to
/// validate are logged and skipped; one bad instance never takes down the
/// rest of the file.
fn build_instances(
    registry: &Registry,
    runner: &ProcessRunner,
    sink: &Arc<dyn Sink>,
    files: Vec<(String, CheckFile)>,
) -> Vec<ScheduledInstance> {
    let mut instances = Vec::new();

    for (check_name, file) in files {
        for (idx, instance) in file.instances.iter().enumerate() {
            let common = match CommonOptions::parse(instance) {
                Ok(common) => common,
                Err(e) => {
                    warn!("[{check_name}] skipping instance {idx}: {e:#}");
                    continue;
                }
            };
            let instance_id = format!(
                "{}:{}",
                check_name,
                common.name.clone().unwrap_or_else(|| idx.to_string())
            );

            let check = match registry.create(&check_name, &file.init_config, instance) {
                Ok(check) => check,
                Err(e) => {
                    warn!("[{instance_id}] failed to configure: {e:#}");
                    continue;
                }
            };

            let ctx = CheckContext::new(instance_id.clone(), runner.clone(), Arc::clone(sink));
            instances.push(ScheduledInstance {
                check_name: check_name.clone(),
                instance_id,
                interval: Duration::from_secs(common.min_collection_interval),
                deadline: Duration::from_secs(common.timeout),
                check,
                ctx,
            });
        }
    }

    instances
}
