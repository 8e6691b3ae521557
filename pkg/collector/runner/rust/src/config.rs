// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use serde_yaml::Value;

const DEFAULT_CONFIG_DIR: &str = "/etc/datadog-agent/checks.d";

/// Default seconds between two collections of one instance.
pub const DEFAULT_COLLECTION_INTERVAL: u64 = 15;
/// Default seconds a single run may take before it is abandoned.
pub const DEFAULT_CHECK_TIMEOUT: u64 = 30;

fn default_interval() -> u64 {
    DEFAULT_COLLECTION_INTERVAL
}

fn default_timeout() -> u64 {
    DEFAULT_CHECK_TIMEOUT
}

/// One per-check configuration file: shared `init_config` plus one raw YAML
/// mapping per instance. Instance fields stay untyped here; each check
/// factory deserializes them into its own validated struct.
#[derive(Debug, Deserialize)]
pub struct CheckFile {
    #[serde(default)]
    pub init_config: Value,
    #[serde(default)]
    pub instances: Vec<Value>,
}

/// Scheduling options every instance recognizes regardless of check type.
#[derive(Debug, Deserialize)]
pub struct CommonOptions {
    #[serde(default = "default_interval")]
    pub min_collection_interval: u64,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    pub name: Option<String>,
}

impl CommonOptions {
    pub fn parse(instance: &Value) -> Result<Self> {
        serde_yaml::from_value(instance.clone()).context("parsing common instance options")
    }
}

pub fn config_dir() -> PathBuf {
    std::env::var("DD_CHECKS_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR))
}

/// Scan a directory for `*.yaml` files and parse each into a CheckFile.
/// The check name is derived from the filename (without extension).
/// Files that fail to parse are logged and skipped.
pub fn load_check_files(dir: &Path) -> Result<Vec<(String, CheckFile)>> {
    let mut configs = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read config directory: {}", dir.display()))?;

    let mut yaml_files: Vec<_> = entries
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|e| {
            let is_yaml = e
                .path()
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if !is_yaml {
                debug!("skipping non-YAML file: {}", e.path().display());
            }
            is_yaml
        })
        .collect();

    yaml_files.sort_by_key(|e| e.file_name());

    for entry in yaml_files {
        let path = entry.path();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        match parse_check_file(&path) {
            Ok(config) => configs.push((name, config)),
            Err(e) => warn!("skipping {}: {e:#}", path.display()),
        }
    }

    Ok(configs)
}

fn parse_check_file(path: &Path) -> Result<CheckFile> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: CheckFile =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}
