// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::HashMap;

use anyhow::{Result, bail};
use serde_yaml::Value;

use crate::check::Check;
use crate::exec_check;

/// Builds a configured check instance from the file-level `init_config` and
/// one raw instance mapping. Fails if the configuration does not validate.
pub type CheckFactory = fn(init_config: &Value, instance: &Value) -> Result<Box<dyn Check>>;

/// Explicit check name -> factory mapping. Built once at startup and owned by
/// the daemon; there is no ambient global registration.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, CheckFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn with_builtin_checks() -> Self {
        let mut registry = Self::new();
        registry.register(exec_check::CHECK_NAME, exec_check::factory);
        registry
    }

    pub fn register(&mut self, name: &str, factory: CheckFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(
        &self,
        name: &str,
        init_config: &Value,
        instance: &Value,
    ) -> Result<Box<dyn Check>> {
        match self.factories.get(name) {
            Some(factory) => factory(init_config, instance),
            None => bail!("no check named '{name}' is registered"),
        }
    }
}
