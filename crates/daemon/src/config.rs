// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: TOML with `$VAR` expansion

use sb_core::{parse_schedule, Route, ScheduleError};
use sb_engine::TaskSpec;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("route has no name")]
    UnnamedRoute,

    #[error("duplicate route name: {0}")]
    DuplicateRoute(String),

    #[error("route {0} has no source")]
    MissingSource(String),

    #[error("route {0} has no sink plugin")]
    MissingSink(String),

    #[error("supervisor task {name} has an invalid schedule: {source}")]
    InvalidSchedule { name: String, source: ScheduleError },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub routes: Vec<Route>,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// Raw per-plugin config blobs, keyed by plugin name. Opaque here;
    /// handed to each plugin's init.
    #[serde(default)]
    pub plugins: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { address: default_address() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

fn default_database() -> String {
    "switchboard.db".to_string()
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&raw)
    }

    /// Parse after `$VAR`/`${VAR}` expansion, then validate.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(&expand_env(raw))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for route in &self.routes {
            if route.name.is_empty() {
                return Err(ConfigError::UnnamedRoute);
            }
            if !names.insert(route.name.as_str()) {
                return Err(ConfigError::DuplicateRoute(route.name.clone()));
            }
            if route.source.is_empty() {
                return Err(ConfigError::MissingSource(route.name.clone()));
            }
            if route.sink.plugin.is_empty() {
                return Err(ConfigError::MissingSink(route.name.clone()));
            }
        }
        for task in &self.supervisor.tasks {
            parse_schedule(&task.schedule).map_err(|source| ConfigError::InvalidSchedule {
                name: task.name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Plugin blobs as JSON values, the shape `init` receives.
    pub fn plugin_configs(&self) -> HashMap<String, serde_json::Value> {
        self.plugins
            .iter()
            .map(|(name, value)| {
                let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                (name.clone(), json)
            })
            .collect()
    }
}

/// Substitute `$VAR` and `${VAR}` from the process environment. Missing
/// variables expand to the empty string; a `$` not followed by a name is
/// kept as-is.
pub fn expand_env(input: &str) -> String {
    expand_env_with(input, |name| std::env::var(name).ok())
}

fn expand_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if closed {
                    out.push_str(&lookup(&name).unwrap_or_default());
                } else {
                    // Unterminated brace; keep the literal text.
                    out.push_str("${");
                    out.push_str(&name);
                }
            }
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                let mut name = String::new();
                while let Some(c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || *c == '_' {
                        name.push(*c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&lookup(&name).unwrap_or_default());
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
