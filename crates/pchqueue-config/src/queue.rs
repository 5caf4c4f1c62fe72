//! Queue configuration parsing.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode};
use pchqueue_core::StaticEnvironment;
use serde::{Deserialize, Serialize};
use std::num::NonZero;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Settings for the PCH task queue and its two schedulers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Concurrent system PCH generations.
    pub system_slots: usize,
    /// Concurrent project PCH generations.
    pub project_slots: usize,
    /// How often the queue dispatches pending tasks when nothing completes.
    pub tick_interval: Duration,
    /// Handed to every task before it is generated.
    pub pre_include_search_path: String,
    /// Where generated PCHs are written.
    pub output_dir: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(NonZero::get)
            .unwrap_or(1);
        Self {
            system_slots: parallelism,
            project_slots: parallelism,
            tick_interval: DEFAULT_TICK_INTERVAL,
            pre_include_search_path: String::new(),
            output_dir: std::env::temp_dir().join("pch"),
        }
    }
}

impl QueueConfig {
    /// Environment that hands the configured values to tasks.
    pub fn environment(&self) -> StaticEnvironment {
        StaticEnvironment::new(self.pre_include_search_path.clone())
    }
}

/// Read and parse a queue configuration file.
pub fn load_queue_config(path: impl AsRef<Path>) -> ConfigResult<QueueConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_queue_config(&content)
}

/// Parse a queue configuration from KDL text. Every node is optional.
pub fn parse_queue_config(kdl: &str) -> ConfigResult<QueueConfig> {
    let doc: KdlDocument = kdl.parse()?;

    let mut config = QueueConfig::default();
    let mut seen_scheduler = false;
    let mut seen_environment = false;

    for node in doc.nodes() {
        match node.name().value() {
            "scheduler" => {
                if seen_scheduler {
                    return Err(ConfigError::Duplicate("scheduler".to_string()));
                }
                seen_scheduler = true;
                parse_scheduler(node, &mut config)?;
            }
            "environment" => {
                if seen_environment {
                    return Err(ConfigError::Duplicate("environment".to_string()));
                }
                seen_environment = true;
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        if let "pre-include-search-path" | "pre_include_search_path" =
                            child.name().value()
                        {
                            config.pre_include_search_path =
                                get_first_string_arg(child).ok_or_else(|| {
                                    ConfigError::MissingField(
                                        "environment pre-include-search-path".to_string(),
                                    )
                                })?;
                        }
                    }
                }
            }
            "output-dir" | "output_dir" => {
                let dir = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("output-dir path".to_string()))?;
                config.output_dir = PathBuf::from(dir);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(config)
}

fn parse_scheduler(node: &KdlNode, config: &mut QueueConfig) -> ConfigResult<()> {
    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "system-slots" | "system_slots" => {
                config.system_slots = get_positive_int_arg(child, "system-slots")?;
            }
            "project-slots" | "project_slots" => {
                config.project_slots = get_positive_int_arg(child, "project-slots")?;
            }
            "tick-interval-ms" | "tick_interval_ms" => {
                let millis = get_positive_int_arg(child, "tick-interval-ms")?;
                config.tick_interval = Duration::from_millis(millis as u64);
            }
            _ => {}
        }
    }

    Ok(())
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_positive_int_arg(node: &KdlNode, field: &str) -> ConfigResult<usize> {
    let value = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .ok_or_else(|| ConfigError::MissingField(field.to_string()))?
        .value();

    let number = value.as_integer().ok_or_else(|| ConfigError::InvalidValue {
        field: field.to_string(),
        message: format!("expected an integer, got {}", value),
    })?;

    match usize::try_from(number) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("must be at least 1, got {}", number),
        }),
    }
}
