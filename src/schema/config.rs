//! Run configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Seed;
use crate::compute::{MAX_CONCURRENCY, MIN_CONCURRENCY, RunMode};

/// Largest side whose cell indices fit the kernel's `i32` arithmetic.
pub const MAX_SIDE: usize = 46_340;

/// Top-level run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Lattice side length in cells.
    pub side: usize,
    /// Concurrency level in [1, 6].
    pub concurrency: u8,
    /// Render each generation in the terminal. When false the run is headless.
    pub render: bool,
    /// Last tick executed by a headless run.
    pub tick_final: u64,
    /// Pause between rendered frames, in milliseconds.
    pub frame_delay_ms: u64,
    /// Path to the WGSL transition kernel.
    pub kernel_path: PathBuf,
    /// Kernel entry point.
    pub entry_point: String,
    /// Initial lattice.
    pub seed: Seed,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            side: 24,
            concurrency: 3,
            render: true,
            tick_final: 1000,
            frame_delay_ms: 1000,
            kernel_path: PathBuf::from("kernels/life.wgsl"),
            entry_point: crate::compute::gpu::DEFAULT_ENTRY_POINT.to_string(),
            seed: Seed::default(),
        }
    }
}

impl RunConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Run mode implied by `render`, `tick_final` and `frame_delay_ms`.
    pub fn run_mode(&self) -> RunMode {
        if self.render {
            RunMode::Interactive {
                frame_delay: Duration::from_millis(self.frame_delay_ms),
            }
        } else {
            RunMode::Headless {
                tick_final: self.tick_final,
            }
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.side == 0 || self.side > MAX_SIDE {
            return Err(ConfigError::InvalidSide(self.side));
        }
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::InvalidConcurrency(self.concurrency));
        }
        if self.entry_point.is_empty() {
            return Err(ConfigError::EmptyEntryPoint);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Couldn't read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Lattice side {0} must be on [1,46340]")]
    InvalidSide(usize),
    #[error("Concurrency level {0} must be on [1,6]")]
    InvalidConcurrency(u8),
    #[error("Kernel entry point must not be empty")]
    EmptyEntryPoint,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.side, 24);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.tick_final, 1000);
    }

    #[test]
    fn test_run_mode() {
        let mut config = RunConfig::default();
        assert_eq!(
            config.run_mode(),
            RunMode::Interactive {
                frame_delay: Duration::from_secs(1)
            }
        );

        config.render = false;
        config.tick_final = 7;
        assert_eq!(config.run_mode(), RunMode::Headless { tick_final: 7 });
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = RunConfig {
            side: 0,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSide(0))));

        let config = RunConfig {
            side: MAX_SIDE + 1,
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSide(46_341))
        ));
        let config = RunConfig {
            side: MAX_SIDE,
            ..RunConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = RunConfig {
            concurrency: 7,
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency(7))
        ));

        let config = RunConfig {
            entry_point: String::new(),
            ..RunConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyEntryPoint)
        ));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "side": 48, "render": false, "seed": {{ "rng_seed": 1, "density_divisor": 3, "cells": [] }} }}"#).unwrap();

        let config = RunConfig::from_file(file.path()).unwrap();
        assert_eq!(config.side, 48);
        assert!(!config.render);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.seed.density_divisor, 3);
        assert!(config.seed.cells.is_empty());
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            RunConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ side: }").unwrap();
        assert!(matches!(
            RunConfig::from_file(&bad),
            Err(ConfigError::Parse(_))
        ));
    }
}
