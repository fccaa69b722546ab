use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

use crate::luma::LumaMode;

/// Upper bound on concurrently running workers within a batch.
pub const MAX_WORKERS: usize = 100;

/// What a guarded operation does when its timed wait expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ContentionPolicy {
    /// Drop the guarded action, count the drop and keep going.
    Skip,
    /// Wait without a deadline.
    Block,
    /// Surface a contention error to the caller.
    Fail,
}

impl Default for ContentionPolicy {
    fn default() -> Self {
        ContentionPolicy::Skip
    }
}

/// Settings for one analysis run.
///
/// A config file is optional; CLI flags override whatever it supplies.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub mode: LumaMode,
    #[serde(default)]
    pub on_contention: ContentionPolicy,
    #[serde(default = "default_append_timeout_ms")]
    pub append_timeout_ms: u64,
    #[serde(default = "default_report_timeout_ms")]
    pub report_timeout_ms: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// When set, every decoded frame is also written out as a JPEG under
    /// this directory, one subdirectory per clip.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

fn default_append_timeout_ms() -> u64 {
    1
}

fn default_report_timeout_ms() -> u64 {
    1_000
}

fn default_jpeg_quality() -> u8 {
    100
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: LumaMode::default(),
            on_contention: ContentionPolicy::default(),
            append_timeout_ms: default_append_timeout_ms(),
            report_timeout_ms: default_report_timeout_ms(),
            jpeg_quality: default_jpeg_quality(),
            export_dir: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AnalyzerConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML: {}", path.display()))?;
        Ok(config)
    }

    pub fn append_timeout(&self) -> Duration {
        Duration::from_millis(self.append_timeout_ms)
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_millis(self.report_timeout_ms)
    }
}
