use std::fs;
use std::path::{Path, PathBuf};

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::policy::Algorithm;
use crate::utils::app_config::AppConfig;
use crate::utils::prelude::*;
use crate::workload::WorkloadConfig;

/// Everything a `run` needs, deserialized from the layered config
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    pub workload: WorkloadConfig,
    /// Round Robin quantum overriding whatever the workload source says
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantum: Option<i64>,
    pub algorithms: Vec<Algorithm>,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    #[serde(default)]
    pub chrome_trace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr, Deserialize, Serialize)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Deserialize)]
pub(crate) struct OutputDir(PathBuf);

impl OutputDir {
    /// Path of `name` inside the output directory, creating the directory if needed
    pub fn file(&self, name: impl AsRef<Path>) -> Result<PathBuf> {
        fs::create_dir_all(&self.0)?;
        Ok(self.0.join(name))
    }
}

pub(crate) trait AppConfigExt {
    fn output_dir(&self) -> Result<OutputDir>;
}

impl AppConfigExt for AppConfig {
    fn output_dir(&self) -> Result<OutputDir> {
        self.get("output_dir")
    }
}
