// Application configuration
// Loaded once at startup and passed by reference into the worker and service.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Compute device used by the model-backed stages.
///
/// Selection is an explicit configuration value, never auto-detected at
/// runtime. The worker injects it into every stage client at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

impl Default for Device {
    fn default() -> Self {
        Device::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda => write!(f, "cuda"),
        }
    }
}

/// Configuration for the external summarization service (Ollama-style API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub model: String,
    /// Bounded timeout for the single minutes-generation call
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.3:70b".to_string(),
            timeout_secs: 600,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory for the database, uploaded audio and artifacts
    pub data_dir: PathBuf,
    /// Length of each processing chunk in seconds
    pub chunk_length_secs: u32,
    /// Sample rate all input audio is normalized to before chunking
    pub sample_rate: u32,
    /// Jobs (and their files) older than this are removed by the cleanup sweep
    pub retention_days: i64,
    /// Compute device for the model-backed stages
    pub device: Device,
    /// Summarization service settings
    pub summarizer: SummarizerConfig,
    /// Fallback average job duration used for wait estimates before any
    /// job has completed
    pub default_job_duration_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meetscribe");

        Self {
            data_dir,
            chunk_length_secs: 60,
            sample_rate: 16_000,
            retention_days: 30,
            device: Device::Cpu,
            summarizer: SummarizerConfig::default(),
            default_job_duration_secs: 300,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, filling missing fields with defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chunk_length_secs == 0 {
            anyhow::bail!("chunk_length_secs must be greater than 0");
        }
        if self.sample_rate == 0 {
            anyhow::bail!("sample_rate must be greater than 0");
        }
        if self.retention_days <= 0 {
            anyhow::bail!("retention_days must be greater than 0");
        }
        if self.summarizer.timeout_secs == 0 {
            anyhow::bail!("summarizer.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    /// Directory where uploaded source audio files are stored
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Directory where transcript and minutes artifacts are written
    pub fn outputs_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }

    /// Path of the SQLite job database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("meetscribe.db")
    }
}
