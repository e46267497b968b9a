use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::narrative::anchors::AnchorSeeds;

/// Target words analyzed when none are configured.
pub const DEFAULT_TARGET_WORDS: &[&str] = &["真相", "复杂", "理解", "公正"];

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. CLI flags override
/// individual values after loading.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding model.onnx and tokenizer.json
    pub model_dir: PathBuf,
    /// Where CSV reports are written
    pub output_dir: PathBuf,
    /// Optional JSON file with personal/structural seed lists
    pub seeds_path: Option<PathBuf>,
    pub target_words: Vec<String>,
    /// Characters kept on each side of an occurrence
    pub window_radius: usize,
    pub batch_size: usize,
    pub max_seq_len: usize,
    /// Minimum similarity for two topics to count as aligned
    pub threshold: f64,
    /// Keywords listed per topic
    pub top_k: usize,
}

/// Default model location: `<data_dir>/framelens/models`.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("framelens")
        .join("models")
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

fn parse_word_list(raw: &str) -> Vec<String> {
    raw.split([',', '，'])
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Every value has a default; malformed numbers are an error.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("FRAMELENS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_dir());

        let target_words = env::var("FRAMELENS_TARGET_WORDS")
            .map(|raw| parse_word_list(&raw))
            .ok()
            .filter(|words| !words.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_WORDS.iter().map(|w| w.to_string()).collect());

        let config = Self {
            model_dir,
            output_dir: env::var("FRAMELENS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./output")),
            seeds_path: env::var("FRAMELENS_SEEDS").ok().map(PathBuf::from),
            target_words,
            window_radius: parse_var("FRAMELENS_WINDOW_RADIUS", 250)?,
            batch_size: parse_var("FRAMELENS_BATCH_SIZE", 32)?,
            max_seq_len: parse_var("FRAMELENS_MAX_SEQ_LEN", 512)?,
            threshold: parse_var("FRAMELENS_THRESHOLD", 0.75)?,
            top_k: parse_var("FRAMELENS_TOP_K", 10)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run can work with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("Batch size must be at least 1 (FRAMELENS_BATCH_SIZE or --batch-size)");
        }
        if self.max_seq_len < 3 {
            anyhow::bail!("FRAMELENS_MAX_SEQ_LEN must leave room for at least one token");
        }
        if !self.threshold.is_finite() {
            anyhow::bail!("Alignment threshold must be a finite number");
        }
        if self.target_words.iter().any(|w| w.is_empty()) {
            anyhow::bail!("Target words must be non-empty");
        }
        Ok(())
    }

    /// Check that the model files exist before a run needs them.
    pub fn require_model(&self) -> Result<()> {
        if !crate::oracle::onnx::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Encoder model files not found in {}\n\
                 Export a BERT-style encoder to ONNX and place {} and {} there,\n\
                 or set FRAMELENS_MODEL_DIR to the directory that holds them.",
                self.model_dir.display(),
                crate::oracle::onnx::MODEL_FILE,
                crate::oracle::onnx::TOKENIZER_FILE
            );
        }
        Ok(())
    }

    /// Seed lists from FRAMELENS_SEEDS, or the built-in lists.
    pub fn anchor_seeds(&self) -> Result<AnchorSeeds> {
        match &self.seeds_path {
            Some(path) => AnchorSeeds::load(path),
            None => Ok(AnchorSeeds::default()),
        }
    }

    /// Resolve a report path: explicit paths win, otherwise `name` inside
    /// the output directory.
    pub fn report_path(&self, explicit: Option<&Path>, name: &str) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.output_dir.join(name))
    }
}
