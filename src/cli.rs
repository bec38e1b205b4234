use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use crate::config::AnalysisConfig;
use crate::features::DispersionSpace;

/// Voicemarkers - speech biomarker extraction
///
/// Preprocesses each recording, transcribes and aligns it, measures
/// acoustic and lexical features and merges one row per file into a CSV.
#[derive(Parser, Debug)]
#[command(name = "voicemarkers")]
#[command(version)]
#[command(about = "Speech biomarker feature extraction", long_about = None)]
pub struct Args {
    /// Audio files or directories of audio files
    #[arg(value_name = "INPUTS", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Feature table to create or update
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,

    /// JSON analysis configuration
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Canonical feature list (defaults to assets/feature_list.txt)
    #[arg(long, value_name = "TXT")]
    pub feature_list: Option<PathBuf>,

    /// Directory holding <name>.txt transcripts and <name>.json alignments
    #[arg(long, value_name = "DIR", conflicts_with = "whisper_model")]
    pub alignment_dir: Option<PathBuf>,

    /// Whisper GGML model used to transcribe and align
    #[arg(long, value_name = "BIN", conflicts_with = "alignment_dir")]
    pub whisper_model: Option<PathBuf>,

    /// Write preprocessed audio, transcripts and alignments here
    #[arg(long, value_name = "DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Worker threads (defaults to available cores)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Mixture components and k-means clusters
    #[arg(long, value_name = "K")]
    pub clusters: Option<usize>,

    /// Coordinate space for the dispersion metrics
    #[arg(long, value_enum)]
    pub dispersion_space: Option<DispersionSpace>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn validate(&self) -> Result<()> {
        if self.alignment_dir.is_none() && self.whisper_model.is_none() {
            bail!("Provide a transcription source via --alignment-dir or --whisper-model");
        }
        if let Some(dir) = &self.alignment_dir {
            if !dir.is_dir() {
                bail!("Alignment directory does not exist: {:?}", dir);
            }
        }
        if self.jobs == Some(0) {
            bail!("--jobs must be at least 1");
        }
        if self.clusters == Some(0) {
            bail!("--clusters must be at least 1");
        }
        if self.output.is_dir() {
            bail!("Output path is a directory: {:?}", self.output);
        }
        Ok(())
    }

    /// Command-line values take precedence over the configuration file.
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(k) = self.clusters {
            config.clustering.cluster_count = k;
        }
        if let Some(space) = self.dispersion_space {
            config.formants.dispersion_space = space;
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
    }
}
