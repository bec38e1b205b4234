use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use voicemarkers::audio::NativePreprocessor;
use voicemarkers::cli::Args;
use voicemarkers::config::{load_feature_schema, AnalysisConfig};
use voicemarkers::engine::native::NativeEngine;
use voicemarkers::pipeline::{self, pool, FeatureTable, FileOutcome, Pipeline};
use voicemarkers::transcription::{SidecarTranscriber, Transcriber};

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    args.validate()
        .context("Failed to validate command-line arguments")?;

    let mut config = AnalysisConfig::from_override(args.config.as_deref())
        .context("Failed to load analysis configuration")?;
    args.apply_overrides(&mut config);

    let schema = load_feature_schema(args.feature_list.as_deref())?;
    info!(metrics = schema.len(), "feature list loaded");

    let inputs = pipeline::discover_inputs(&args.inputs).context("Failed to collect inputs")?;
    if inputs.is_empty() {
        warn!("no audio files found");
    }

    let jobs = config.jobs.unwrap_or_else(pool::default_jobs);
    let transcriber = build_transcriber(&args)?;
    let preprocessor = Arc::new(NativePreprocessor::new(config.preprocess.clone()));
    let mut runner = Pipeline::new(Arc::new(NativeEngine::new()), transcriber, preprocessor, config);
    if let Some(dir) = &args.artifacts_dir {
        runner = runner.with_artifacts_dir(dir);
    }

    // an unreadable table must fail before any file is analysed
    let previous = FeatureTable::load(&args.output)
        .with_context(|| format!("Failed to read existing table {:?}", args.output))?;

    let outcomes = runner.run(&inputs, jobs).context("Analysis batch failed")?;
    report(&outcomes);

    let table = pipeline::aggregate(&schema, &outcomes, previous);
    table
        .save(&args.output)
        .with_context(|| format!("Failed to write feature table {:?}", args.output))?;
    info!(rows = table.len(), output = %args.output.display(), "feature table written");
    Ok(())
}

fn build_transcriber(args: &Args) -> Result<Arc<dyn Transcriber>> {
    if let Some(dir) = &args.alignment_dir {
        return Ok(Arc::new(SidecarTranscriber::new(dir)));
    }
    match &args.whisper_model {
        #[cfg(feature = "whisper")]
        Some(model) => Ok(Arc::new(voicemarkers::transcription::WhisperTranscriber::new(model))),
        #[cfg(not(feature = "whisper"))]
        Some(_) => bail!("--whisper-model requires building with the `whisper` feature"),
        None => bail!("No transcription source configured"),
    }
}

fn report(outcomes: &[FileOutcome]) {
    let (mut completed, mut partial, mut failed, mut skipped) = (0, 0, 0, 0);
    for outcome in outcomes {
        match outcome {
            FileOutcome::Completed { .. } => completed += 1,
            FileOutcome::Partial { .. } => partial += 1,
            FileOutcome::Failed { .. } => failed += 1,
            FileOutcome::Skipped { .. } => skipped += 1,
        }
    }
    info!(completed, partial, failed, skipped, "batch finished");
}
