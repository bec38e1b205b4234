//! Per-file orchestration and batch aggregation.
//!
//! Each file runs `Preprocess → Transcribe → Align → features`. Feature
//! groups are independent: a failing group leaves its metrics null and is
//! reported as a [`StageFailure`], sibling groups still run. Aggregation
//! happens once, after every file has finished.

pub mod pool;
pub mod record;
pub mod schema;
pub mod table;

use std::any::Any;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::unsync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::audio::decoder::is_audio_file;
use crate::audio::encoder::write_wav;
use crate::audio::Preprocessor;
use crate::config::AnalysisConfig;
use crate::engine::{
    AcousticEngine, FormantContour, IntensityContour, JitterKind, PitchContour, ShimmerKind,
};
use crate::error::{AnalysisError, Result};
use crate::features::cepstral::mfcc_summary;
use crate::features::dispersion::{aavs, hull_area};
use crate::features::lexical::lexical_metrics;
use crate::features::prosody::{
    harmonicity_summary, intensity_summary, pitch_period_entropy, pitch_summary, voiced_range,
    JITTER_KINDS, SHIMMER_KINDS,
};
use crate::features::timing::{
    average_pause_duration, interword_pauses, intensity_threshold, phonation_time,
    syllable_nuclei, transcript_speech_rate, RateUnit, SpeechRate,
};
use crate::features::vai::vowel_articulation_index;
use crate::features::{DensityFilter, FormantTrajectory, LexiconTagger, PosTagger};
use crate::transcription::{Alignment, Transcriber};
use crate::types::AudioData;

pub use record::{MetricRecord, MfccSummary};
pub use schema::FeatureSchema;
pub use table::FeatureTable;

const PROCESSING_SUFFIXES: [&str; 2] = ["_temp_preprocessed", "_preprocessed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preprocess,
    Transcribe,
    Align,
    Formants,
    Pitch,
    Intensity,
    Harmonicity,
    Perturbation,
    Timing,
    Vai,
    Lexical,
    Cepstral,
}

impl Stage {
    pub const FEATURE_GROUPS: [Stage; 9] = [
        Stage::Formants,
        Stage::Pitch,
        Stage::Intensity,
        Stage::Harmonicity,
        Stage::Perturbation,
        Stage::Timing,
        Stage::Vai,
        Stage::Lexical,
        Stage::Cepstral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Transcribe => "transcribe",
            Stage::Align => "align",
            Stage::Formants => "formants",
            Stage::Pitch => "pitch",
            Stage::Intensity => "intensity",
            Stage::Harmonicity => "harmonicity",
            Stage::Perturbation => "perturbation",
            Stage::Timing => "timing",
            Stage::Vai => "vai",
            Stage::Lexical => "lexical",
            Stage::Cepstral => "cepstral",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: AnalysisError,
}

/// Result of one file. Every variant but `Skipped` carries a full record.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Completed {
        name: String,
        record: MetricRecord,
    },
    /// Some feature groups failed; their metrics are null.
    Partial {
        name: String,
        record: MetricRecord,
        failures: Vec<StageFailure>,
    },
    /// Transcription or alignment failed; every metric is null.
    Failed {
        name: String,
        record: MetricRecord,
        failures: Vec<StageFailure>,
    },
    /// Input rejected before analysis; no record is emitted.
    Skipped { name: String, reason: AnalysisError },
}

impl FileOutcome {
    pub fn name(&self) -> &str {
        match self {
            FileOutcome::Completed { name, .. }
            | FileOutcome::Partial { name, .. }
            | FileOutcome::Failed { name, .. }
            | FileOutcome::Skipped { name, .. } => name,
        }
    }

    pub fn record(&self) -> Option<&MetricRecord> {
        match self {
            FileOutcome::Completed { record, .. }
            | FileOutcome::Partial { record, .. }
            | FileOutcome::Failed { record, .. } => Some(record),
            FileOutcome::Skipped { .. } => None,
        }
    }

    pub fn failures(&self) -> &[StageFailure] {
        match self {
            FileOutcome::Partial { failures, .. } | FileOutcome::Failed { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// Basename without extension or processing suffixes.
pub fn canonical_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in PROCESSING_SUFFIXES {
        if let Some(base) = stem.strip_suffix(suffix) {
            return base.to_string();
        }
    }
    stem
}

fn is_processing_artifact(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy())
        .is_some_and(|stem| PROCESSING_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix)))
}

/// Expands directories (non-recursively) into their audio files, sorted by
/// path. Files named explicitly are kept as given.
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|candidate| candidate.is_file() && is_audio_file(candidate))
                .filter(|candidate| !is_processing_artifact(candidate))
                .collect();
            found.sort();
            debug!(dir = %path.display(), files = found.len(), "scanned input directory");
            inputs.extend(found);
        } else if path.is_file() {
            inputs.push(path.clone());
        } else {
            return Err(AnalysisError::Io(format!("{}: no such file or directory", path.display())));
        }
    }
    Ok(inputs)
}

/// Merges this run's records into `previous`; a filename seen again keeps
/// only its newest row.
pub fn aggregate(schema: &FeatureSchema, outcomes: &[FileOutcome], previous: FeatureTable) -> FeatureTable {
    let records = outcomes
        .iter()
        .filter_map(|outcome| outcome.record().map(|record| (outcome.name(), record)));
    let current = FeatureTable::from_records(schema, records);
    previous.merge(current)
}

/// Shared handles for a batch. Cloning is cheap; every collaborator is
/// behind an `Arc` so workers share one engine and one transcriber.
#[derive(Clone)]
pub struct Pipeline {
    engine: Arc<dyn AcousticEngine>,
    transcriber: Arc<dyn Transcriber>,
    preprocessor: Arc<dyn Preprocessor>,
    tagger: Arc<dyn PosTagger>,
    config: AnalysisConfig,
    artifacts_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        engine: Arc<dyn AcousticEngine>,
        transcriber: Arc<dyn Transcriber>,
        preprocessor: Arc<dyn Preprocessor>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            engine,
            transcriber,
            preprocessor,
            tagger: Arc::new(LexiconTagger),
            config,
            artifacts_dir: None,
        }
    }

    pub fn with_tagger(mut self, tagger: Arc<dyn PosTagger>) -> Self {
        self.tagger = tagger;
        self
    }

    /// Writes the preprocessed WAV, transcript and alignment of every file
    /// under `dir`. Artifacts are never read back.
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Processes every input on a bounded pool; outcomes keep input order.
    pub fn run(&self, inputs: &[PathBuf], jobs: usize) -> Result<Vec<FileOutcome>> {
        info!(files = inputs.len(), jobs, "starting batch");
        pool::run_pool(inputs, jobs, |path| self.process_file(path))
    }

    pub fn process_file(&self, path: &Path) -> FileOutcome {
        let name = canonical_filename(path);

        let audio = match guarded(Stage::Preprocess, &name, || self.preprocessor.preprocess(path)) {
            Ok(audio) => audio,
            Err(err) => return self.reject_or_fail(name, Stage::Preprocess, err),
        };
        debug!(file = %name, duration = audio.duration_secs(), "preprocessed");
        self.write_artifact(&name, "wav", |path| write_wav(&audio, path));

        let transcript = match guarded(Stage::Transcribe, &name, || self.transcriber.transcribe(&name, &audio)) {
            Ok(transcript) => transcript,
            Err(err) => return self.reject_or_fail(name, Stage::Transcribe, err),
        };
        self.write_artifact(&name, "txt", |path| Ok(fs::write(path, &transcript)?));

        let alignment = match guarded(Stage::Align, &name, || self.transcriber.align(&name, &audio, &transcript)) {
            Ok(alignment) => alignment,
            Err(err) => return self.reject_or_fail(name, Stage::Align, err),
        };
        self.write_artifact(&name, "json", |path| {
            let json = serde_json::to_string_pretty(&alignment)
                .map_err(|err| AnalysisError::Io(err.to_string()))?;
            Ok(fs::write(path, json)?)
        });

        let analysis = FileAnalysis::new(self, &audio, &transcript, &alignment);
        let mut record = MetricRecord::default();
        let mut failures = Vec::new();
        for stage in Stage::FEATURE_GROUPS {
            if let Err(error) = guarded(stage, &name, || analysis.compute(stage, &mut record)) {
                warn!(file = %name, stage = %stage, error = %error, "feature group failed");
                failures.push(StageFailure { stage, error });
            }
        }
        record.sanitize();

        info!(
            file = %name,
            defined = record.defined_count(),
            failed_groups = failures.len(),
            "file analysed"
        );
        if failures.is_empty() {
            FileOutcome::Completed { name, record }
        } else {
            FileOutcome::Partial {
                name,
                record,
                failures,
            }
        }
    }

    fn reject_or_fail(&self, name: String, stage: Stage, error: AnalysisError) -> FileOutcome {
        if error.is_input_rejection() {
            info!(file = %name, stage = %stage, reason = %error, "skipping file");
            FileOutcome::Skipped { name, reason: error }
        } else {
            warn!(file = %name, stage = %stage, error = %error, "file failed, emitting null record");
            FileOutcome::Failed {
                name,
                record: MetricRecord::default(),
                failures: vec![StageFailure { stage, error }],
            }
        }
    }

    fn write_artifact(&self, name: &str, extension: &str, write: impl FnOnce(&Path) -> Result<()>) {
        let Some(dir) = &self.artifacts_dir else {
            return;
        };
        let path = dir.join(format!("{name}.{extension}"));
        let result = fs::create_dir_all(dir).map_err(AnalysisError::from).and_then(|_| write(&path));
        if let Err(err) = result {
            warn!(file = %name, path = %path.display(), error = %err, "failed to write artifact");
        }
    }
}

/// Runs one stage, turning a panic in it into a stage error so the rest of
/// the batch is unaffected.
fn guarded<T>(stage: Stage, name: &str, work: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(file = %name, stage = %stage, panic = %message, "stage panicked");
        Err(AnalysisError::Panicked(message))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Null on a metric-local failure, propagate anything else.
fn local(result: Result<f64>) -> Result<Option<f64>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_metric_local() => {
            debug!(error = %err, "metric undefined");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Engine contours for one file, each computed at most once and shared by
/// every group that needs it.
struct FileAnalysis<'a> {
    pipeline: &'a Pipeline,
    audio: &'a AudioData,
    transcript: &'a str,
    alignment: &'a Alignment,
    formants: OnceCell<Result<FormantContour>>,
    pitch: OnceCell<Result<PitchContour>>,
    intensity: OnceCell<Result<IntensityContour>>,
}

impl<'a> FileAnalysis<'a> {
    fn new(pipeline: &'a Pipeline, audio: &'a AudioData, transcript: &'a str, alignment: &'a Alignment) -> Self {
        Self {
            pipeline,
            audio,
            transcript,
            alignment,
            formants: OnceCell::new(),
            pitch: OnceCell::new(),
            intensity: OnceCell::new(),
        }
    }

    fn engine(&self) -> &dyn AcousticEngine {
        self.pipeline.engine.as_ref()
    }

    fn config(&self) -> &AnalysisConfig {
        &self.pipeline.config
    }

    fn formant_contour(&self) -> Result<&FormantContour> {
        self.formants
            .get_or_init(|| {
                let settings = self.config().formants.engine_settings();
                self.engine().formants(self.audio, &settings)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn pitch_contour(&self) -> Result<&PitchContour> {
        self.pitch
            .get_or_init(|| {
                let pitch = &self.config().pitch;
                self.engine().pitch(self.audio, pitch.floor_hz, pitch.ceiling_hz)
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    fn intensity_contour(&self) -> Result<&IntensityContour> {
        self.intensity
            .get_or_init(|| self.engine().intensity(self.audio, self.config().pitch.floor_hz))
            .as_ref()
            .map_err(Clone::clone)
    }

    fn compute(&self, stage: Stage, record: &mut MetricRecord) -> Result<()> {
        match stage {
            Stage::Formants => self.formant_dispersion(record),
            Stage::Pitch => self.pitch_statistics(record),
            Stage::Intensity => self.intensity_statistics(record),
            Stage::Harmonicity => self.harmonicity_statistics(record),
            Stage::Perturbation => self.perturbation(record),
            Stage::Timing => self.timing(record),
            Stage::Vai => self.vowel_articulation(record),
            Stage::Lexical => {
                self.lexical(record);
                Ok(())
            }
            Stage::Cepstral => self.cepstral(record),
            Stage::Preprocess | Stage::Transcribe | Stage::Align => Ok(()),
        }
    }

    fn formant_dispersion(&self, record: &mut MetricRecord) -> Result<()> {
        let config = self.config();
        let contour = self.formant_contour()?;
        let trajectory = FormantTrajectory::from_contour(contour, config.formants.time_step);
        let filtered = DensityFilter::new(config.clustering.clone()).filter(&trajectory)?;
        let cloud = filtered.cloud(config.formants.dispersion_space);
        record.aavs = local(aavs(cloud.view()))?;
        record.hull_area = Some(hull_area(cloud.view(), &config.clustering)?);
        Ok(())
    }

    fn pitch_statistics(&self, record: &mut MetricRecord) -> Result<()> {
        let contour = self.pitch_contour()?;
        let summary = pitch_summary(contour)?;
        record.ff_mean = Some(summary.mean);
        record.ff_median = Some(summary.median);
        record.ff_std = Some(summary.std);
        record.ff_min = Some(summary.min);
        record.ff_max = Some(summary.max);
        record.ppe = local(pitch_period_entropy(&contour.voiced_frequencies()))?;
        Ok(())
    }

    fn intensity_statistics(&self, record: &mut MetricRecord) -> Result<()> {
        let summary = intensity_summary(self.intensity_contour()?)?;
        record.inten_mean = Some(summary.mean);
        record.inten_median = Some(summary.median);
        record.inten_std = Some(summary.std);
        record.inten_min = Some(summary.min);
        record.inten_max = Some(summary.max);
        Ok(())
    }

    fn harmonicity_statistics(&self, record: &mut MetricRecord) -> Result<()> {
        let contour = self.engine().harmonicity(self.audio, self.config().pitch.floor_hz)?;
        let stats = harmonicity_summary(&contour)?;
        record.harm_mean = Some(stats.mean);
        record.harm_std = Some(stats.std);
        record.harm_min = Some(stats.min);
        record.harm_max = Some(stats.max);
        Ok(())
    }

    fn perturbation(&self, record: &mut MetricRecord) -> Result<()> {
        let (floor, ceiling) = voiced_range(self.pitch_contour()?)?;
        let points = self.engine().point_process(self.audio, floor, ceiling)?;
        let params = &self.config().perturbation;
        for kind in SHIMMER_KINDS {
            *shimmer_slot(record, kind) = local(self.engine().shimmer(self.audio, &points, kind, params))?;
        }
        for kind in JITTER_KINDS {
            *jitter_slot(record, kind) = local(self.engine().jitter(&points, kind, params))?;
        }
        Ok(())
    }

    fn timing(&self, record: &mut MetricRecord) -> Result<()> {
        let config = self.config();
        let segments = &self.alignment.segments;
        let pauses = interword_pauses(segments);
        record.average_pause_duration = Some(average_pause_duration(&pauses, config.timing.pause_outlier_sigma));
        record.speech_rate_word = Some(transcript_speech_rate(segments, RateUnit::Word));
        record.speech_rate_syllable = Some(transcript_speech_rate(segments, RateUnit::Syllable));

        let rate_config = &config.speech_rate;
        let intensity = self.intensity_contour()?;
        let pitch = self.pitch_contour()?;
        let threshold = intensity_threshold(intensity, rate_config.silence_threshold_db).ok_or(
            AnalysisError::InsufficientData {
                required: 1,
                actual: 0,
            },
        )?;
        let tier = self.engine().silences(
            intensity,
            threshold,
            rate_config.min_pause_secs,
            rate_config.min_sounding_secs,
        )?;
        let nuclei = syllable_nuclei(intensity, pitch, threshold, rate_config.min_dip_db);
        let rate = SpeechRate::from_counts(nuclei.len(), self.audio.duration_secs(), phonation_time(&tier));
        debug!(
            syllables = rate.syllables,
            phonation = rate.phonation_time,
            "speech rate"
        );
        record.speech_rate = Some(rate.speaking_rate);
        record.articulation_rate = Some(rate.articulation_rate);
        record.average_syllable_duration = Some(rate.average_syllable_duration);
        Ok(())
    }

    fn vowel_articulation(&self, record: &mut MetricRecord) -> Result<()> {
        if self.alignment.phones.is_empty() {
            record.vai = None;
            return Ok(());
        }
        let contour = self.formant_contour()?;
        record.vai = local(vowel_articulation_index(
            contour,
            &self.alignment.phones,
            self.config().formants.vowel_sample_points,
        ))?;
        Ok(())
    }

    fn lexical(&self, record: &mut MetricRecord) {
        let metrics = lexical_metrics(
            &self.transcript.to_lowercase(),
            &self.config().lexical,
            self.pipeline.tagger.as_ref(),
        );
        record.avg_word_length = metrics.avg_word_length;
        record.avg_syllables_per_word = metrics.avg_syllables_per_word;
        record.content_richness = metrics.content_richness;
        record.mattr = metrics.mattr;
        record.phrase_patterns = metrics.phrase_patterns;
        record.sentence_length = metrics.sentence_length;
    }

    fn cepstral(&self, record: &mut MetricRecord) -> Result<()> {
        let summaries = mfcc_summary(self.audio)?;
        record.mfcc = summaries.map(MfccSummary::from);
        Ok(())
    }
}

fn jitter_slot(record: &mut MetricRecord, kind: JitterKind) -> &mut Option<f64> {
    match kind {
        JitterKind::Local => &mut record.jitter_local,
        JitterKind::LocalAbsolute => &mut record.jitter_local_absolute,
        JitterKind::Rap => &mut record.jitter_rap,
        JitterKind::Ppq5 => &mut record.jitter_ppq5,
    }
}

fn shimmer_slot(record: &mut MetricRecord, kind: ShimmerKind) -> &mut Option<f64> {
    match kind {
        ShimmerKind::Local => &mut record.shimmer_local,
        ShimmerKind::LocalDb => &mut record.shimmer_local_db,
        ShimmerKind::Apq3 => &mut record.shimmer_apq3,
        ShimmerKind::Apq5 => &mut record.shimmer_apq5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_drop_processing_suffixes() {
        assert_eq!(canonical_filename(Path::new("/data/p01_preprocessed.wav")), "p01");
        assert_eq!(canonical_filename(Path::new("p01_temp_preprocessed.mp3")), "p01");
        assert_eq!(canonical_filename(Path::new("dir/p01.flac")), "p01");
        assert_eq!(canonical_filename(Path::new("a.b.wav")), "a.b");
    }

    #[test]
    fn discovery_skips_intermediate_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.wav", "a.mp3", "a_preprocessed.wav", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let found = discover_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp3", "b.wav"]);
        assert!(discover_inputs(&[dir.path().join("missing.wav")]).is_err());
    }

    #[test]
    fn metric_local_errors_become_null() {
        assert_eq!(local(Ok(1.0)).unwrap(), Some(1.0));
        assert_eq!(local(Err(AnalysisError::Undefined("vai"))).unwrap(), None);
        assert!(local(Err(AnalysisError::DegenerateHull)).is_err());
    }

    #[test]
    fn panicking_stage_becomes_an_error() {
        let result: Result<f64> = guarded(Stage::Pitch, "p01", || panic!("tracker blew up"));
        assert_eq!(result, Err(AnalysisError::Panicked("tracker blew up".into())));
        let formatted: Result<f64> = guarded(Stage::Pitch, "p01", || panic!("frame {}", 3));
        assert_eq!(formatted, Err(AnalysisError::Panicked("frame 3".into())));
        assert_eq!(guarded(Stage::Pitch, "p01", || Ok(2.0)), Ok(2.0));
    }

    #[test]
    fn skipped_outcomes_carry_no_record() {
        let skipped = FileOutcome::Skipped {
            name: "x".into(),
            reason: AnalysisError::TooShort {
                duration: 0.1,
                minimum: 0.5,
            },
        };
        assert!(skipped.record().is_none());
        assert!(skipped.failures().is_empty());
        let schema = FeatureSchema::builtin().unwrap();
        assert!(aggregate(&schema, &[skipped], FeatureTable::default()).is_empty());
    }
}
