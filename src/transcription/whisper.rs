//! whisper.cpp-backed transcription.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{AlignedWord, Alignment, AlignmentSegment, Transcriber};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Loads the model on first use and shares it across every file.
pub struct WhisperTranscriber {
    model_path: PathBuf,
    context: OnceCell<WhisperContext>,
}

impl WhisperTranscriber {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            context: OnceCell::new(),
        }
    }

    fn context(&self) -> Result<&WhisperContext> {
        self.context.get_or_try_init(|| {
            info!(model = %self.model_path.display(), "loading whisper model");
            let path = self.model_path.to_string_lossy();
            WhisperContext::new_with_params(&path, WhisperContextParameters::default())
                .map_err(|err| AnalysisError::Transcription(format!("cannot load model: {err}")))
        })
    }

    /// Runs the model and returns `(text, start, end)` per segment, in seconds.
    fn run(&self, audio: &AudioData, word_level: bool) -> Result<Vec<(String, f64, f64)>> {
        if audio.sample_rate != WHISPER_SAMPLE_RATE {
            return Err(AnalysisError::Transcription(format!(
                "expected {WHISPER_SAMPLE_RATE} Hz audio, got {} Hz",
                audio.sample_rate
            )));
        }
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        if word_level {
            params.set_token_timestamps(true);
            params.set_split_on_word(true);
            params.set_max_len(1);
        }

        let fail = |err: whisper_rs::WhisperError| AnalysisError::Transcription(err.to_string());
        let mut state = self.context()?.create_state().map_err(fail)?;
        state.full(params, &audio.samples).map_err(fail)?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let text = segment.to_str().map_err(fail)?.to_string();
            // timestamps are in centiseconds
            let start = segment.start_timestamp() as f64 / 100.0;
            let end = segment.end_timestamp() as f64 / 100.0;
            segments.push((text, start, end));
        }
        Ok(segments)
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, _name: &str, audio: &AudioData) -> Result<String> {
        let text: String = self.run(audio, false)?.into_iter().map(|(text, _, _)| text).collect();
        Ok(text.trim().to_string())
    }

    fn align(&self, _name: &str, audio: &AudioData, _transcript: &str) -> Result<Alignment> {
        let words: Vec<AlignedWord> = self
            .run(audio, true)
            .map_err(|err| AnalysisError::Alignment(err.to_string()))?
            .into_iter()
            .filter(|(text, _, _)| !text.trim().is_empty())
            .map(|(word, start, end)| AlignedWord { word, start, end })
            .collect();
        if words.is_empty() {
            return Err(AnalysisError::Alignment("no words recognised".into()));
        }
        Ok(Alignment {
            segments: group_sentences(words),
            phones: Vec::new(),
        })
    }
}

/// Closes a segment after every word ending in sentence punctuation.
fn group_sentences(words: Vec<AlignedWord>) -> Vec<AlignmentSegment> {
    let mut segments = Vec::new();
    let mut current: Vec<AlignedWord> = Vec::new();
    for word in words {
        let closes = word.word.trim_end().ends_with(['.', '!', '?']);
        current.push(word);
        if closes {
            segments.push(segment_from(std::mem::take(&mut current)));
        }
    }
    if !current.is_empty() {
        segments.push(segment_from(current));
    }
    segments
}

fn segment_from(words: Vec<AlignedWord>) -> AlignmentSegment {
    let start = words.first().map_or(0.0, |w| w.start);
    let end = words.last().map_or(0.0, |w| w.end);
    let text = words.iter().map(|w| w.word.as_str()).collect();
    AlignmentSegment {
        start,
        end,
        text,
        words,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_words_into_sentences() {
        let word = |w: &str, start: f64| AlignedWord {
            word: w.into(),
            start,
            end: start + 0.3,
        };
        let segments = group_sentences(vec![
            word(" Hi", 0.0),
            word(" there.", 0.4),
            word(" Bye", 1.0),
        ]);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, " Hi there.");
        assert_eq!(segments[1].start, 1.0);
    }

    #[test]
    #[ignore] // needs a downloaded ggml model in WHISPER_MODEL_PATH
    fn transcribes_with_local_model() {
        let Ok(path) = std::env::var("WHISPER_MODEL_PATH") else {
            return;
        };
        let transcriber = WhisperTranscriber::new(path);
        let audio = AudioData::new(vec![0.0; 16_000], 16_000);
        let _ = transcriber.transcribe("silence", &audio);
    }
}
