//! Transcription and alignment collaborators.
//!
//! A [`Transcriber`] turns preprocessed audio into a transcript and then
//! into word (and optionally phone) timings. Alignment segments follow the
//! Whisper segment layout so sidecar files written by other tools load
//! unchanged.

pub mod sidecar;
#[cfg(feature = "whisper")]
pub mod whisper;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::AudioData;

pub use sidecar::SidecarTranscriber;
#[cfg(feature = "whisper")]
pub use whisper::WhisperTranscriber;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    pub words: Vec<AlignedWord>,
}

/// One labelled interval of a phone tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneInterval {
    pub label: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub segments: Vec<AlignmentSegment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<PhoneInterval>,
}

impl Alignment {
    pub fn words(&self) -> impl Iterator<Item = &AlignedWord> {
        self.segments.iter().flat_map(|segment| segment.words.iter())
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

/// Two-stage speech-to-text collaborator. `name` is the canonical file
/// name, which sidecar-based implementations use to find their inputs.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, name: &str, audio: &AudioData) -> Result<String>;

    fn align(&self, name: &str, audio: &AudioData, transcript: &str) -> Result<Alignment>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_span_segments() {
        let word = |w: &str, start: f64| AlignedWord {
            word: w.into(),
            start,
            end: start + 0.2,
        };
        let alignment = Alignment {
            segments: vec![
                AlignmentSegment {
                    start: 0.0,
                    end: 1.0,
                    text: String::new(),
                    words: vec![word("hello", 0.0), word("there", 0.5)],
                },
                AlignmentSegment {
                    start: 1.0,
                    end: 2.0,
                    text: String::new(),
                    words: vec![word("friend", 1.2)],
                },
            ],
            phones: Vec::new(),
        };
        assert_eq!(alignment.word_count(), 3);
        let json = serde_json::to_string(&alignment).unwrap();
        assert!(!json.contains("phones"));
    }
}
