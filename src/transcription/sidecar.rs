use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{Alignment, AlignmentSegment, PhoneInterval, Transcriber};
use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

/// Reads `<dir>/<name>.txt` transcripts and `<dir>/<name>.json` alignments
/// produced ahead of time.
#[derive(Debug, Clone)]
pub struct SidecarTranscriber {
    dir: PathBuf,
}

/// Accepts either a bare Whisper segment array or an object carrying
/// segments and an optional phone tier.
#[derive(Deserialize)]
#[serde(untagged)]
enum SidecarAlignment {
    Segments(Vec<AlignmentSegment>),
    Full {
        segments: Vec<AlignmentSegment>,
        #[serde(default)]
        phones: Vec<PhoneInterval>,
    },
}

impl SidecarTranscriber {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sidecar(&self, name: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{name}.{extension}"))
    }
}

/// A missing sidecar rejects the input; any other read failure is an I/O
/// error on the stage.
fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => AnalysisError::MalformedInput(format!("{}: {err}", path.display())),
        _ => AnalysisError::Io(format!("{}: {err}", path.display())),
    })
}

/// Parses the sidecar alignment format. Entries missing a required field
/// are rejected as malformed input.
pub fn parse_alignment(json: &str) -> Result<Alignment> {
    let parsed: SidecarAlignment =
        serde_json::from_str(json).map_err(|err| AnalysisError::MalformedInput(err.to_string()))?;
    Ok(match parsed {
        SidecarAlignment::Segments(segments) => Alignment {
            segments,
            phones: Vec::new(),
        },
        SidecarAlignment::Full { segments, phones } => Alignment { segments, phones },
    })
}

impl Transcriber for SidecarTranscriber {
    fn transcribe(&self, name: &str, _audio: &AudioData) -> Result<String> {
        let path = self.sidecar(name, "txt");
        let text = read(&path)?;
        debug!(file = name, chars = text.len(), "loaded transcript");
        Ok(text.trim().to_string())
    }

    fn align(&self, name: &str, _audio: &AudioData, _transcript: &str) -> Result<Alignment> {
        let path = self.sidecar(name, "json");
        let alignment = parse_alignment(&read(&path)?)?;
        if alignment.word_count() == 0 {
            return Err(AnalysisError::Alignment(format!(
                "{} contains no aligned words",
                path.display()
            )));
        }
        debug!(
            file = name,
            segments = alignment.segments.len(),
            phones = alignment.phones.len(),
            "loaded alignment"
        );
        Ok(alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHISPER_SEGMENTS: &str = r#"[
        {"id": 0, "start": 0.0, "end": 1.5, "text": " Hello there.",
         "words": [{"word": " Hello", "start": 0.0, "end": 0.4, "probability": 0.9},
                   {"word": " there.", "start": 0.6, "end": 1.0, "probability": 0.8}]}
    ]"#;

    #[test]
    fn reads_whisper_segment_arrays() {
        let alignment = parse_alignment(WHISPER_SEGMENTS).unwrap();
        assert_eq!(alignment.word_count(), 2);
        assert_eq!(alignment.segments[0].words[1].word, " there.");
        assert!(alignment.phones.is_empty());
    }

    #[test]
    fn reads_phone_tier() {
        let json = r#"{"segments": [], "phones": [{"label": "IY1", "start": 0.1, "end": 0.2}]}"#;
        let alignment = parse_alignment(json).unwrap();
        assert_eq!(alignment.phones[0].label, "IY1");
    }

    #[test]
    fn missing_field_is_malformed_input() {
        let json = r#"[{"start": 0.0, "end": 1.0, "words": [{"word": "hi", "start": 0.0}]}]"#;
        let err = parse_alignment(json).unwrap_err();
        assert!(err.is_input_rejection());
    }

    #[test]
    fn loads_sidecars_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("s01.txt"), "Hello there.\n").unwrap();
        fs::write(dir.path().join("s01.json"), WHISPER_SEGMENTS).unwrap();
        let transcriber = SidecarTranscriber::new(dir.path());
        let audio = AudioData::default();
        assert_eq!(transcriber.transcribe("s01", &audio).unwrap(), "Hello there.");
        assert_eq!(transcriber.align("s01", &audio, "").unwrap().word_count(), 2);
        assert!(transcriber.transcribe("s02", &audio).unwrap_err().is_input_rejection());
    }

    #[test]
    fn unreadable_sidecar_is_a_stage_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("s03.txt")).unwrap();
        let err = SidecarTranscriber::new(dir.path())
            .transcribe("s03", &AudioData::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
        assert!(!err.is_input_rejection());
    }
}
