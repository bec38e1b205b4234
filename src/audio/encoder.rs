use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::types::AudioData;

/// Write mono 16-bit PCM.
pub fn write_wav<P: AsRef<Path>>(audio: &AudioData, path: P) -> Result<()> {
    let path = path.as_ref();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let io_err = |err: hound::Error| AnalysisError::Io(format!("{}: {err}", path.display()));

    let mut writer = hound::WavWriter::create(path, spec).map_err(io_err)?;
    for &sample in &audio.samples {
        let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(scaled).map_err(io_err)?;
    }
    writer.finalize().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_wav_decodes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..1_600).map(|i| ((i as f32) * 0.05).sin() * 0.5).collect();
        write_wav(&AudioData::new(samples.clone(), 16_000), &path).unwrap();

        let decoded = crate::audio::decoder::decode_audio(&path).unwrap();
        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.samples.len(), samples.len());
        assert!((decoded.samples[100] - samples[100]).abs() < 1e-3);
    }
}
