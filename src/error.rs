use thiserror::Error;

/// Convenient alias for results returned by the analysis modules.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Classified failure raised anywhere in the per-file pipeline.
///
/// Messages are owned strings so one failed contour can be handed to every
/// calculator that depends on it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("recording too short after trimming ({duration:.3}s < {minimum:.3}s)")]
    TooShort { duration: f64, minimum: f64 },
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("transcription failed: {0}")]
    Transcription(String),
    #[error("alignment failed: {0}")]
    Alignment(String),
    #[error("acoustic engine failed: {0}")]
    Engine(String),
    #[error("need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("covariance matrix is singular (determinant {0:e})")]
    SingularCovariance(f64),
    #[error("convex hull is degenerate")]
    DegenerateHull,
    #[error("{0} is undefined")]
    Undefined(&'static str),
    #[error("feature schema error: {0}")]
    Schema(String),
    #[error("feature table error: {0}")]
    Table(String),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("analysis panicked: {0}")]
    Panicked(String),
}

impl AnalysisError {
    /// Input rejections skip the file entirely instead of emitting a null row.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            AnalysisError::Decode(_) | AnalysisError::TooShort { .. } | AnalysisError::MalformedInput(_)
        )
    }

    /// Metric-local results null out a single metric without failing its stage.
    pub fn is_metric_local(&self) -> bool {
        matches!(
            self,
            AnalysisError::SingularCovariance(_) | AnalysisError::Undefined(_)
        )
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::AnalysisError;

    #[test]
    fn classifies_rejections() {
        let short = AnalysisError::TooShort {
            duration: 0.2,
            minimum: 0.5,
        };
        assert!(short.is_input_rejection());
        assert!(!AnalysisError::Alignment("no words".into()).is_input_rejection());
        assert!(AnalysisError::SingularCovariance(0.0).is_metric_local());
        assert!(!AnalysisError::DegenerateHull.is_metric_local());
    }
}
