//! Feature calculators. Each module turns engine output, alignment or
//! transcript text into one group of metrics.

pub mod bark;
pub mod cepstral;
pub mod density;
pub mod dispersion;
pub mod formants;
pub mod lexical;
pub mod prosody;
pub mod stats;
pub mod timing;
pub mod vai;

pub use density::DensityFilter;
pub use formants::{DispersionSpace, FormantConfig, FormantSample, FormantTrajectory};
pub use lexical::{LexicalConfig, LexiconTagger, PosTagger};
pub use prosody::PitchConfig;
pub use stats::Summary;
pub use timing::{SpeechRateConfig, TimingConfig};
