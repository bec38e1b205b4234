pub mod decoder;
pub mod encoder;
pub mod preprocess;
pub mod resample;

pub use preprocess::{NativePreprocessor, PreprocessSettings, Preprocessor};
