//! Speech biomarker extraction: turns recordings into a fixed-width table
//! of acoustic and lexical features.

pub mod audio;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod transcription;
pub mod types;

pub use error::{AnalysisError, Result};
