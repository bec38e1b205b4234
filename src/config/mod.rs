use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::PreprocessSettings;
use crate::cluster::ClusterSettings;
use crate::engine::PerturbationParams;
use crate::features::{FormantConfig, LexicalConfig, PitchConfig, SpeechRateConfig, TimingConfig};
use crate::pipeline::schema::FeatureSchema;

const FEATURE_LIST_FILE: &str = "feature_list.txt";

/// Every tunable of a run. Missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub clustering: ClusterSettings,
    pub formants: FormantConfig,
    pub pitch: PitchConfig,
    pub perturbation: PerturbationParams,
    pub speech_rate: SpeechRateConfig,
    pub timing: TimingConfig,
    pub lexical: LexicalConfig,
    pub preprocess: PreprocessSettings,
    pub jobs: Option<usize>,
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid analysis configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("in {:?}", path))
    }

    pub fn from_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Canonical feature list: an explicit file, else `assets/feature_list.txt`
/// next to the binary, else the copy compiled into the crate. Any failure
/// is fatal for the run.
pub fn load_feature_schema(path: Option<&Path>) -> Result<FeatureSchema> {
    let path = match path {
        Some(custom) => Some(custom.to_path_buf()),
        None => default_assets_root()
            .ok()
            .map(|root| root.join(FEATURE_LIST_FILE))
            .filter(|candidate| candidate.is_file()),
    };
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading feature list");
            FeatureSchema::load(&path)
                .with_context(|| format!("failed to load feature list at {:?}", path))
        }
        None => FeatureSchema::builtin().context("bundled feature list is invalid"),
    }
}

fn default_assets_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("unable to resolve current executable path")?;
    let assets = exe
        .ancestors()
        .find_map(|dir| {
            let candidate = dir.join("assets");
            candidate.is_dir().then_some(candidate)
        })
        .ok_or_else(|| anyhow!("could not locate default assets directory alongside binary"))?;
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::DispersionSpace;

    #[test]
    fn discovers_assets_root() {
        let root = default_assets_root().expect("assets directory should exist");
        assert!(root.ends_with("assets"));
        assert!(root.join(FEATURE_LIST_FILE).is_file());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json(
            r#"{"clustering": {"cluster_count": 8}, "formants": {"dispersion_space": "hz"}, "jobs": 2}"#,
        )
        .unwrap();
        assert_eq!(config.clustering.cluster_count, 8);
        assert_eq!(config.clustering.seed, 42);
        assert_eq!(config.formants.dispersion_space, DispersionSpace::Hz);
        assert_eq!(config.lexical.mattr_window, 8);
        assert_eq!(config.jobs, Some(2));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(AnalysisConfig::from_json("{\"clustering\": 3}").is_err());
    }

    #[test]
    fn feature_list_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.txt");
        std::fs::write(&path, "vai\n").unwrap();
        assert!(load_feature_schema(Some(&path)).is_err());
        assert!(load_feature_schema(Some(&dir.path().join("missing.txt"))).is_err());
        assert_eq!(load_feature_schema(None).unwrap(), FeatureSchema::builtin().unwrap());
    }
}
