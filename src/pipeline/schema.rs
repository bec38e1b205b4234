use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;

use super::record::MetricRecord;
use crate::error::{AnalysisError, Result};

const BUILTIN_FEATURE_LIST: &str = include_str!("../../assets/feature_list.txt");

static BUILTIN: Lazy<Result<FeatureSchema>> = Lazy::new(|| FeatureSchema::parse(BUILTIN_FEATURE_LIST));

/// Canonical, ordered list of metric names every record must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
    /// Index of each name in [`MetricRecord::values`].
    positions: Vec<usize>,
}

impl FeatureSchema {
    /// The list bundled with the crate.
    pub fn builtin() -> Result<Self> {
        BUILTIN.clone()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| AnalysisError::Schema(format!("{}: {err}", path.display())))?;
        Self::parse(&text)
    }

    /// One name per line; blank lines and `#` comments are ignored. The
    /// names must match [`MetricRecord::names`] exactly, in any order.
    pub fn parse(text: &str) -> Result<Self> {
        let names: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        let mut seen = HashSet::new();
        if let Some(duplicate) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(AnalysisError::Schema(format!("duplicate metric name {duplicate}")));
        }

        let expected: HashSet<String> = MetricRecord::names().into_iter().collect();
        let listed: HashSet<String> = names.iter().cloned().collect();
        let mut unknown: Vec<&String> = listed.difference(&expected).collect();
        let mut missing: Vec<&String> = expected.difference(&listed).collect();
        if !unknown.is_empty() || !missing.is_empty() {
            unknown.sort();
            missing.sort();
            return Err(AnalysisError::Schema(format!(
                "feature list does not match the metric record (unknown: {unknown:?}, missing: {missing:?})"
            )));
        }
        let record_index: HashMap<String, usize> = MetricRecord::names()
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();
        let positions = names.iter().filter_map(|name| record_index.get(name).copied()).collect();
        Ok(Self { names, positions })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Record values in schema order.
    pub fn row(&self, record: &MetricRecord) -> Vec<Option<f64>> {
        let values = record.values();
        self.positions.iter().map(|&idx| values[idx]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_list_matches_record() {
        let schema = FeatureSchema::builtin().unwrap();
        assert_eq!(schema.names(), MetricRecord::names().as_slice());
    }

    #[test]
    fn order_follows_the_list() {
        let mut names = MetricRecord::names();
        names.reverse();
        let schema = FeatureSchema::parse(&names.join("\n")).unwrap();
        assert_eq!(schema.names()[0], "mfcc_12_max");

        let mut record = MetricRecord::default();
        record.mfcc[12].max = Some(1.5);
        assert_eq!(schema.row(&record)[0], Some(1.5));
    }

    #[test]
    fn row_matches_lookup_by_name() {
        let mut names = MetricRecord::names();
        names.rotate_left(17);
        let schema = FeatureSchema::parse(&names.join("\n")).unwrap();
        let mut record = MetricRecord::default();
        for (idx, name) in MetricRecord::names().iter().enumerate() {
            *record.slot_mut(name).unwrap() = Some(idx as f64);
        }
        let row = schema.row(&record);
        assert_eq!(row.len(), names.len());
        for (name, value) in names.iter().zip(row) {
            assert_eq!(record.get(name), Some(value));
        }
    }

    #[test]
    fn extra_or_missing_names_are_fatal() {
        let mut names = MetricRecord::names();
        names.pop();
        assert!(FeatureSchema::parse(&names.join("\n")).is_err());
        names.push("mfcc_12_max".into());
        names.push("bogus".into());
        let err = FeatureSchema::parse(&names.join("\n")).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut names = MetricRecord::names();
        names.push("vai".into());
        assert!(FeatureSchema::parse(&names.join("\n")).is_err());
    }
}
