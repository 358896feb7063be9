use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::stimulus::{Scene, Taxonomy, TestSets, TrainingSets};
use serde::{Deserialize, Serialize};

use crate::axes::FeatureSpace;
use crate::serde::from_json_slice;

/// Training sets, test sets and the unseen object.
pub const STIMULI_FILE: &str = "stimuli.json";
/// Feature to feature-group map.
pub const FEATURE_TO_GROUP_FILE: &str = "feature_to_feature_group_map.json";
/// Feature-group to taxonomic-level map.
pub const GROUP_TO_LEVEL_FILE: &str = "feature_group_to_level_map.json";

/// On-disk layout of `stimuli.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusDocument {
    /// Training condition to named training scenes.
    #[serde(rename = "training set")]
    pub training_sets: TrainingSets,
    /// Test condition to named test objects.
    #[serde(rename = "test set")]
    pub test_sets: TestSets,
    /// Scene used for the untrained prior.
    #[serde(rename = "unseen object features")]
    pub unseen_object: Scene,
}

/// Everything a trial needs from one feature space, loaded once.
#[derive(Debug, Clone, PartialEq)]
pub struct Stimuli {
    /// Training condition to named training scenes, in document order.
    pub training_sets: TrainingSets,
    /// Test condition to named test objects, in document order.
    pub test_sets: TestSets,
    /// Scene used for the untrained prior.
    pub unseen_object: Scene,
    /// Feature to level lookup.
    pub taxonomy: Taxonomy,
}

impl Stimuli {
    /// Reads the three stimulus documents for `space` under `data_path`.
    pub fn load(data_path: &Path, space: FeatureSpace) -> Result<Self, NwgError> {
        let dir = data_path.join(space.directory());
        let document: StimulusDocument = read_json(&dir.join(STIMULI_FILE))?;
        let feature_to_group: IndexMap<String, String> =
            read_json(&dir.join(FEATURE_TO_GROUP_FILE))?;
        let group_to_level: IndexMap<String, String> = read_json(&dir.join(GROUP_TO_LEVEL_FILE))?;
        Ok(Self {
            training_sets: document.training_sets,
            test_sets: document.test_sets,
            unseen_object: document.unseen_object,
            taxonomy: Taxonomy {
                feature_to_group,
                group_to_level,
            },
        })
    }

    /// Directory the documents for `space` are read from.
    pub fn directory(data_path: &Path, space: FeatureSpace) -> PathBuf {
        data_path.join(space.directory())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, NwgError> {
    let bytes = fs::read(path).map_err(|err| {
        NwgError::Stimuli(
            ErrorInfo::new("stimuli-read", "failed to read stimulus document")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    from_json_slice(&bytes, "stimulus document").map_err(|err| {
        NwgError::Stimuli(
            ErrorInfo::new("stimuli-parse", err.info().message.clone())
                .with_context("path", path.display().to_string()),
        )
    })
}
