use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::image_version::{ImageVersion, VersionState};
use crate::rampup::RampupEntry;

/// The resolved version an execution mounts for one image type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub path: String,
    pub state: VersionState,
}

impl From<&ImageVersion> for VersionInfo {
    fn from(v: &ImageVersion) -> Self {
        Self {
            version: v.version.clone(),
            path: v.path.clone(),
            state: v.state,
        }
    }
}

/// Why a version was (or was not) chosen for an image type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// Chosen by the flow's bucket in the active rampup plan.
    Rampup,
    /// Latest Active version; no rampup plan applied.
    ActiveFallback,
    /// Latest version in a non-Active state; nothing Active exists.
    /// Metadata queries only.
    NonActiveFallback,
    /// The image type has no version at all yet. Metadata queries only.
    NoVersion,
}

impl Selection {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Rampup => "version selected by the active rampup plan",
            Self::ActiveFallback => "latest available active version selected",
            Self::NonActiveFallback => {
                "latest non-active version selected; no active rampup plan or active version exists"
            }
            Self::NoVersion => "this image type does not have a version yet",
        }
    }
}

/// Metadata-path resolution entry: the decision, its rationale, and the
/// rampup plan that produced it when one applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageVersionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ImageVersion>,

    pub selection: Selection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rampup: Option<Vec<RampupEntry>>,
}

/// The image versions a live execution is pinned to, keyed by normalized
/// image type name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionSet {
    pub image_to_version: BTreeMap<String, VersionInfo>,
}
