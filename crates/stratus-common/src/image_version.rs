use serde::{Deserialize, Serialize};

/// Lifecycle state of an image version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VersionState {
    New,
    Active,
    Unstable,
    Deprecated,
}

impl VersionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::str::FromStr for VersionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "active" => Ok(Self::Active),
            "unstable" => Ok(Self::Unstable),
            "deprecated" => Ok(Self::Deprecated),
            other => Err(format!(
                "unknown version state '{other}', expected one of: new, active, unstable, deprecated"
            )),
        }
    }
}

/// A specific version of an image type known to the catalog.
///
/// Stored in etcd under `/image_versions/{type}/{version}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageVersion {
    /// Image type this version belongs to (case-insensitive identity).
    pub image_type: String,

    /// Version string, e.g. "1.4.2".
    pub version: String,

    /// Registry path the container runtime pulls from.
    pub path: String,

    /// Lifecycle state.
    pub state: VersionState,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp (ms since epoch); newest wins as "latest".
    #[serde(default)]
    pub created_at_ms: u64,
}
