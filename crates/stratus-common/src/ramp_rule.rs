use serde::{Deserialize, Serialize};

/// A named exclusion binding: the flow must never receive `version` of
/// `image_type` via rollout, even when its bucket matches.
///
/// Stored in etcd under `/ramp_rules/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RampRule {
    /// Unique rule name.
    pub name: String,

    /// Flow the exclusion applies to.
    pub flow_name: String,

    /// Image type the excluded version belongs to (case-insensitive).
    pub image_type: String,

    /// The excluded version string.
    pub version: String,
}
