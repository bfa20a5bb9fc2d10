use serde::{Deserialize, Serialize};

/// Canonical map/set key for an image type name.
///
/// Image type names are compared case-insensitively everywhere; every map or
/// set boundary goes through this instead of relying on the container.
pub fn normalized_type_name(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// A named category of runtime image, e.g. "spark" or "platform-base".
///
/// Stored in etcd under `/image_types/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageType {
    /// Unique name; identity is case-insensitive.
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
