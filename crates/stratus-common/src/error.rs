use thiserror::Error;

/// Errors surfaced by execution-path version resolution.
///
/// Metadata-path queries never return these; unresolved image types become
/// sentinel entries there instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No catalog entry exists for the exact (image type, version) pair, or
    /// the entry's state is outside the caller's filter.
    #[error("no version '{version}' found for image type '{image_type}'")]
    VersionNotFound { image_type: String, version: String },

    /// One or more image types ended the fallback chain without a decision.
    /// Carries the full offending set so a caller sees everything at once.
    #[error("could not resolve a version for image types: {}", .image_types.join(", "))]
    UnresolvedImageTypes { image_types: Vec<String> },

    /// A ramp rule excluded the bucket-matched version and no active version
    /// exists to fall back to.
    #[error(
        "flow '{flow_name}' is excluded from version '{version}' of image type \
         '{image_type}' by a ramp rule, and no active version exists"
    )]
    RampRuleFallbackFailed {
        flow_name: String,
        image_type: String,
        version: String,
    },

    /// A data-access call failed.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
