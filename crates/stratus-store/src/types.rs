use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use async_trait::async_trait;

use stratus_common::{ImageType, ImageVersion, RampupEntry};

/// Catalog of known image types.
#[async_trait]
pub trait ImageTypeCatalog: Send + Sync {
    /// All image types the platform knows about.
    async fn list_image_types(&self) -> Result<Vec<ImageType>>;
}

/// Catalog of image versions and their lifecycle states.
///
/// The batch methods take the whole remaining set of a resolution tier so a
/// backend can answer in one sweep.
#[async_trait]
pub trait ImageVersionCatalog: Send + Sync {
    /// Versions matching the given (type, version) pair. Backends may return
    /// loose matches; callers filter for the exact pair.
    async fn find_versions(&self, image_type: &str, version: &str) -> Result<Vec<ImageVersion>>;

    /// Latest Active version for each of the given types, where one exists.
    async fn active_versions(&self, image_types: &BTreeSet<String>) -> Result<Vec<ImageVersion>>;

    /// Latest non-Active version for each of the given types, where one
    /// exists.
    async fn latest_non_active_versions(
        &self,
        image_types: &BTreeSet<String>,
    ) -> Result<Vec<ImageVersion>>;

    /// Whether the (type, version) pair is absent from the catalog.
    async fn is_invalid_version(&self, image_type: &str, version: &str) -> Result<bool>;
}

/// Access to active rollout plans.
#[async_trait]
pub trait RampupStore: Send + Sync {
    /// Active plans for every image type that has one.
    async fn rampup_for_all(&self) -> Result<BTreeMap<String, Vec<RampupEntry>>>;

    /// Active plans for the given types.
    async fn rampup_for_types(
        &self,
        image_types: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Vec<RampupEntry>>>;
}

/// Decides whether a flow is excluded from receiving a version via rollout.
///
/// Consulted only after a rampup bucket match, so backends see exactly the
/// decisions that matter.
#[async_trait]
pub trait RampRuleStore: Send + Sync {
    async fn is_excluded(&self, flow_name: &str, image_type: &str, version: &str) -> Result<bool>;
}

/// Latest version among `versions`, ordered by `(created_at_ms, version)`.
pub(crate) fn latest<'a, I>(versions: I) -> Option<&'a ImageVersion>
where
    I: IntoIterator<Item = &'a ImageVersion>,
{
    versions.into_iter().max_by(|a, b| {
        a.created_at_ms
            .cmp(&b.created_at_ms)
            .then_with(|| a.version.cmp(&b.version))
    })
}
