use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use stratus_common::{normalized_type_name, ImageType, ImageVersion, RampRule, RampupEntry};

use crate::types::{latest, ImageTypeCatalog, ImageVersionCatalog, RampRuleStore, RampupStore};

/// In-process implementation of every catalog trait, used by tests and local
/// development. All maps are keyed by normalized image type name.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    types: BTreeMap<String, ImageType>,
    versions: BTreeMap<String, Vec<ImageVersion>>,
    plans: BTreeMap<String, Vec<RampupEntry>>,
    rules: Vec<RampRule>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_type(&self, image_type: ImageType) {
        let mut inner = self.inner.write().await;
        inner
            .types
            .insert(normalized_type_name(&image_type.name), image_type);
    }

    pub async fn register_version(&self, version: ImageVersion) {
        let mut inner = self.inner.write().await;
        inner
            .versions
            .entry(normalized_type_name(&version.image_type))
            .or_default()
            .push(version);
    }

    pub async fn set_rampup_plan(&self, image_type: &str, entries: Vec<RampupEntry>) {
        let mut inner = self.inner.write().await;
        inner.plans.insert(normalized_type_name(image_type), entries);
    }

    pub async fn add_rule(&self, rule: RampRule) {
        self.inner.write().await.rules.push(rule);
    }
}

#[async_trait::async_trait]
impl ImageTypeCatalog for MemoryImageStore {
    async fn list_image_types(&self) -> Result<Vec<ImageType>> {
        Ok(self.inner.read().await.types.values().cloned().collect())
    }
}

#[async_trait::async_trait]
impl ImageVersionCatalog for MemoryImageStore {
    async fn find_versions(&self, image_type: &str, version: &str) -> Result<Vec<ImageVersion>> {
        let inner = self.inner.read().await;
        let matches = inner
            .versions
            .get(&normalized_type_name(image_type))
            .map(|list| {
                list.iter()
                    .filter(|v| v.version.eq_ignore_ascii_case(version))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }

    async fn active_versions(&self, image_types: &BTreeSet<String>) -> Result<Vec<ImageVersion>> {
        let inner = self.inner.read().await;
        let mut out = Vec::new();
        for ty in image_types {
            if let Some(list) = inner.versions.get(&normalized_type_name(ty)) {
                if let Some(v) = latest(list.iter().filter(|v| v.state.is_active())) {
                    out.push(v.clone());
                }
            }
        }
        Ok(out)
    }

    async fn latest_non_active_versions(
        &self,
        image_types: &BTreeSet<String>,
    ) -> Result<Vec<ImageVersion>> {
        let inner = self.inner.read().await;
        let mut out = Vec::new();
        for ty in image_types {
            if let Some(list) = inner.versions.get(&normalized_type_name(ty)) {
                if let Some(v) = latest(list.iter().filter(|v| !v.state.is_active())) {
                    out.push(v.clone());
                }
            }
        }
        Ok(out)
    }

    async fn is_invalid_version(&self, image_type: &str, version: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        let known = inner
            .versions
            .get(&normalized_type_name(image_type))
            .map(|list| list.iter().any(|v| v.version.eq_ignore_ascii_case(version)))
            .unwrap_or(false);
        Ok(!known)
    }
}

#[async_trait::async_trait]
impl RampupStore for MemoryImageStore {
    async fn rampup_for_all(&self) -> Result<BTreeMap<String, Vec<RampupEntry>>> {
        Ok(self.inner.read().await.plans.clone())
    }

    async fn rampup_for_types(
        &self,
        image_types: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Vec<RampupEntry>>> {
        let keys: BTreeSet<String> = image_types.iter().map(|t| normalized_type_name(t)).collect();
        let inner = self.inner.read().await;
        Ok(inner
            .plans
            .iter()
            .filter(|(ty, _)| keys.contains(*ty))
            .map(|(ty, entries)| (ty.clone(), entries.clone()))
            .collect())
    }
}

#[async_trait::async_trait]
impl RampRuleStore for MemoryImageStore {
    async fn is_excluded(&self, flow_name: &str, image_type: &str, version: &str) -> Result<bool> {
        let key = normalized_type_name(image_type);
        let excluded = self.inner.read().await.rules.iter().any(|r| {
            r.flow_name == flow_name
                && normalized_type_name(&r.image_type) == key
                && r.version.eq_ignore_ascii_case(version)
        });
        Ok(excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_common::VersionState;

    fn make_version(ty: &str, version: &str, state: VersionState, created_at_ms: u64) -> ImageVersion {
        ImageVersion {
            image_type: ty.to_string(),
            version: version.to_string(),
            path: format!("registry.local/{}:{}", ty.to_ascii_lowercase(), version),
            state,
            description: None,
            created_at_ms,
        }
    }

    fn type_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn active_versions_returns_latest_active_per_type() {
        let store = MemoryImageStore::new();
        store
            .register_version(make_version("spark", "1.0.0", VersionState::Active, 100))
            .await;
        store
            .register_version(make_version("spark", "1.1.0", VersionState::Active, 200))
            .await;
        store
            .register_version(make_version("spark", "2.0.0", VersionState::New, 300))
            .await;

        let active = store.active_versions(&type_set(&["spark"])).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].version, "1.1.0");
    }

    #[tokio::test]
    async fn latest_non_active_skips_active_versions() {
        let store = MemoryImageStore::new();
        store
            .register_version(make_version("hive", "0.9.0", VersionState::New, 100))
            .await;
        store
            .register_version(make_version("hive", "1.0.0", VersionState::Active, 200))
            .await;
        store
            .register_version(make_version("hive", "1.1.0", VersionState::Unstable, 300))
            .await;

        let non_active = store
            .latest_non_active_versions(&type_set(&["hive"]))
            .await
            .unwrap();
        assert_eq!(non_active.len(), 1);
        assert_eq!(non_active[0].version, "1.1.0");
    }

    #[tokio::test]
    async fn find_versions_matches_case_insensitively() {
        let store = MemoryImageStore::new();
        store
            .register_version(make_version("Spark", "1.0.0", VersionState::Active, 100))
            .await;

        let found = store.find_versions("SPARK", "1.0.0").await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(store.find_versions("spark", "9.9.9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn is_invalid_version_only_for_unknown_pairs() {
        let store = MemoryImageStore::new();
        store
            .register_version(make_version("spark", "1.0.0", VersionState::Deprecated, 100))
            .await;

        assert!(!store.is_invalid_version("spark", "1.0.0").await.unwrap());
        assert!(store.is_invalid_version("spark", "1.0.1").await.unwrap());
        assert!(store.is_invalid_version("flink", "1.0.0").await.unwrap());
    }

    #[tokio::test]
    async fn rampup_for_types_normalizes_requested_names() {
        let store = MemoryImageStore::new();
        store
            .set_rampup_plan(
                "Spark",
                vec![RampupEntry {
                    version: "2.0.0".to_string(),
                    percentage: 100,
                }],
            )
            .await;

        let plans = store.rampup_for_types(&type_set(&["SPARK"])).await.unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans.contains_key("spark"));
    }

    #[tokio::test]
    async fn rule_matching_is_exact_on_flow_and_version() {
        let store = MemoryImageStore::new();
        store
            .add_rule(RampRule {
                name: "hold-spark-2".to_string(),
                flow_name: "nightly-etl".to_string(),
                image_type: "Spark".to_string(),
                version: "2.0.0".to_string(),
            })
            .await;

        assert!(store
            .is_excluded("nightly-etl", "spark", "2.0.0")
            .await
            .unwrap());
        assert!(!store
            .is_excluded("hourly-etl", "spark", "2.0.0")
            .await
            .unwrap());
        assert!(!store
            .is_excluded("nightly-etl", "spark", "2.1.0")
            .await
            .unwrap());
    }
}
