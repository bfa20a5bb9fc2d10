use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::Result;
use etcd_client::{Client, GetOptions};
use tokio::sync::Mutex;
use tracing::warn;

use stratus_common::{normalized_type_name, ImageType, ImageVersion, RampRule, RampupEntry};

use crate::types::{latest, ImageTypeCatalog, ImageVersionCatalog, RampRuleStore, RampupStore};

const TYPES_PREFIX: &str = "/image_types/";
const VERSIONS_PREFIX: &str = "/image_versions/";
const PLANS_PREFIX: &str = "/rampup_plans/";
const RULES_PREFIX: &str = "/ramp_rules/";

/// Read-side catalog over the JSON documents the control plane publishes to
/// etcd:
///
/// - `/image_types/{type}`: [`ImageType`]
/// - `/image_versions/{type}/{version}`: [`ImageVersion`]
/// - `/rampup_plans/{type}`: `Vec<RampupEntry>` (the active plan)
/// - `/ramp_rules/{name}`: [`RampRule`]
///
/// Path segments use the normalized (lowercase) type name. Writes belong to
/// the control plane, not to this store.
#[derive(Clone)]
pub struct EtcdImageStore {
    client: Arc<Mutex<Client>>,
}

impl EtcdImageStore {
    pub async fn connect(endpoints: &[String]) -> Result<Self> {
        let c = Client::connect(endpoints, None).await?;
        Ok(Self {
            client: Arc::new(Mutex::new(c)),
        })
    }

    /// Lists `prefix` and decodes each value, returning (key, value) pairs.
    /// Undecodable documents are skipped with a warning rather than failing
    /// the whole sweep.
    async fn list_json<T: serde::de::DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, T)>> {
        let mut cli = self.client.lock().await;
        let resp = cli.get(prefix, Some(GetOptions::new().with_prefix())).await?;

        let mut out = Vec::new();
        for kv in resp.kvs() {
            let key = String::from_utf8_lossy(kv.key()).to_string();
            match serde_json::from_slice::<T>(kv.value()) {
                Ok(value) => out.push((key, value)),
                Err(e) => warn!(key=%key, error=%e, "skipping undecodable catalog document"),
            }
        }
        Ok(out)
    }

    async fn versions_for_type(&self, image_type: &str) -> Result<Vec<ImageVersion>> {
        let prefix = format!("{VERSIONS_PREFIX}{}/", normalized_type_name(image_type));
        let docs = self.list_json::<ImageVersion>(&prefix).await?;
        Ok(docs.into_iter().map(|(_, v)| v).collect())
    }
}

#[async_trait::async_trait]
impl ImageTypeCatalog for EtcdImageStore {
    async fn list_image_types(&self) -> Result<Vec<ImageType>> {
        let docs = self.list_json::<ImageType>(TYPES_PREFIX).await?;
        Ok(docs.into_iter().map(|(_, t)| t).collect())
    }
}

#[async_trait::async_trait]
impl ImageVersionCatalog for EtcdImageStore {
    async fn find_versions(&self, image_type: &str, version: &str) -> Result<Vec<ImageVersion>> {
        let versions = self.versions_for_type(image_type).await?;
        Ok(versions
            .into_iter()
            .filter(|v| v.version.eq_ignore_ascii_case(version))
            .collect())
    }

    async fn active_versions(&self, image_types: &BTreeSet<String>) -> Result<Vec<ImageVersion>> {
        let mut out = Vec::new();
        for ty in image_types {
            let versions = self.versions_for_type(ty).await?;
            if let Some(v) = latest(versions.iter().filter(|v| v.state.is_active())) {
                out.push(v.clone());
            }
        }
        Ok(out)
    }

    async fn latest_non_active_versions(
        &self,
        image_types: &BTreeSet<String>,
    ) -> Result<Vec<ImageVersion>> {
        let mut out = Vec::new();
        for ty in image_types {
            let versions = self.versions_for_type(ty).await?;
            if let Some(v) = latest(versions.iter().filter(|v| !v.state.is_active())) {
                out.push(v.clone());
            }
        }
        Ok(out)
    }

    async fn is_invalid_version(&self, image_type: &str, version: &str) -> Result<bool> {
        let found = self.find_versions(image_type, version).await?;
        Ok(found.is_empty())
    }
}

#[async_trait::async_trait]
impl RampupStore for EtcdImageStore {
    async fn rampup_for_all(&self) -> Result<BTreeMap<String, Vec<RampupEntry>>> {
        let docs = self.list_json::<Vec<RampupEntry>>(PLANS_PREFIX).await?;
        Ok(docs
            .into_iter()
            .map(|(key, plan)| (key.trim_start_matches(PLANS_PREFIX).to_string(), plan))
            .collect())
    }

    async fn rampup_for_types(
        &self,
        image_types: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Vec<RampupEntry>>> {
        let keys: BTreeSet<String> = image_types.iter().map(|t| normalized_type_name(t)).collect();
        let mut plans = self.rampup_for_all().await?;
        plans.retain(|ty, _| keys.contains(&normalized_type_name(ty)));
        Ok(plans)
    }
}

#[async_trait::async_trait]
impl RampRuleStore for EtcdImageStore {
    async fn is_excluded(&self, flow_name: &str, image_type: &str, version: &str) -> Result<bool> {
        let key = normalized_type_name(image_type);
        let rules = self.list_json::<RampRule>(RULES_PREFIX).await?;
        Ok(rules.into_iter().any(|(_, r)| {
            r.flow_name == flow_name
                && normalized_type_name(&r.image_type) == key
                && r.version.eq_ignore_ascii_case(version)
        }))
    }
}
