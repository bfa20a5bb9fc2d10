use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use stratus_common::{
    normalized_plan, normalized_type_name, FlowContext, ImageVersion, ImageVersionMetadata,
    RampupEntry, ResolveError, Selection, VersionInfo, VersionSet, VersionState,
};
use stratus_store::{ImageTypeCatalog, ImageVersionCatalog, RampRuleStore, RampupStore};

use crate::bucket::FlowBucketer;

/// How store failures are treated for a resolution call.
///
/// Execution-path calls fail loudly: a job must not run with an undefined
/// image. Metadata-path calls serve reporting and must always return
/// something per type, so a failing lookup just yields no result for its
/// tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Execution,
    Metadata,
}

/// Resolves which image version each image type should run with, combining
/// the active rampup plan, per-flow exclusion rules, and the version
/// catalog.
///
/// Selection per image type walks a fallback chain: the flow's bucket in the
/// active rampup plan (unless a ramp rule excludes the matched version, in
/// which case the current active version stands in), then the latest Active
/// version, and (for metadata queries only) the latest version in any
/// state, then a "no version yet" sentinel.
///
/// Stateless across calls; every request reads the stores fresh.
pub struct VersionResolver {
    types: Arc<dyn ImageTypeCatalog>,
    versions: Arc<dyn ImageVersionCatalog>,
    rampups: Arc<dyn RampupStore>,
    rules: Arc<dyn RampRuleStore>,
    bucketer: Arc<dyn FlowBucketer>,
}

impl VersionResolver {
    pub fn new(
        types: Arc<dyn ImageTypeCatalog>,
        versions: Arc<dyn ImageVersionCatalog>,
        rampups: Arc<dyn RampupStore>,
        rules: Arc<dyn RampRuleStore>,
        bucketer: Arc<dyn FlowBucketer>,
    ) -> Self {
        Self {
            types,
            versions,
            rampups,
            rules,
            bucketer,
        }
    }

    /// Resolves every known image type for a live execution.
    ///
    /// Fails with [`ResolveError::UnresolvedImageTypes`] carrying the full
    /// set of types that ended the rampup and active tiers without a
    /// decision.
    pub async fn resolve_for_execution(
        &self,
        flow: &FlowContext,
    ) -> Result<BTreeMap<String, VersionInfo>, ResolveError> {
        let plans = self.rampups.rampup_for_all().await?;
        let image_types = self.all_type_keys().await?;

        let mut remaining = BTreeSet::new();
        let decisions = self
            .run_fallback_chain(Some(flow), &image_types, &plans, &mut remaining, Mode::Execution)
            .await?;

        if !remaining.is_empty() {
            return Err(ResolveError::UnresolvedImageTypes {
                image_types: remaining.into_iter().collect(),
            });
        }
        info!(
            flow = %flow.flow_name,
            execution_id = ?flow.execution_id,
            resolved = decisions.len(),
            "resolved image versions for execution"
        );
        Ok(to_version_info_map(&decisions))
    }

    /// Resolves version metadata for every known image type, without a flow.
    ///
    /// The rampup tier degenerates to "first entry of the plan"; types left
    /// after the active tier fall to the latest non-active version and
    /// finally to a [`Selection::NoVersion`] sentinel. Never fails: store
    /// errors on this path are logged and treated as "no result" for the
    /// failing tier.
    pub async fn resolve_metadata(&self) -> BTreeMap<String, ImageVersionMetadata> {
        let plans = match self.rampups.rampup_for_all().await {
            Ok(plans) => plans,
            Err(e) => {
                warn!(error=%e, "rampup plan lookup failed, skipping rampup tier");
                BTreeMap::new()
            }
        };
        let image_types = match self.all_type_keys().await {
            Ok(types) => types,
            Err(e) => {
                warn!(error=%e, "image type listing failed, nothing to resolve");
                BTreeSet::new()
            }
        };

        let mut remaining = BTreeSet::new();
        let mut decisions = match self
            .run_fallback_chain(None, &image_types, &plans, &mut remaining, Mode::Metadata)
            .await
        {
            Ok(decisions) => decisions,
            Err(e) => {
                warn!(error=%e, "fallback chain failed, reporting all image types as undecided");
                remaining = image_types.clone();
                BTreeMap::new()
            }
        };

        if !remaining.is_empty() {
            let non_active = match self.versions.latest_non_active_versions(&remaining).await {
                Ok(versions) => versions,
                Err(e) => {
                    warn!(error=%e, "non-active version lookup failed");
                    Vec::new()
                }
            };
            for version in non_active {
                let key = normalized_type_name(&version.image_type);
                if !remaining.remove(&key) {
                    continue;
                }
                decisions.insert(
                    key,
                    ImageVersionMetadata {
                        version: Some(version),
                        selection: Selection::NonActiveFallback,
                        rampup: None,
                    },
                );
            }
            for key in std::mem::take(&mut remaining) {
                decisions.insert(
                    key,
                    ImageVersionMetadata {
                        version: None,
                        selection: Selection::NoVersion,
                        rampup: None,
                    },
                );
            }
        }
        decisions
    }

    /// Resolves a caller-chosen set of image types for a live execution.
    ///
    /// Types in `overlay_exempt_types` are excluded from the unresolved
    /// check: the caller pins those itself (e.g. an explicit per-execution
    /// override) and the resolver must not second-guess them.
    pub async fn resolve_subset(
        &self,
        flow: &FlowContext,
        image_types: &BTreeSet<String>,
        overlay_exempt_types: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, VersionInfo>, ResolveError> {
        let keys: BTreeSet<String> = image_types.iter().map(|t| normalized_type_name(t)).collect();
        let plans = self.rampups.rampup_for_types(&keys).await?;

        let mut remaining = BTreeSet::new();
        let decisions = self
            .run_fallback_chain(Some(flow), &keys, &plans, &mut remaining, Mode::Execution)
            .await?;

        for exempt in overlay_exempt_types {
            remaining.remove(&normalized_type_name(exempt));
        }
        if !remaining.is_empty() {
            return Err(ResolveError::UnresolvedImageTypes {
                image_types: remaining.into_iter().collect(),
            });
        }
        Ok(to_version_info_map(&decisions))
    }

    /// Re-validates the versions an execution is already pinned to.
    ///
    /// Pins the catalog no longer recognizes are re-resolved through the
    /// fallback chain; valid pins pass through unchanged. The result always
    /// contains every entry of the original set, fresh decisions winning.
    pub async fn reconcile(
        &self,
        flow: &FlowContext,
        version_set: &VersionSet,
    ) -> Result<BTreeMap<String, VersionInfo>, ResolveError> {
        let mut invalid = BTreeSet::new();
        for (image_type, info) in &version_set.image_to_version {
            if self
                .versions
                .is_invalid_version(image_type, &info.version)
                .await?
            {
                warn!(
                    image_type = %image_type,
                    version = %info.version,
                    "pinned version is no longer valid, re-resolving"
                );
                invalid.insert(normalized_type_name(image_type));
            }
        }

        let mut updated = BTreeMap::new();
        if !invalid.is_empty() {
            updated = self.resolve_subset(flow, &invalid, &BTreeSet::new()).await?;
        }
        for (image_type, info) in &version_set.image_to_version {
            updated
                .entry(normalized_type_name(image_type))
                .or_insert_with(|| info.clone());
        }
        Ok(updated)
    }

    /// Exact (type, version) lookup with an optional state filter.
    ///
    /// An empty `allowed_states` means any state is acceptable; otherwise
    /// the found version's state must be in the filter, else
    /// [`ResolveError::VersionNotFound`].
    pub async fn version_info(
        &self,
        image_type: &str,
        version: &str,
        allowed_states: &[VersionState],
    ) -> Result<VersionInfo, ResolveError> {
        let found = self.fetch_exact(image_type, version, Mode::Execution).await?;
        match found {
            Some(v) if allowed_states.is_empty() || allowed_states.contains(&v.state) => {
                Ok(VersionInfo::from(&v))
            }
            _ => Err(ResolveError::VersionNotFound {
                image_type: image_type.to_string(),
                version: version.to_string(),
            }),
        }
    }

    /// Runs the rampup and active tiers over `image_types` (normalized
    /// keys), recording what each tier resolved and leaving everything else
    /// in `remaining`. Later tiers never overwrite an earlier decision.
    async fn run_fallback_chain(
        &self,
        flow: Option<&FlowContext>,
        image_types: &BTreeSet<String>,
        plans: &BTreeMap<String, Vec<RampupEntry>>,
        remaining: &mut BTreeSet<String>,
        mode: Mode,
    ) -> Result<BTreeMap<String, ImageVersionMetadata>, ResolveError> {
        // Normalize plan keys and drop plans for types outside the request;
        // from here on every set operation runs on normalized keys.
        let mut plans_by_key: BTreeMap<String, Vec<RampupEntry>> = BTreeMap::new();
        for (name, entries) in plans {
            let key = normalized_type_name(name);
            if image_types.contains(&key) {
                plans_by_key.insert(key, entries.clone());
            }
        }

        let mut decisions = BTreeMap::new();
        for (key, version) in self.rampup_tier(flow, &plans_by_key, mode).await? {
            let rampup = plans_by_key.get(&key).cloned();
            decisions.insert(
                key,
                ImageVersionMetadata {
                    version: Some(version),
                    selection: Selection::Rampup,
                    rampup,
                },
            );
        }
        debug!(resolved = decisions.len(), "rampup tier done");

        remaining.extend(image_types.iter().cloned());
        for key in decisions.keys() {
            remaining.remove(key);
        }

        if !remaining.is_empty() {
            let active = match self.versions.active_versions(&*remaining).await {
                Ok(versions) => versions,
                Err(e) => match mode {
                    Mode::Execution => return Err(e.into()),
                    Mode::Metadata => {
                        warn!(error=%e, "active version lookup failed");
                        Vec::new()
                    }
                },
            };
            for version in active {
                let key = normalized_type_name(&version.image_type);
                if !remaining.remove(&key) {
                    continue;
                }
                decisions.insert(
                    key,
                    ImageVersionMetadata {
                        version: Some(version),
                        selection: Selection::ActiveFallback,
                        rampup: None,
                    },
                );
            }
        }
        debug!(
            resolved = decisions.len(),
            unresolved = remaining.len(),
            "active tier done"
        );

        Ok(decisions)
    }

    /// Rampup tier: selects a version per image type from its active plan.
    ///
    /// With a flow, the flow's bucket picks the entry; without one (metadata
    /// queries) the first entry of the normalized plan stands in. Types whose
    /// plan selects nothing are simply absent from the result.
    async fn rampup_tier(
        &self,
        flow: Option<&FlowContext>,
        plans_by_key: &BTreeMap<String, Vec<RampupEntry>>,
        mode: Mode,
    ) -> Result<BTreeMap<String, ImageVersion>, ResolveError> {
        let mut selected = BTreeMap::new();
        if plans_by_key.is_empty() {
            debug!("no active rampup plan for any requested image type");
            return Ok(selected);
        }

        let bucket = flow.map(|f| self.bucketer.bucket_for(&f.flow_name));
        for (key, entries) in plans_by_key {
            let plan = normalized_plan(entries);
            if plan.is_empty() {
                continue;
            }
            match (flow, bucket) {
                (Some(flow), Some(bucket)) => {
                    if let Some(version) = self.select_for_flow(flow, key, &plan, bucket).await? {
                        selected.insert(key.clone(), version);
                    }
                }
                _ => {
                    let head = &plan[0];
                    match self.fetch_exact(key, &head.version, mode).await? {
                        Some(version) => {
                            selected.insert(key.clone(), version);
                        }
                        None => warn!(
                            image_type = %key,
                            version = %head.version,
                            "rampup head version missing from catalog"
                        ),
                    }
                }
            }
        }
        Ok(selected)
    }

    /// Walks one plan for one flow. Entries own ascending half-open bucket
    /// ranges `(floor, floor+percentage]`; the first entry whose range
    /// contains the flow's bucket wins and nothing after it is reconsidered.
    async fn select_for_flow(
        &self,
        flow: &FlowContext,
        image_type: &str,
        plan: &[RampupEntry],
        bucket: u32,
    ) -> Result<Option<ImageVersion>, ResolveError> {
        let mut floor = 0u32;
        for entry in plan {
            if bucket > floor && bucket <= floor + entry.percentage {
                if self
                    .rules
                    .is_excluded(&flow.flow_name, image_type, &entry.version)
                    .await?
                {
                    info!(
                        flow = %flow.flow_name,
                        image_type,
                        version = %entry.version,
                        "rampup version excluded by ramp rule, using active version"
                    );
                    let singleton: BTreeSet<String> = [image_type.to_string()].into();
                    let active = self.versions.active_versions(&singleton).await?;
                    return match active.into_iter().next() {
                        Some(version) => Ok(Some(version)),
                        None => Err(ResolveError::RampRuleFallbackFailed {
                            flow_name: flow.flow_name.clone(),
                            image_type: image_type.to_string(),
                            version: entry.version.clone(),
                        }),
                    };
                }

                let found = self
                    .fetch_exact(image_type, &entry.version, Mode::Execution)
                    .await?;
                match &found {
                    Some(version) => debug!(
                        flow = %flow.flow_name,
                        bucket,
                        image_type,
                        version = %version.version,
                        percentage = entry.percentage,
                        "rampup selected version"
                    ),
                    None => warn!(
                        image_type,
                        version = %entry.version,
                        "bucket-matched rampup version missing from catalog, \
                         leaving type to later tiers"
                    ),
                }
                return Ok(found);
            }
            floor += entry.percentage;
        }

        debug!(
            flow = %flow.flow_name,
            bucket,
            image_type,
            allocated = floor,
            "bucket beyond allocated rampup range"
        );
        Ok(None)
    }

    /// Exact catalog lookup. Backends may return loose matches; only the
    /// exact (type, version) pair counts.
    async fn fetch_exact(
        &self,
        image_type: &str,
        version: &str,
        mode: Mode,
    ) -> Result<Option<ImageVersion>, ResolveError> {
        let found = match self.versions.find_versions(image_type, version).await {
            Ok(found) => found,
            Err(e) => match mode {
                Mode::Execution => return Err(e.into()),
                Mode::Metadata => {
                    warn!(image_type, version, error=%e, "version lookup failed");
                    Vec::new()
                }
            },
        };
        Ok(found.into_iter().find(|v| {
            v.image_type.eq_ignore_ascii_case(image_type)
                && v.version.eq_ignore_ascii_case(version)
        }))
    }

    async fn all_type_keys(&self) -> Result<BTreeSet<String>, ResolveError> {
        let types = self.types.list_image_types().await?;
        Ok(types
            .iter()
            .map(|t| normalized_type_name(&t.name))
            .collect())
    }
}

fn to_version_info_map(
    decisions: &BTreeMap<String, ImageVersionMetadata>,
) -> BTreeMap<String, VersionInfo> {
    decisions
        .iter()
        .filter_map(|(key, m)| m.version.as_ref().map(|v| (key.clone(), VersionInfo::from(v))))
        .collect()
}
