//! Versioned, immutable catalog snapshots.
//!
//! Records pass through [`CatalogSnapshot::from_records`] before the engine sees them; a snapshot
//! that fails any integrity check is rejected as a whole.

pub mod integrity;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::commission::CommissionRule;
use crate::domain::discount::DiscountRule;
use crate::domain::hardware::HardwareItem;
use crate::domain::promotion::Promotion;
use crate::domain::tariff::{SubVariantRule, TariffDefinition};
use crate::domain::{CatalogVersion, HardwareId, PromoId, TariffId};
use crate::errors::{
    CatalogIntegrityError, EngineError, ValidationError, DUPLICATE_ID, UNKNOWN_CATALOG_VERSION,
    UNKNOWN_HARDWARE, UNKNOWN_PROMOTION, UNKNOWN_TARIFF,
};

/// Import shape produced by importer collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecords {
    pub version: CatalogVersion,
    #[serde(default)]
    pub tariffs: Vec<TariffDefinition>,
    #[serde(default)]
    pub hardware: Vec<HardwareItem>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
    #[serde(default)]
    pub discounts: Vec<DiscountRule>,
    #[serde(default)]
    pub commissions: Vec<CommissionRule>,
    #[serde(default)]
    pub sub_variants: Vec<SubVariantRule>,
}

/// Symmetric promotion exclusion relation stored as normalized `(low, high)` pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionGraph {
    pairs: BTreeSet<(PromoId, PromoId)>,
}

impl ExclusionGraph {
    pub fn insert(&mut self, a: &PromoId, b: &PromoId) {
        if a != b {
            self.pairs.insert(normalize(a, b));
        }
    }

    pub fn excludes(&self, a: &PromoId, b: &PromoId) -> bool {
        self.pairs.contains(&normalize(a, b))
    }

    /// First excluded pair among `promos`, scanning in sorted order.
    pub fn first_conflict<'a>(&self, promos: &'a [PromoId]) -> Option<(&'a PromoId, &'a PromoId)> {
        let mut sorted: Vec<&PromoId> = promos.iter().collect();
        sorted.sort();
        sorted.dedup();
        for (index, first) in sorted.iter().enumerate() {
            for second in &sorted[index + 1..] {
                if self.excludes(first, second) {
                    return Some((first, second));
                }
            }
        }
        None
    }

    pub fn neighbours<'a>(&'a self, promo: &'a PromoId) -> impl Iterator<Item = &'a PromoId> + 'a {
        self.pairs.iter().filter_map(move |(low, high)| {
            if low == promo {
                Some(high)
            } else if high == promo {
                Some(low)
            } else {
                None
            }
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn normalize(a: &PromoId, b: &PromoId) -> (PromoId, PromoId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub version: CatalogVersion,
    pub tariffs: usize,
    pub hardware: usize,
    pub promotions: usize,
    pub discounts: usize,
    pub commissions: usize,
    pub sub_variants: usize,
    pub exclusion_pairs: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogSnapshot {
    version: CatalogVersion,
    tariffs: BTreeMap<TariffId, TariffDefinition>,
    hardware: BTreeMap<HardwareId, HardwareItem>,
    promotions: BTreeMap<PromoId, Promotion>,
    discounts: Vec<DiscountRule>,
    commissions: Vec<CommissionRule>,
    sub_variants: Vec<SubVariantRule>,
    exclusions: ExclusionGraph,
}

impl CatalogSnapshot {
    /// Validates `records` and freezes them into a snapshot.
    pub fn from_records(records: CatalogRecords) -> Result<Self, CatalogIntegrityError> {
        let defects = integrity::check_records(&records);
        if !defects.is_empty() {
            warn!(
                event_name = "catalog.snapshot.rejected",
                catalog_version = %records.version,
                defect_count = defects.len(),
                "catalog snapshot failed integrity checks"
            );
            return Err(CatalogIntegrityError { version: records.version, defects });
        }

        let mut exclusions = ExclusionGraph::default();
        for promotion in &records.promotions {
            for excluded in &promotion.excludes {
                exclusions.insert(&promotion.id, excluded);
            }
        }
        let mut groups: BTreeMap<&str, Vec<&PromoId>> = BTreeMap::new();
        for promotion in &records.promotions {
            if let Some(group) = promotion.exclusive_group.as_deref() {
                groups.entry(group).or_default().push(&promotion.id);
            }
        }
        for members in groups.values() {
            for (index, first) in members.iter().enumerate() {
                for second in &members[index + 1..] {
                    exclusions.insert(first, second);
                }
            }
        }

        let mut discounts = records.discounts;
        discounts.sort_by_key(|rule| rule.priority);

        let snapshot = Self {
            version: records.version,
            tariffs: records
                .tariffs
                .into_iter()
                .map(|tariff| (tariff.id.clone(), tariff))
                .collect(),
            hardware: records.hardware.into_iter().map(|item| (item.id.clone(), item)).collect(),
            promotions: records
                .promotions
                .into_iter()
                .map(|promotion| (promotion.id.clone(), promotion))
                .collect(),
            discounts,
            commissions: records.commissions,
            sub_variants: records.sub_variants,
            exclusions,
        };

        info!(
            event_name = "catalog.snapshot.loaded",
            catalog_version = %snapshot.version,
            tariffs = snapshot.tariffs.len(),
            promotions = snapshot.promotions.len(),
            exclusion_pairs = snapshot.exclusions.len(),
            "catalog snapshot loaded"
        );
        Ok(snapshot)
    }

    pub fn version(&self) -> &CatalogVersion {
        &self.version
    }

    pub fn tariff(&self, id: &TariffId) -> Result<&TariffDefinition, EngineError> {
        self.tariffs.get(id).ok_or_else(|| {
            EngineError::validation(UNKNOWN_TARIFF, format!("unknown tariff `{id}`"))
        })
    }

    pub fn hardware(&self, id: &HardwareId) -> Result<&HardwareItem, EngineError> {
        self.hardware.get(id).ok_or_else(|| {
            EngineError::validation(UNKNOWN_HARDWARE, format!("unknown hardware `{id}`"))
        })
    }

    pub fn promotion(&self, id: &PromoId) -> Result<&Promotion, EngineError> {
        self.promotions.get(id).ok_or_else(|| {
            EngineError::validation(UNKNOWN_PROMOTION, format!("unknown promotion `{id}`"))
        })
    }

    pub fn tariffs(&self) -> impl Iterator<Item = &TariffDefinition> {
        self.tariffs.values()
    }

    pub fn hardware_items(&self) -> impl Iterator<Item = &HardwareItem> {
        self.hardware.values()
    }

    pub fn promotions(&self) -> impl Iterator<Item = &Promotion> {
        self.promotions.values()
    }

    /// Discount rules in ascending stacking order.
    pub fn discount_rules(&self) -> &[DiscountRule] {
        &self.discounts
    }

    pub fn commission_rules(&self) -> &[CommissionRule] {
        &self.commissions
    }

    pub fn sub_variant_rules(&self) -> &[SubVariantRule] {
        &self.sub_variants
    }

    pub fn exclusions(&self) -> &ExclusionGraph {
        &self.exclusions
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            version: self.version.clone(),
            tariffs: self.tariffs.len(),
            hardware: self.hardware.len(),
            promotions: self.promotions.len(),
            discounts: self.discounts.len(),
            commissions: self.commissions.len(),
            sub_variants: self.sub_variants.len(),
            exclusion_pairs: self.exclusions.len(),
        }
    }
}

/// Coexisting snapshots selected by an explicit version key.
#[derive(Clone, Debug, Default)]
pub struct CatalogRepository {
    snapshots: BTreeMap<CatalogVersion, Arc<CatalogSnapshot>>,
}

impl CatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a snapshot; a version can only be registered once.
    pub fn load(
        &mut self,
        records: CatalogRecords,
    ) -> Result<Arc<CatalogSnapshot>, CatalogIntegrityError> {
        if self.snapshots.contains_key(&records.version) {
            return Err(CatalogIntegrityError {
                defects: vec![ValidationError::new(
                    DUPLICATE_ID,
                    format!("catalog version `{}` is already loaded", records.version),
                )],
                version: records.version,
            });
        }
        let snapshot = Arc::new(CatalogSnapshot::from_records(records)?);
        self.snapshots.insert(snapshot.version().clone(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn get(&self, version: &CatalogVersion) -> Result<Arc<CatalogSnapshot>, EngineError> {
        self.snapshots.get(version).cloned().ok_or_else(|| {
            EngineError::validation(
                UNKNOWN_CATALOG_VERSION,
                format!("catalog version `{version}` is not loaded"),
            )
        })
    }

    pub fn versions(&self) -> impl Iterator<Item = &CatalogVersion> {
        self.snapshots.keys()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
