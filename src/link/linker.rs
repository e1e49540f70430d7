//! Two-pass hierarchical linker.
//!
//! Pass 1 walks the tree top-down and resolves each node's own code and
//! geometry. Provinces are matched against the whole province collection;
//! cities and districts only against rows whose parent code equals their
//! parent node's resolved code. A node whose parent did not resolve is left
//! alone.
//!
//! Pass 2 records the parent's code on every child once both ends resolved.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ReferenceDataError;
use crate::models::{FeatureLevel, GeoFeature, RegionLevel, RegionNode, RegionTree};
use crate::reference::{FeatureCollection, GeoReference, ReferenceLevel};

/// Per-level counts from one linking run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    /// Nodes that matched a reference row
    pub linked: usize,
    /// Nodes with a resolved parent (or no parent) but no matching row
    pub missed: usize,
    /// Nodes not attempted because their parent is unlinked
    pub orphaned: usize,
    /// The level's collection was unusable and linking was skipped
    pub skipped: bool,
}

impl LevelStats {
    pub fn total(&self) -> usize {
        self.linked + self.missed + self.orphaned
    }
}

/// Outcome of [`link`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub province: LevelStats,
    pub city: LevelStats,
    pub district: LevelStats,
    /// Nodes that received a `parent_adcode` in pass 2
    pub parent_codes_set: usize,
}

impl LinkReport {
    pub fn level(&self, level: RegionLevel) -> &LevelStats {
        match level {
            RegionLevel::Province => &self.province,
            RegionLevel::City => &self.city,
            RegionLevel::District => &self.district,
        }
    }

    fn level_mut(&mut self, level: RegionLevel) -> &mut LevelStats {
        match level {
            RegionLevel::Province => &mut self.province,
            RegionLevel::City => &mut self.city,
            RegionLevel::District => &mut self.district,
        }
    }

    pub fn total_linked(&self) -> usize {
        self.province.linked + self.city.linked + self.district.linked
    }
}

/// Usable collection per tree level; `None` where the level is skipped.
struct Candidates<'a> {
    province: Option<&'a FeatureCollection>,
    city: Option<&'a FeatureCollection>,
    district: Option<&'a FeatureCollection>,
}

impl<'a> Candidates<'a> {
    /// Check the three required collections and pick the usable ones.
    fn select(
        reference: &'a GeoReference,
        report: &mut LinkReport,
    ) -> Result<Self, ReferenceDataError> {
        for &level in FeatureLevel::required() {
            match reference.get(level) {
                ReferenceLevel::Missing => {
                    return Err(ReferenceDataError::MissingCollection(level));
                }
                ReferenceLevel::Ready(collection) if collection.is_empty() => {
                    return Err(ReferenceDataError::EmptyCollection(level));
                }
                _ => {}
            }
        }

        let mut usable = |region: RegionLevel| {
            let level = FeatureLevel::for_region(region);
            let collection = reference.get(level).collection();
            if collection.is_none() {
                warn!("Skipping {} linking: collection schema is unusable", level);
                report.level_mut(region).skipped = true;
            }
            collection
        };

        Ok(Self {
            province: usable(RegionLevel::Province),
            city: usable(RegionLevel::City),
            district: usable(RegionLevel::District),
        })
    }
}

/// Link every node of `tree` against `reference`.
///
/// If a required collection is missing or empty the tree is left untouched
/// and the error is returned for the caller to report; linking failures at a
/// single node or level never abort the rest of the tree. Running twice on
/// the same inputs gives the same result.
pub fn link(tree: &mut RegionTree, reference: &GeoReference) -> Result<LinkReport, ReferenceDataError> {
    let mut report = LinkReport::default();
    if tree.is_empty() {
        return Ok(report);
    }

    let candidates = match Candidates::select(reference, &mut report) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Aborting linking, tree left unlinked: {}", e);
            return Err(e);
        }
    };

    for province in tree.provinces_mut().iter_mut() {
        clear_links(province);
    }

    // Pass 1: own code and geometry, parent-scoped
    for province in tree.provinces_mut().iter_mut() {
        let hit = candidates
            .province
            .and_then(|c| c.first_named(&province.name));
        resolve(province, hit, candidates.province.is_some(), &mut report);

        let Some(province_code) = province.adcode.clone() else {
            orphan_children(province, &mut report);
            continue;
        };

        for city in province.children.iter_mut() {
            let hit = candidates
                .city
                .and_then(|c| c.first_child_named(&province_code, &city.name));
            resolve(city, hit, candidates.city.is_some(), &mut report);

            let Some(city_code) = city.adcode.clone() else {
                orphan_children(city, &mut report);
                continue;
            };

            for district in city.children.iter_mut() {
                let hit = candidates
                    .district
                    .and_then(|c| c.first_child_named(&city_code, &district.name));
                resolve(district, hit, candidates.district.is_some(), &mut report);
            }
        }
    }

    // Pass 2: parent codes, only once both ends are final
    for province in tree.provinces_mut().iter_mut() {
        report.parent_codes_set += propagate_parent_code(province);
        for city in province.children.iter_mut() {
            report.parent_codes_set += propagate_parent_code(city);
        }
    }

    info!(
        "Linked {} provinces, {} cities, {} districts ({} parent codes)",
        report.province.linked, report.city.linked, report.district.linked, report.parent_codes_set
    );
    Ok(report)
}

fn resolve(
    node: &mut RegionNode,
    hit: Option<&GeoFeature>,
    attempted: bool,
    report: &mut LinkReport,
) {
    let stats = report.level_mut(node.level);
    match hit {
        Some(feature) => {
            node.adcode = Some(feature.own_code.clone());
            node.geometry = feature.geometry.clone();
            stats.linked += 1;
            debug!("Linked {} '{}' to {}", node.level.label(), node.name, feature.own_code);
        }
        None if attempted => {
            stats.missed += 1;
            debug!(
                "No match for {} '{}' (parent '{}')",
                node.level.label(),
                node.name,
                node.parent_name.as_deref().unwrap_or("-")
            );
        }
        None => {}
    }
}

/// Drop results of an earlier run so only this run's matches remain.
fn clear_links(node: &mut RegionNode) {
    node.adcode = None;
    node.parent_adcode = None;
    node.geometry = None;
    for child in node.children.iter_mut() {
        clear_links(child);
    }
}

/// Count every descendant of an unlinked node as orphaned.
fn orphan_children(node: &RegionNode, report: &mut LinkReport) {
    for child in &node.children {
        report.level_mut(child.level).orphaned += 1;
        orphan_children(child, report);
    }
}

/// Set `parent_adcode` on each child of `parent` that resolved, if
/// `parent` resolved. Returns how many children were updated.
fn propagate_parent_code(parent: &mut RegionNode) -> usize {
    let Some(code) = parent.adcode.as_ref() else {
        return 0;
    };
    let mut updated = 0;
    for child in parent.children.iter_mut().filter(|c| c.is_linked()) {
        child.parent_adcode = Some(code.clone());
        updated += 1;
    }
    updated
}
