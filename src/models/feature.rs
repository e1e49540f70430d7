//! Reference-side types: administrative codes, feature levels and the
//! boundary geometry carried by each reference row.

use geo::{BoundingRect, MultiPolygon};
use serde::{Deserialize, Serialize};

use super::RegionLevel;

/// Boundary geometry of one administrative area.
///
/// Single polygons are lifted into a one-member multipolygon at load time, so
/// consumers only ever see this one shape type.
pub type Boundary = MultiPolygon<f64>;

/// Administrative code (adcode), the join key between levels.
///
/// Stored as text so that codes read from string and numeric columns compare
/// equal (`"130000"` and `130000` are the same code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdCode(String);

impl AdCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AdCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AdCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<u64> for AdCode {
    fn from(code: u64) -> Self {
        Self(code.to_string())
    }
}

/// Which reference collection a feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLevel {
    /// Country outline; loaded for completeness, never matched against.
    Country,
    Province,
    City,
    District,
}

impl FeatureLevel {
    /// The reference collection that region nodes of `level` are matched against.
    pub fn for_region(level: RegionLevel) -> Self {
        match level {
            RegionLevel::Province => FeatureLevel::Province,
            RegionLevel::City => FeatureLevel::City,
            RegionLevel::District => FeatureLevel::District,
        }
    }

    /// The three collections the linker cannot run without
    pub fn required() -> &'static [FeatureLevel] {
        &[
            FeatureLevel::Province,
            FeatureLevel::City,
            FeatureLevel::District,
        ]
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            FeatureLevel::Country => "country",
            FeatureLevel::Province => "province",
            FeatureLevel::City => "city",
            FeatureLevel::District => "district",
        }
    }
}

impl std::fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.field_name())
    }
}

/// One row of a reference collection.
#[derive(Debug, Clone)]
pub struct GeoFeature {
    /// Name as stored in the reference data
    pub name: String,
    /// Normalized matching key, computed once at load time
    pub key: String,
    pub own_code: AdCode,
    /// Code of the enclosing feature; absent for provinces and countries
    pub parent_code: Option<AdCode>,
    pub geometry: Option<Boundary>,
}

impl GeoFeature {
    pub fn new(
        name: impl Into<String>,
        own_code: AdCode,
        parent_code: Option<AdCode>,
        geometry: Option<Boundary>,
    ) -> Self {
        let name = name.into();
        Self {
            key: crate::normalize::normalize_name(&name).to_string(),
            name,
            own_code,
            parent_code,
            geometry,
        }
    }

    /// Get the bounding box of this feature's boundary
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry.as_ref().and_then(boundary_bbox)
    }
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of a boundary.
pub fn boundary_bbox(boundary: &Boundary) -> Option<(f64, f64, f64, f64)> {
    boundary
        .bounding_rect()
        .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
}
