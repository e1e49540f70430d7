//! Parent-indexed reference collections.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::geojson::{read_collection, RawFeature};
use crate::error::{ReferenceDataError, SchemaError};
use crate::models::{AdCode, FeatureLevel, GeoFeature};
use crate::normalize::normalize_name;

/// Property names a level reads from its collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelColumns {
    pub name: String,
    pub code: String,
    /// Join key to the level above; `None` for top-level collections
    #[serde(default)]
    pub parent_code: Option<String>,
}

impl LevelColumns {
    pub fn new(name: &str, code: &str, parent_code: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            parent_code: parent_code.map(str::to_string),
        }
    }

    /// Column names of the standard administrative-division layers.
    pub fn defaults(level: FeatureLevel) -> Self {
        match level {
            FeatureLevel::Country => Self::new("name", "adcode", None),
            FeatureLevel::Province => Self::new("pr_name", "pr_adcode", None),
            FeatureLevel::City => Self::new("ct_name", "ct_adcode", Some("pr_adcode")),
            FeatureLevel::District => Self::new("dt_name", "dt_adcode", Some("ct_adcode")),
        }
    }

    fn required(&self) -> impl Iterator<Item = &str> {
        [Some(self.name.as_str()), Some(self.code.as_str()), self.parent_code.as_deref()]
            .into_iter()
            .flatten()
    }
}

/// All rows of one level, with a parent-code index.
#[derive(Debug, Clone)]
pub struct FeatureCollection {
    level: FeatureLevel,
    features: Vec<GeoFeature>,
    /// Parent code → row indices, each bucket in collection order
    by_parent: HashMap<AdCode, Vec<usize>>,
}

impl FeatureCollection {
    pub fn new(level: FeatureLevel, features: Vec<GeoFeature>) -> Self {
        let mut by_parent: HashMap<AdCode, Vec<usize>> = HashMap::new();
        for (idx, feature) in features.iter().enumerate() {
            if let Some(parent) = &feature.parent_code {
                by_parent.entry(parent.clone()).or_default().push(idx);
            }
        }
        Self {
            level,
            features,
            by_parent,
        }
    }

    /// Validate columns and convert raw rows.
    ///
    /// A column counts as present only if every row carries it. Rows whose
    /// code is null or not a string/number are dropped.
    pub fn from_raw(
        level: FeatureLevel,
        raw: Vec<RawFeature>,
        columns: &LevelColumns,
    ) -> Result<Self, SchemaError> {
        for column in columns.required() {
            if raw.iter().any(|f| !f.properties.contains_key(column)) {
                return Err(SchemaError::MissingColumn {
                    level,
                    column: column.to_string(),
                });
            }
        }

        let mut features = Vec::with_capacity(raw.len());
        for (idx, row) in raw.into_iter().enumerate() {
            let props = &row.properties;
            let Some(own_code) = props.get(&columns.code).and_then(code_from_value) else {
                debug!("Dropping {} row #{}: no usable code", level, idx);
                continue;
            };
            let parent_code = columns
                .parent_code
                .as_ref()
                .and_then(|col| props.get(col))
                .and_then(code_from_value);
            let name = props.get(&columns.name).map(text_from_value).unwrap_or_default();
            features.push(GeoFeature::new(name, own_code, parent_code, row.geometry));
        }

        Ok(Self::new(level, features))
    }

    pub fn level(&self) -> FeatureLevel {
        self.level
    }

    pub fn features(&self) -> &[GeoFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// First row, in collection order, whose key equals the normalized `name`.
    pub fn first_named(&self, name: &str) -> Option<&GeoFeature> {
        let key = normalize_name(name);
        self.features.iter().find(|f| f.key == key)
    }

    /// Rows whose parent code is `parent`, in collection order.
    pub fn children_of<'a>(&'a self, parent: &AdCode) -> impl Iterator<Item = &'a GeoFeature> + 'a {
        self.by_parent
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |&idx| &self.features[idx])
    }

    /// First row under `parent` whose key equals the normalized `name`.
    pub fn first_child_named(&self, parent: &AdCode, name: &str) -> Option<&GeoFeature> {
        let key = normalize_name(name);
        self.children_of(parent).find(|f| f.key == key)
    }
}

fn code_from_value(value: &Value) -> Option<AdCode> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| AdCode::new(s))
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(AdCode::new(i.to_string()))
            } else if let Some(u) = n.as_u64() {
                Some(AdCode::from(u))
            } else {
                // Shapefile-derived layers often store codes as doubles
                let f = n.as_f64()?;
                if f.fract() == 0.0 {
                    Some(AdCode::new(format!("{f:.0}")))
                } else {
                    Some(AdCode::new(f.to_string()))
                }
            }
        }
        _ => None,
    }
}

fn text_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Load state of one reference level.
#[derive(Debug, Clone, Default)]
pub enum ReferenceLevel {
    /// Not loaded (file absent or unreadable)
    #[default]
    Missing,
    /// Loaded, but a required column is absent
    Unusable(SchemaError),
    Ready(FeatureCollection),
}

impl ReferenceLevel {
    pub fn collection(&self) -> Option<&FeatureCollection> {
        match self {
            ReferenceLevel::Ready(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Where to load one level from.
#[derive(Debug, Clone)]
pub struct LevelSource {
    pub level: FeatureLevel,
    pub path: PathBuf,
    pub columns: LevelColumns,
}

/// The per-level reference collections used by the linker.
#[derive(Debug, Clone, Default)]
pub struct GeoReference {
    country: ReferenceLevel,
    province: ReferenceLevel,
    city: ReferenceLevel,
    district: ReferenceLevel,
}

impl GeoReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for one level
    pub fn with(mut self, level: FeatureLevel, data: ReferenceLevel) -> Self {
        self.set(level, data);
        self
    }

    /// Builder-style setter for a ready collection
    pub fn with_collection(self, collection: FeatureCollection) -> Self {
        let level = collection.level();
        self.with(level, ReferenceLevel::Ready(collection))
    }

    pub fn set(&mut self, level: FeatureLevel, data: ReferenceLevel) {
        match level {
            FeatureLevel::Country => self.country = data,
            FeatureLevel::Province => self.province = data,
            FeatureLevel::City => self.city = data,
            FeatureLevel::District => self.district = data,
        }
    }

    pub fn get(&self, level: FeatureLevel) -> &ReferenceLevel {
        match level {
            FeatureLevel::Country => &self.country,
            FeatureLevel::Province => &self.province,
            FeatureLevel::City => &self.city,
            FeatureLevel::District => &self.district,
        }
    }

    /// Load every listed level. Failures are logged and leave that level
    /// `Missing`; they never abort loading of the other levels.
    pub fn load(sources: &[LevelSource]) -> Self {
        let mut reference = Self::new();
        for source in sources {
            match load_level(&source.path, source.level, &source.columns) {
                Ok(data) => reference.set(source.level, data),
                Err(e) => warn!("{}", e),
            }
        }
        reference
    }
}

/// Load and validate one level.
///
/// A file that does not exist yields `Missing`; read and parse failures are
/// returned as errors.
pub fn load_level(
    path: &Path,
    level: FeatureLevel,
    columns: &LevelColumns,
) -> Result<ReferenceLevel, ReferenceDataError> {
    if !path.exists() {
        warn!("{} collection not found at {}", level, path.display());
        return Ok(ReferenceLevel::Missing);
    }

    let raw = read_collection(path, level)?;
    match FeatureCollection::from_raw(level, raw, columns) {
        Ok(collection) => {
            info!("Loaded {} {} features", collection.len(), level);
            Ok(ReferenceLevel::Ready(collection))
        }
        Err(e) => {
            warn!("{}; {} level will not be linked", e, level);
            Ok(ReferenceLevel::Unusable(e))
        }
    }
}
