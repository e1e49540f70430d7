//! Geographic reference data: per-level feature collections loaded from
//! GeoJSON and indexed by parent code.

mod collection;
mod geojson;

pub use collection::{
    load_level, FeatureCollection, GeoReference, LevelColumns, LevelSource, ReferenceLevel,
};
pub use geojson::{parse_collection, read_collection, RawFeature};
