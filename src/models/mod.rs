//! Core data models: the Region Tree and the reference features it links to.

pub mod feature;
pub mod region;

pub use feature::{boundary_bbox, AdCode, Boundary, FeatureLevel, GeoFeature};
pub use region::{RegionLevel, RegionNode, RegionTree, TextField, Walk};
