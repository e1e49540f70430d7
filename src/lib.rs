//! Jiuyu - gazetteer document parsing and administrative-code linking
//!
//! This library provides the region tree, the document parser, reference
//! data loading and the hierarchical linker used by the `gazetteer` binary.

pub mod document;
pub mod error;
pub mod link;
pub mod models;
pub mod normalize;
pub mod reference;

pub use document::{parse_document, parse_str};
pub use error::{DocumentReadError, ReferenceDataError, SchemaError};
pub use link::{link, LinkReport};
pub use models::{AdCode, Boundary, FeatureLevel, RegionLevel, RegionNode, RegionTree};
pub use reference::GeoReference;
