//! Error taxonomy for the parse → load → link pipeline.
//!
//! Only [`DocumentReadError`] is meant to stop a run. Reference and schema
//! errors degrade to a partially linked (or unlinked) tree. A name that has no
//! match in its candidate set is not an error at all; it is counted in
//! [`crate::link::LinkReport`].

use std::path::PathBuf;

use thiserror::Error;

use crate::models::FeatureLevel;

/// The gazetteer document could not be read.
#[derive(Debug, Error)]
pub enum DocumentReadError {
    #[error("cannot read document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document {path} is not valid UTF-8 (byte offset {offset})")]
    Undecodable { path: PathBuf, offset: usize },
}

/// Reference collections are missing, empty or unreadable.
#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error("{0} collection is not loaded")]
    MissingCollection(FeatureLevel),

    #[error("{0} collection has no features")]
    EmptyCollection(FeatureLevel),

    #[error("cannot read {level} collection {path}: {source}")]
    Io {
        level: FeatureLevel,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed GeoJSON in {level} collection {path}: {source}")]
    Json {
        level: FeatureLevel,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A collection lacks a column its level needs for matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{level} collection is missing column '{column}'")]
    MissingColumn { level: FeatureLevel, column: String },
}
