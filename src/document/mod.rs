//! Gazetteer document reading: line classification and tree building.

pub mod classify;
pub mod parser;

pub use classify::{
    city_numerals, classify, LineKind, OpenScope, CITY_GENERAL_MARKER, PROVINCE_GENERAL_MARKER,
};
pub use parser::{parse_document, parse_str, Cursor, DocumentParser, ParseState};
