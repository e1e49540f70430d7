//! GeoJSON FeatureCollection reading.
//!
//! Only what the linker needs is kept: the property map of each feature and
//! its polygonal boundary. Features with any other geometry type keep their
//! properties and load without a boundary. `.gz` files are decompressed on
//! the fly.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::ReferenceDataError;
use crate::models::{Boundary, FeatureLevel};

/// One feature as read from disk, before column validation.
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub properties: Map<String, Value>,
    pub geometry: Option<Boundary>,
}

#[derive(Deserialize)]
struct FeatureCollectionDoc {
    features: Vec<FeatureDoc>,
}

#[derive(Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<GeometryDoc>,
}

type Position = Vec<f64>;
type Ring = Vec<Position>;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum GeometryDoc {
    Polygon {
        coordinates: Vec<Ring>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    #[serde(other)]
    Unsupported,
}

impl GeometryDoc {
    /// `None` for non-polygonal geometry types.
    fn into_boundary(self) -> Option<Boundary> {
        match self {
            GeometryDoc::Polygon { coordinates } => {
                Some(MultiPolygon::new(to_polygon(coordinates).into_iter().collect()))
            }
            GeometryDoc::MultiPolygon { coordinates } => Some(MultiPolygon::new(
                coordinates.into_iter().filter_map(to_polygon).collect(),
            )),
            GeometryDoc::Unsupported => None,
        }
    }
}

fn to_ring(ring: Ring) -> LineString<f64> {
    ring.into_iter()
        .filter(|pos| pos.len() >= 2)
        .map(|pos| Coord {
            x: pos[0],
            y: pos[1],
        })
        .collect()
}

fn to_polygon(rings: Vec<Ring>) -> Option<Polygon<f64>> {
    let mut rings = rings.into_iter().map(to_ring);
    let exterior = rings.next()?;
    Some(Polygon::new(exterior, rings.collect()))
}

/// Parse a FeatureCollection from any reader.
pub fn parse_collection<R: Read>(
    reader: R,
    level: FeatureLevel,
    path: &Path,
) -> Result<Vec<RawFeature>, ReferenceDataError> {
    let doc: FeatureCollectionDoc =
        serde_json::from_reader(reader).map_err(|source| ReferenceDataError::Json {
            level,
            path: path.to_path_buf(),
            source,
        })?;

    let features = doc
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            let geometry = feature.geometry.and_then(|geometry| {
                let boundary = geometry.into_boundary();
                if boundary.is_none() {
                    warn!(
                        "{} feature #{} has unsupported geometry type, loading it without boundary",
                        level, index
                    );
                }
                boundary
            });
            RawFeature {
                properties: feature.properties.unwrap_or_default(),
                geometry,
            }
        })
        .collect();
    Ok(features)
}

/// Read a FeatureCollection file, decompressing `.gz` files.
pub fn read_collection(
    path: &Path,
    level: FeatureLevel,
) -> Result<Vec<RawFeature>, ReferenceDataError> {
    info!("Loading {} collection from {}", level, path.display());

    let file = File::open(path).map_err(|source| ReferenceDataError::Io {
        level,
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |e| e == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let features = parse_collection(BufReader::new(reader), level, path)?;
    info!("Read {} {} features", features.len(), level);
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"pr_name": "河北省", "pr_adcode": 130000},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[113.5, 36.0], [119.8, 36.0], [119.8, 42.6], [113.5, 36.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"pr_name": "海南省", "pr_adcode": "460000"},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[108.6, 18.1, 0.0], [111.0, 18.1, 0.0], [111.0, 20.1, 0.0], [108.6, 18.1, 0.0]]],
                        [[[112.0, 16.0], [112.5, 16.0], [112.5, 16.5], [112.0, 16.0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_polygon_and_multipolygon() {
        let features =
            parse_collection(SAMPLE.as_bytes(), FeatureLevel::Province, Path::new("mem")).unwrap();
        assert_eq!(features.len(), 3);

        assert_eq!(features[0].properties["pr_name"], "河北省");
        assert_eq!(features[0].geometry.as_ref().unwrap().0.len(), 1);

        let hainan = features[1].geometry.as_ref().unwrap();
        assert_eq!(hainan.0.len(), 2);
        assert_eq!(hainan.0[0].exterior().0[1], Coord { x: 111.0, y: 18.1 });

        assert!(features[2].properties.is_empty());
        assert!(features[2].geometry.is_none());
    }

    #[test]
    fn test_unsupported_geometry_keeps_row_without_boundary() {
        let doc = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"ct_name": "石家庄市"}, "geometry": {"type": "Point", "coordinates": [114.5, 38.0]}},
            {"type": "Feature", "properties": {"ct_name": "保定市"}, "geometry": {"type": "Polygon", "coordinates": [[[115.0, 38.5], [116.0, 38.5], [116.0, 39.5], [115.0, 38.5]]]}}
        ]}"#;
        let features =
            parse_collection(doc.as_bytes(), FeatureLevel::City, Path::new("mem")).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].properties["ct_name"], "石家庄市");
        assert!(features[0].geometry.is_none());
        assert!(features[1].geometry.is_some());
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_collection("{".as_bytes(), FeatureLevel::City, Path::new("mem")).unwrap_err();
        assert!(matches!(err, ReferenceDataError::Json { .. }));
    }

    #[test]
    fn test_read_gzipped_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("province.geojson.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let features = read_collection(&path, FeatureLevel::Province).unwrap();
        assert_eq!(features.len(), 3);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_collection(&dir.path().join("none.geojson"), FeatureLevel::District)
            .unwrap_err();
        assert!(matches!(err, ReferenceDataError::Io { .. }));
    }
}
