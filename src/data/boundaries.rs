use crate::error::FetchError;
use crate::uf::StateCode;
use geojson::{GeoJson, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ring of (lon, lat) points, closed or not
pub type Ring = Vec<(f64, f64)>;

/// Exterior ring first, holes after
pub type Polygon = Vec<Ring>;

/// Geographic bounding box in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Smallest box containing every point; `None` for no points
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc: Option<Bounds>, &(lon, lat)| {
            Some(match acc {
                None => Bounds {
                    min_lon: lon,
                    min_lat: lat,
                    max_lon: lon,
                    max_lat: lat,
                },
                Some(b) => Bounds {
                    min_lon: b.min_lon.min(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lon: b.max_lon.max(lon),
                    max_lat: b.max_lat.max(lat),
                },
            })
        })
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// (lon, lat) midpoint
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Box of `half_span` degrees around a point
    pub fn around(lon: f64, lat: f64, half_span: f64) -> Bounds {
        Bounds {
            min_lon: lon - half_span,
            min_lat: lat - half_span,
            max_lon: lon + half_span,
            max_lat: lat + half_span,
        }
    }
}

/// Boundary of one municipality
#[derive(Clone, Debug)]
pub struct Municipality {
    pub name: String,
    pub polygons: Vec<Polygon>,
    pub bounds: Bounds,
}

impl Municipality {
    pub fn new(name: impl Into<String>, polygons: Vec<Polygon>) -> Option<Self> {
        let bounds = Bounds::of_points(
            polygons
                .iter()
                .filter_map(|rings| rings.first())
                .flat_map(|exterior| exterior.iter()),
        )?;
        Some(Self {
            name: name.into(),
            polygons,
            bounds,
        })
    }

    /// Even-odd point-in-polygon over every ring, so holes are excluded
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if !self.bounds.contains(lon, lat) {
            return false;
        }
        self.polygons.iter().any(|rings| {
            rings
                .iter()
                .filter(|ring| crosses_odd(ring, lon, lat))
                .count()
                % 2
                == 1
        })
    }

    /// Every ring of every polygon
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.polygons.iter().flat_map(|rings| rings.iter())
    }
}

fn crosses_odd(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Union of all municipality bounds
pub fn total_bounds(municipalities: &[Municipality]) -> Option<Bounds> {
    municipalities
        .iter()
        .map(|m| m.bounds)
        .reduce(|a, b| a.union(&b))
}

/// Anything that can produce the municipality boundaries of a state.
pub trait BoundarySource: Send + Sync {
    fn fetch(&self, state: StateCode) -> Result<Vec<Municipality>, FetchError>;
}

/// Boundary files laid out as `{root}/{uf}/map.json`
pub struct AssetBoundaries {
    root: PathBuf,
}

impl AssetBoundaries {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, state: StateCode) -> PathBuf {
        self.root.join(state.lowercase()).join("map.json")
    }
}

impl BoundarySource for AssetBoundaries {
    fn fetch(&self, state: StateCode) -> Result<Vec<Municipality>, FetchError> {
        let path = self.path_for(state);
        let municipalities = load_boundaries(&path)?;
        info!(%state, count = municipalities.len(), "boundaries loaded");
        Ok(municipalities)
    }
}

fn load_boundaries(path: &Path) -> Result<Vec<Municipality>, FetchError> {
    let content = fs::read_to_string(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_boundaries(&content, &path.display().to_string())
}

/// Parse a FeatureCollection whose features carry `properties.name`.
///
/// Features without a name or without polygonal geometry are skipped.
pub fn parse_boundaries(text: &str, origin: &str) -> Result<Vec<Municipality>, FetchError> {
    let geojson: GeoJson = text.parse().map_err(|source| FetchError::GeoJson {
        origin: origin.to_string(),
        source: Box::new(source),
    })?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => Vec::new(),
    };

    let mut municipalities = Vec::with_capacity(features.len());
    let mut skipped = 0usize;

    for feature in features {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let polygons = feature
            .geometry
            .as_ref()
            .map(|g| polygons_of(&g.value))
            .unwrap_or_default();

        match name.and_then(|name| Municipality::new(name, polygons)) {
            Some(m) => municipalities.push(m),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(origin, skipped, "features without name or polygon skipped");
    }
    Ok(municipalities)
}

fn polygons_of(value: &Value) -> Vec<Polygon> {
    let to_ring = |coords: &Vec<Vec<f64>>| -> Ring {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };

    match value {
        Value::Polygon(rings) => vec![rings.iter().map(to_ring).collect()],
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| rings.iter().map(to_ring).collect())
            .collect(),
        Value::GeometryCollection(geometries) => geometries
            .iter()
            .flat_map(|g| polygons_of(&g.value))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two unit squares side by side: Goiânia on the west, Anápolis on the east
    pub(crate) const GO_FIXTURE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "Goiânia"},
                "geometry": {"type": "Polygon", "coordinates": [[[-50.0, -17.0], [-49.0, -17.0], [-49.0, -16.0], [-50.0, -16.0], [-50.0, -17.0]]]}
            },
            {
                "type": "Feature",
                "properties": {"name": "Anápolis"},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[[-49.0, -17.0], [-48.0, -17.0], [-48.0, -16.0], [-49.0, -16.0], [-49.0, -17.0]]]]}
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let ms = parse_boundaries(GO_FIXTURE, "fixture").unwrap();
        assert_eq!(ms.len(), 2);
        assert_eq!(ms[0].name, "Goiânia");
        assert_eq!(ms[1].name, "Anápolis");
        assert_eq!(ms[1].bounds.min_lon, -49.0);
        assert_eq!(ms[1].bounds.max_lon, -48.0);
    }

    #[test]
    fn test_skips_unnamed_and_points() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                {"type": "Feature", "properties": {"name": "Ponto"}, "geometry": {"type": "Point", "coordinates": [0, 0]}}
            ]
        }"#;
        assert!(parse_boundaries(text, "fixture").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_geojson() {
        assert!(matches!(
            parse_boundaries("{\"type\": \"Nope\"}", "fixture"),
            Err(FetchError::GeoJson { .. })
        ));
    }

    #[test]
    fn test_contains_with_hole() {
        let outer = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let hole = vec![(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)];
        let m = Municipality::new("Anel", vec![vec![outer, hole]]).unwrap();
        assert!(m.contains(1.0, 1.0));
        assert!(!m.contains(5.0, 5.0));
        assert!(!m.contains(11.0, 5.0));
    }

    #[test]
    fn test_total_bounds() {
        let ms = parse_boundaries(GO_FIXTURE, "fixture").unwrap();
        let b = total_bounds(&ms).unwrap();
        assert_eq!((b.min_lon, b.max_lon), (-50.0, -48.0));
        assert_eq!((b.min_lat, b.max_lat), (-17.0, -16.0));
        assert!(total_bounds(&[]).is_none());
    }

    #[test]
    fn test_missing_asset_is_io_error() {
        let source = AssetBoundaries::new(std::env::temp_dir().join("covid-map-no-such-dir"));
        assert!(matches!(
            source.fetch(StateCode::GO),
            Err(FetchError::Io { .. })
        ));
    }

    #[test]
    fn test_asset_path_layout() {
        let source = AssetBoundaries::new("assets");
        assert_eq!(
            source.path_for(StateCode::GO),
            Path::new("assets").join("go").join("map.json")
        );
    }

    #[test]
    fn test_reads_asset_file() {
        let root = std::env::temp_dir().join(format!("covid-map-assets-{}", std::process::id()));
        let dir = root.join("go");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("map.json"), GO_FIXTURE).unwrap();

        let ms = AssetBoundaries::new(&root).fetch(StateCode::GO).unwrap();
        assert_eq!(ms.len(), 2);

        let _ = fs::remove_dir_all(&root);
    }
}
