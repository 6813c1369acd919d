pub mod boundaries;
pub mod cases;

use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Outline layer drawn beneath the choropleth
#[derive(Clone, Debug, Default)]
pub struct BaseMap {
    pub lines: Vec<LineString>,
}

impl BaseMap {
    /// Load `{assets}/base.json` if present, else the built-in outline.
    pub fn load_or_default(assets: &Path) -> Self {
        let path = assets.join("base.json");
        if path.exists() {
            match load_base_lines(&path) {
                Ok(base) if !base.lines.is_empty() => {
                    info!(path = %path.display(), lines = base.lines.len(), "base map loaded");
                    return base;
                }
                Ok(_) => warn!(path = %path.display(), "base map has no lines, using outline"),
                Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "base map unreadable, using outline"),
            }
        }
        Self::outline()
    }

    /// Coarse South America outline
    pub fn outline() -> Self {
        Self {
            lines: vec![vec![
                (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
                (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
                (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
                (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
                (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
                (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
            ]],
        }
    }
}

fn load_base_lines(path: &Path) -> Result<BaseMap> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read base map: {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse base map: {}", path.display()))?;
    Ok(BaseMap {
        lines: outline_lines(&geojson),
    })
}

/// Every line and polygon ring in a GeoJSON document, holes included
fn outline_lines(geojson: &GeoJson) -> Vec<LineString> {
    let geometries: Vec<&Geometry> = match geojson {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .collect(),
        GeoJson::Feature(f) => f.geometry.iter().collect(),
        GeoJson::Geometry(g) => vec![g],
    };

    let mut lines = Vec::new();
    for geometry in geometries {
        push_lines(&geometry.value, &mut lines);
    }
    lines
}

fn push_lines(value: &Value, out: &mut Vec<LineString>) {
    match value {
        Value::LineString(coords) => out.push(to_line(coords)),
        Value::MultiLineString(parts) | Value::Polygon(parts) => {
            out.extend(parts.iter().map(|p| to_line(p)))
        }
        Value::MultiPolygon(polygons) => out.extend(polygons.iter().flatten().map(|r| to_line(r))),
        Value::GeometryCollection(members) => {
            for g in members {
                push_lines(&g.value, out);
            }
        }
        _ => {}
    }
}

fn to_line(coords: &[Vec<f64>]) -> LineString {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_is_closed() {
        let base = BaseMap::outline();
        let line = &base.lines[0];
        assert_eq!(line.first(), line.last());
    }

    #[test]
    fn test_missing_base_falls_back_to_outline() {
        let base = BaseMap::load_or_default(Path::new("/nonexistent/covid-map"));
        assert_eq!(base.lines.len(), BaseMap::outline().lines.len());
    }

    #[test]
    fn test_polygon_rings_become_lines() {
        let geojson: GeoJson = r#"{"type": "MultiPolygon", "coordinates": [
            [[[0,0],[1,0],[1,1],[0,0]], [[0.2,0.2],[0.4,0.2],[0.4,0.4],[0.2,0.2]]],
            [[[5,5],[6,5],[6,6],[5,5]]]
        ]}"#
        .parse()
        .unwrap();
        let lines = outline_lines(&geojson);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2][0], (5.0, 5.0));
    }

    #[test]
    fn test_feature_collection_skips_points() {
        let geojson: GeoJson = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": {"type": "LineString", "coordinates": [[0,0],[1,1]]}},
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [2,2]}},
            {"type": "Feature", "properties": {}, "geometry": null}
        ]}"#
        .parse()
        .unwrap();
        assert_eq!(outline_lines(&geojson), vec![vec![(0.0, 0.0), (1.0, 1.0)]]);
    }
}
