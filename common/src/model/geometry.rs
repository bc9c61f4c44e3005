use serde::{Deserialize, Serialize};
use std::fmt;

/// A single coordinate pair tagged with its spatial reference id.
///
/// Persisted as EWKT (`SRID=4326;POINT(115.8 -31.9)`) and serialized as a
/// GeoJSON point with an extra `srid` member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "GeoJsonPoint", try_from = "GeoJsonPoint")]
pub struct Point {
    pub srid: i32,
    /// Longitude or easting.
    pub x: f64,
    /// Latitude or northing.
    pub y: f64,
}

impl Point {
    pub fn new(srid: i32, x: f64, y: f64) -> Self {
        Point { srid, x, y }
    }

    pub fn to_ewkt(&self) -> String {
        format!("SRID={};POINT({} {})", self.srid, self.x, self.y)
    }

    /// Parses the EWKT form written by [`Point::to_ewkt`].
    pub fn parse_ewkt(text: &str) -> Option<Self> {
        let (srid, wkt) = text.trim().split_once(';')?;
        let srid = srid.trim().strip_prefix("SRID=")?.parse().ok()?;
        let coords = wkt
            .trim()
            .strip_prefix("POINT")?
            .trim()
            .strip_prefix('(')?
            .strip_suffix(')')?;
        let mut parts = coords.split_whitespace();
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Point { srid, x, y })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ewkt())
    }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
    #[serde(default = "default_srid")]
    srid: i32,
}

fn default_srid() -> i32 {
    crate::model::project::DEFAULT_DATUM
}

impl From<Point> for GeoJsonPoint {
    fn from(point: Point) -> Self {
        GeoJsonPoint {
            kind: "Point".to_string(),
            coordinates: [point.x, point.y],
            srid: point.srid,
        }
    }
}

impl TryFrom<GeoJsonPoint> for Point {
    type Error = String;

    fn try_from(value: GeoJsonPoint) -> Result<Self, Self::Error> {
        if value.kind != "Point" {
            return Err(format!("unsupported geometry type '{}'", value.kind));
        }
        let [x, y] = value.coordinates;
        Ok(Point::new(value.srid, x, y))
    }
}
