//! Point geometries read from tabular rows.

use crate::import::Row;
use biosys_common::model::geometry::Point;
use thiserror::Error;

pub const LATITUDE_COLUMNS: [&str; 2] = ["latitude", "lat"];
pub const LONGITUDE_COLUMNS: [&str; 4] = ["longitude", "long", "lon", "lng"];
pub const DATUM_COLUMNS: [&str; 1] = ["datum"];

/// SRID of record geometries when the row names no datum (WGS84).
pub const MODEL_SRID: i32 = 4326;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{0} is missing")]
    Missing(&'static str),
    #[error("{field} '{value}' is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("unsupported datum '{0}'")]
    UnknownDatum(String),
}

/// Maps a datum name (`WGS84`, `GDA94`, ...) or an `EPSG:n` code to an SRID.
pub fn datum_to_srid(datum: &str) -> Result<i32, GeometryError> {
    let normalized = datum.trim().to_uppercase().replace([' ', '_', '-'], "");
    let srid = match normalized.as_str() {
        "WGS84" => 4326,
        "GDA94" => 4283,
        "GDA2020" => 7844,
        "AGD84" => 4203,
        "AGD66" => 4202,
        other => other
            .strip_prefix("EPSG:")
            .unwrap_or(other)
            .parse::<i32>()
            .ok()
            .filter(|srid| *srid > 0)
            .ok_or_else(|| GeometryError::UnknownDatum(datum.to_string()))?,
    };
    Ok(srid)
}

pub(crate) fn parse_coordinate(field: &'static str, value: &str) -> Result<f64, GeometryError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GeometryError::NotANumber {
            field,
            value: value.to_string(),
        })
}

/// Builds a point after checking latitude and longitude bounds.
pub fn point_from_lat_lon(latitude: f64, longitude: f64, srid: i32) -> Result<Point, GeometryError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(GeometryError::OutOfRange {
            field: "latitude",
            value: latitude,
        });
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(GeometryError::OutOfRange {
            field: "longitude",
            value: longitude,
        });
    }
    Ok(Point::new(srid, longitude, latitude))
}

/// Reads a point from the conventional latitude/longitude/datum columns of
/// a row, falling back to a default datum.
pub struct PointParser<'a> {
    row: &'a Row,
    default_datum: i32,
}

impl<'a> PointParser<'a> {
    pub fn new(row: &'a Row, default_datum: i32) -> Self {
        PointParser { row, default_datum }
    }

    pub fn to_geom(&self) -> Result<Point, GeometryError> {
        let latitude = self
            .row
            .get_value(&LATITUDE_COLUMNS)
            .ok_or(GeometryError::Missing("latitude"))?;
        let longitude = self
            .row
            .get_value(&LONGITUDE_COLUMNS)
            .ok_or(GeometryError::Missing("longitude"))?;
        let srid = match self.row.get_value(&DATUM_COLUMNS) {
            Some(datum) => datum_to_srid(datum)?,
            None => self.default_datum,
        };
        point_from_lat_lon(
            parse_coordinate("latitude", latitude)?,
            parse_coordinate("longitude", longitude)?,
            srid,
        )
    }
}
