//! Reprojection between coordinate reference systems

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Coord, LineString, MapCoords};

use crate::{Error, model::Crs};

/// Semi-major axis of the WGS84 ellipsoid, used as the sphere radius
const EARTH_RADIUS: f64 = 6_378_137.0;
/// Latitude bound of the square Web Mercator world
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Service able to move line geometry between reference systems.
///
/// Implementations must preserve topology: coordinates that are equal before
/// reprojection stay equal afterwards.
pub trait Reprojector: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::Reprojection`] when the pair of systems is not
    /// supported or a coordinate cannot be transformed.
    fn reproject(
        &self,
        geometry: &LineString<f64>,
        from: Crs,
        to: Crs,
    ) -> Result<LineString<f64>, Error>;

    /// Whether `reproject` can handle the pair at all. Implementations that
    /// cannot tell in advance keep the default.
    fn supports(&self, _from: Crs, _to: Crs) -> bool {
        true
    }
}

/// Built-in reprojector covering WGS84 and spherical Web Mercator
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalMercator;

impl SphericalMercator {
    pub fn forward(coord: Coord<f64>) -> Coord<f64> {
        let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        Coord {
            x: EARTH_RADIUS * coord.x.to_radians(),
            y: EARTH_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln(),
        }
    }

    pub fn inverse(coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (coord.x / EARTH_RADIUS).to_degrees(),
            y: (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees(),
        }
    }
}

impl Reprojector for SphericalMercator {
    fn supports(&self, from: Crs, to: Crs) -> bool {
        from == to
            || matches!(
                (from, to),
                (Crs::Geographic, Crs::WebMercator) | (Crs::WebMercator, Crs::Geographic)
            )
    }

    fn reproject(
        &self,
        geometry: &LineString<f64>,
        from: Crs,
        to: Crs,
    ) -> Result<LineString<f64>, Error> {
        match (from, to) {
            _ if from == to => Ok(geometry.clone()),
            (Crs::Geographic, Crs::WebMercator) => Ok(geometry.map_coords(Self::forward)),
            (Crs::WebMercator, Crs::Geographic) => Ok(geometry.map_coords(Self::inverse)),
            _ => Err(Error::Reprojection {
                from,
                to,
                reason: "only EPSG:4326 <-> EPSG:3857 is supported by the built-in reprojector"
                    .to_string(),
            }),
        }
    }
}
