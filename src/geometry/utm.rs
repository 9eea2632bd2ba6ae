use std::fmt;
use std::str::FromStr;

use crate::error::GeometryError;

// WGS84 ellipsoid
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A UTM zone on the WGS84 datum, the projection NVDB geometries are served in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCrs {
    pub zone: u8,
    pub north: bool,
}

impl Default for SourceCrs {
    fn default() -> Self {
        // EPSG:32633, UTM zone 33N
        Self { zone: 33, north: true }
    }
}

impl SourceCrs {
    pub fn epsg(&self) -> u32 {
        let base = if self.north { 32600 } else { 32700 };
        base + self.zone as u32
    }

    /// Central meridian in degrees
    fn central_meridian(&self) -> f64 {
        self.zone as f64 * 6.0 - 183.0
    }

    /// Project an easting/northing pair to WGS84 (lat, lng) in degrees
    pub fn to_lat_lng(&self, easting: f64, northing: f64) -> (f64, f64) {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let ep2 = e2 / (1.0 - e2);

        let x = easting - FALSE_EASTING;
        let y = if self.north { northing } else { northing - FALSE_NORTHING_SOUTH };

        // Footpoint latitude
        let m = y / SCALE_FACTOR;
        let mu = m / (SEMI_MAJOR_AXIS * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let (sin_phi, cos_phi) = phi1.sin_cos();
        let tan_phi = phi1.tan();
        let c1 = ep2 * cos_phi * cos_phi;
        let t1 = tan_phi * tan_phi;
        let n1 = SEMI_MAJOR_AXIS / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let r1 = SEMI_MAJOR_AXIS * (1.0 - e2) / (1.0 - e2 * sin_phi * sin_phi).powf(1.5);
        let d = x / (n1 * SCALE_FACTOR);

        let lat = phi1
            - (n1 * tan_phi / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let dlng = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5) / 120.0)
            / cos_phi;

        (lat.to_degrees(), self.central_meridian() + dlng.to_degrees())
    }
}

impl fmt::Display for SourceCrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for SourceCrs {
    type Err = GeometryError;

    /// Accepts `EPSG:326NN` (north) and `EPSG:327NN` (south)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s
            .trim()
            .strip_prefix("EPSG:")
            .and_then(|code| code.parse::<u32>().ok())
            .ok_or_else(|| GeometryError::UnsupportedCrs(s.to_string()))?;

        let (north, zone) = match code {
            32601..=32660 => (true, code - 32600),
            32701..=32760 => (false, code - 32700),
            _ => return Err(GeometryError::UnsupportedCrs(s.to_string())),
        };

        Ok(Self { zone: zone as u8, north })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian_on_equator() {
        let crs = SourceCrs::default();
        let (lat, lng) = crs.to_lat_lng(500_000.0, 0.0);
        assert!(lat.abs() < 1e-9);
        assert!((lng - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_trondheim() {
        let crs = SourceCrs::default();
        let (lat, lng) = crs.to_lat_lng(270_000.0, 7_040_000.0);
        assert!((lat - 63.414).abs() < 0.01, "lat {}", lat);
        assert!((lng - 10.391).abs() < 0.01, "lng {}", lng);
    }

    #[test]
    fn test_parse_epsg() {
        assert_eq!("EPSG:32633".parse::<SourceCrs>().unwrap(), SourceCrs::default());
        let south: SourceCrs = "EPSG:32733".parse().unwrap();
        assert!(!south.north);
        assert_eq!(south.zone, 33);
        assert_eq!(south.to_string(), "EPSG:32733");

        assert!("EPSG:4326".parse::<SourceCrs>().is_err());
        assert!("32633".parse::<SourceCrs>().is_err());
    }
}
