//! Conversions from projected Web-Mercator meters to slippy tile space.

use std::f64::consts::PI;

use crate::geom::Point;
use crate::tilebelt::MAX_ZOOM;

/// Spherical Mercator earth radius in meters (EPSG:3857).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Inverse spherical Mercator. Returns `(lon, lat)` in degrees.
#[inline]
pub fn to_lon_lat(point: Point) -> (f64, f64) {
  let lon = (point.x / EARTH_RADIUS).to_degrees();
  let lat = (point.y / EARTH_RADIUS).sinh().atan().to_degrees();
  (lon, lat)
}

/// Fractional `(x, y)` tile position of a longitude/latitude at `zoom`.
#[inline]
pub fn to_fractional_tile(lon: f64, lat: f64, zoom: u8) -> (f64, f64) {
  let n = 2.0_f64.powi(zoom as i32);
  let x = (lon + 180.0) / 360.0 * n;
  let lat_rad = lat.to_radians();
  let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
  (x, y)
}

/// The tile a projected point falls in. Points on or beyond the edge of the
/// world are clamped onto the outermost tiles. `zoom` must not exceed
/// [`MAX_ZOOM`]; callers validate it first.
#[inline]
pub fn to_tile(point: Point, zoom: u8) -> (u32, u32) {
  debug_assert!(zoom <= MAX_ZOOM, "zoom {} deeper than {}", zoom, MAX_ZOOM);
  let (lon, lat) = to_lon_lat(point);
  let (x, y) = to_fractional_tile(lon, lat, zoom);
  let max = ((1u64 << zoom) - 1) as f64;
  (
    x.floor().clamp(0.0, max) as u32,
    y.floor().clamp(0.0, max) as u32,
  )
}
