//! Compass labels for wind bearings.

pub const DIRECTIONS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

pub const UNKNOWN_DIRECTION: &str = "N/A";

const SECTOR_DEG: f64 = 360.0 / 16.0;

/// Maps a bearing in degrees to the nearest of the 16 compass points.
///
/// Bearings wrap around, so `360` and `-360` both read as `"N"`. A missing or non-finite
/// bearing yields [`UNKNOWN_DIRECTION`].
pub fn wind_direction(deg: Option<f64>) -> &'static str {
    let Some(deg) = deg.filter(|d| d.is_finite()) else {
        return UNKNOWN_DIRECTION;
    };

    let sector = (deg.rem_euclid(360.0) / SECTOR_DEG).round() as usize;
    DIRECTIONS[sector % DIRECTIONS.len()]
}
