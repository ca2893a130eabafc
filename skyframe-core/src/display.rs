use chrono::{DateTime, TimeZone};
use std::fmt;

use crate::{model::WeatherSnapshot, wind::wind_direction};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";
const DEFAULT_ICON: &str = "10d";
const BLANK: &str = "-";

/// Values derived from a [`WeatherSnapshot`], ready to be shown.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherDisplay {
    pub header: String,
    pub place: String,
    pub icon_url: String,
    pub temperature_c: Option<i64>,
    pub feels_like_c: Option<f64>,
    pub conditions: String,
    pub wind_speed: Option<String>,
    pub wind_direction: &'static str,
    pub pressure_hpa: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub visibility_km: Option<String>,
}

impl WeatherDisplay {
    pub fn from_snapshot<Tz>(snapshot: &WeatherSnapshot, now: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let main = snapshot.main.as_ref();
        let wind = snapshot.wind.as_ref();

        let place = format!(
            "{}, {}",
            snapshot.city().unwrap_or(BLANK),
            snapshot.country().unwrap_or(BLANK)
        );

        let icon = snapshot
            .weather
            .first()
            .and_then(|w| w.icon.as_deref())
            .unwrap_or(DEFAULT_ICON);

        let conditions = snapshot
            .weather
            .iter()
            .filter_map(|w| w.description.as_deref())
            .collect::<Vec<_>>()
            .join(" | ");

        Self {
            header: now.format("%b %d, %H:%M").to_string(),
            place,
            icon_url: format!("{ICON_BASE_URL}/{icon}@2x.png"),
            temperature_c: main.and_then(|m| m.temp).map(round_half_up),
            feels_like_c: main.and_then(|m| m.feels_like),
            conditions,
            wind_speed: wind.and_then(|w| w.speed).map(|s| tenths_half_up(s * 10.0)),
            wind_direction: wind_direction(wind.and_then(|w| w.deg)),
            pressure_hpa: main.and_then(|m| m.pressure),
            humidity_pct: main.and_then(|m| m.humidity),
            visibility_km: snapshot.visibility.map(|v| tenths_half_up(v / 100.0)),
        }
    }
}

/// Rounds .5 towards positive infinity, so `-2.5` becomes `-2`.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Formats a count of tenths with one decimal, rounding .5 up: `12.5` gives `"1.3"`.
fn tenths_half_up(tenths: f64) -> String {
    format!("{:.1}", (tenths + 0.5).floor() / 10.0)
}

fn or_blank<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map_or_else(|| BLANK.to_string(), ToString::to_string)
}

impl fmt::Display for WeatherDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        writeln!(f, "{}", self.place)?;
        writeln!(f, "{}ºC  ({})", or_blank(&self.temperature_c), self.icon_url)?;
        writeln!(f, "Feels like {} | {}", or_blank(&self.feels_like_c), self.conditions)?;
        writeln!(
            f,
            "  {}m/s {}    {}hPa",
            or_blank(&self.wind_speed),
            self.wind_direction,
            or_blank(&self.pressure_hpa)
        )?;
        write!(
            f,
            "  Humidity: {}%    Visibility: {}km",
            or_blank(&self.humidity_pct),
            or_blank(&self.visibility_km)
        )
    }
}
