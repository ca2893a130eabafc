use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Location used until the geolocation collaborator answers (Vancouver, BC).
    pub const FALLBACK: Location = Location { latitude: 49.2827, longitude: -123.1207 };

    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(anyhow!("invalid latitude {latitude}, must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(anyhow!("invalid longitude {longitude}, must be between -180 and 180"));
        }

        Ok(Self { latitude, longitude })
    }
}

#[derive(Deserialize)]
struct RawLocation {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawLocation> for Location {
    type Error = anyhow::Error;

    fn try_from(raw: RawLocation) -> Result<Self> {
        Location::new(raw.latitude, raw.longitude)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current conditions as returned by the OpenWeather "current weather" endpoint.
///
/// Every field is optional: the response is stored as-is and missing parts only show up as
/// blanks when rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub name: Option<String>,
    pub sys: Option<SnapshotSys>,
    pub main: Option<SnapshotMain>,
    /// Metres.
    pub visibility: Option<f64>,
    pub wind: Option<SnapshotWind>,
    #[serde(default)]
    pub weather: Vec<SnapshotCondition>,
    /// Unix timestamp of the observation.
    pub dt: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSys {
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMain {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotWind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCondition {
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl WeatherSnapshot {
    pub fn city(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn country(&self) -> Option<&str> {
        self.sys.as_ref().and_then(|s| s.country.as_deref())
    }

    /// Description of the primary condition, the one used to build image prompts.
    pub fn primary_description(&self) -> Option<&str> {
        self.weather
            .first()
            .and_then(|w| w.description.as_deref())
            .filter(|d| !d.trim().is_empty())
    }
}

/// Identifier of an image-generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the image service knows about an order at the time it was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    InProgress,
    Ready { image_url: String },
}
