//! Core library for the `skyframe` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and the snapshot it returns
//! - AI image generation for the current weather, and polling for the result
//! - The widget tying it together, with the values it displays
//!
//! It is used by `skyframe-cli`, but can also be reused by other binaries or services.

pub mod art;
pub mod config;
pub mod display;
pub mod geolocation;
pub mod model;
pub mod poller;
pub mod provider;
pub mod widget;
pub mod wind;

pub use art::{ImageGenerator, ImageSettings};
pub use config::{Config, ImageConfig, ProviderConfig};
pub use display::WeatherDisplay;
pub use geolocation::{FixedGeolocator, Geolocator};
pub use model::{Location, OrderId, OrderStatus, WeatherSnapshot};
pub use poller::{ImageState, ImageStateError};
pub use provider::{ProviderId, WeatherProvider};
pub use widget::{SubmitOutcome, WeatherWidget};
pub use wind::wind_direction;
