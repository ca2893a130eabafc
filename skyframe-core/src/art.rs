//! AI image generation for the current weather.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{
    Config, OrderId, OrderStatus,
    art::neural_love::NeuralLoveGenerator,
    provider::ProviderId,
};

pub mod neural_love;

/// Options sent along with every generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub style: String,
    pub layout: String,
    pub hd: bool,
    pub public: bool,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            style: "nature".to_string(),
            layout: "square".to_string(),
            hd: false,
            public: true,
        }
    }
}

/// Prompt describing the weather, e.g. "light rain in Vancouver in March weather".
pub fn build_prompt(description: &str, city: Option<&str>, month: &str) -> String {
    match city {
        Some(city) => format!("{description} in {city} in {month} weather"),
        None => format!("{description} in {month} weather"),
    }
}

#[async_trait]
pub trait ImageGenerator: Send + Sync + Debug {
    /// Submits a generation job and returns its order id.
    async fn submit(&self, prompt: &str) -> anyhow::Result<OrderId>;

    /// Asks the service how far along an order is.
    async fn order_status(&self, order: &OrderId) -> anyhow::Result<OrderStatus>;
}

pub fn image_generator_from_config(config: &Config) -> anyhow::Result<Box<dyn ImageGenerator>> {
    let api_key = config.require_api_key(ProviderId::NeuralLove)?;
    let settings = config.image.settings.clone();

    let generator = match config.base_url(ProviderId::NeuralLove) {
        Some(base_url) => NeuralLoveGenerator::with_base_url(api_key, settings, base_url),
        None => NeuralLoveGenerator::new(api_key, settings),
    };

    Ok(Box::new(generator))
}
