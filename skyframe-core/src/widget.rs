//! The weather widget: view state plus the calls that feed it.
//!
//! Every outbound call is best effort. Failures are logged and the widget keeps whatever it
//! showed before; nothing is retried.

use anyhow::Result;
use chrono::{DateTime, Local};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    Config, Location, OrderId, WeatherSnapshot,
    art::{ImageGenerator, build_prompt, image_generator_from_config},
    display::WeatherDisplay,
    geolocation::Geolocator,
    poller::{ImageState, PollTask},
    provider::{ProviderId, WeatherProvider, weather_provider_from_config},
};

/// Result of asking for a weather image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(OrderId),
    /// No weather description to build a prompt from; nothing was sent.
    NoWeather,
    /// An order is still being generated; nothing was sent.
    AlreadyPending,
    /// The image service refused or could not be reached.
    Failed,
}

#[derive(Debug)]
pub struct WeatherWidget {
    weather: Box<dyn WeatherProvider>,
    images: Option<Arc<dyn ImageGenerator>>,
    poll_interval: Duration,
    location: Location,
    snapshot: Option<WeatherSnapshot>,
    image: watch::Sender<ImageState>,
    poll: Option<PollTask>,
}

impl WeatherWidget {
    /// A widget that shows the weather only; see [`WeatherWidget::with_images`].
    pub fn new(weather: Box<dyn WeatherProvider>, poll_interval: Duration) -> Self {
        Self {
            weather,
            images: None,
            poll_interval,
            location: Location::FALLBACK,
            snapshot: None,
            image: watch::Sender::new(ImageState::Idle),
            poll: None,
        }
    }

    /// Builds the widget from config. Only the weather key is required; without an image key
    /// the widget still shows the weather and image requests fail.
    pub fn from_config(config: &Config) -> Result<Self> {
        let weather = weather_provider_from_config(config)?;
        let mut widget = Self::new(weather, config.image.poll_interval())
            .with_location(config.home_location());

        if config.is_provider_configured(ProviderId::NeuralLove) {
            widget = widget.with_images(Arc::from(image_generator_from_config(config)?));
        } else {
            debug!("No image API key configured, image generation disabled");
        }

        Ok(widget)
    }

    pub fn with_images(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    /// Location used until [`WeatherWidget::mount`] learns a better one.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn display(&self, now: &DateTime<Local>) -> Option<WeatherDisplay> {
        self.snapshot.as_ref().map(|s| WeatherDisplay::from_snapshot(s, now))
    }

    pub fn image_state(&self) -> ImageState {
        self.image.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ImageState> {
        self.image.subscribe()
    }

    /// Whether [`WeatherWidget::generate_image`] would send anything right now.
    pub fn can_generate(&self) -> bool {
        self.images.is_some()
            && self.description().is_some()
            && !self.image.borrow().is_pending()
    }

    /// Asks the geolocator where we are, then loads the weather there. If the location
    /// can't be determined the current one is kept.
    pub async fn mount(&mut self, geolocator: &dyn Geolocator) {
        match geolocator.locate().await {
            Ok(location) => self.location = location,
            Err(err) => warn!(location = %self.location, "Could not determine location: {err:#}"),
        }

        self.refresh_weather().await;
    }

    /// Moves to `location` and reloads the weather.
    pub async fn relocate(&mut self, location: Location) {
        self.location = location;
        self.refresh_weather().await;
    }

    #[instrument(skip(self), fields(location = %self.location))]
    pub async fn refresh_weather(&mut self) {
        match self.weather.current(self.location).await {
            Ok(snapshot) => {
                info!(city = snapshot.city(), "Weather updated");
                self.snapshot = Some(snapshot);
            }
            Err(err) => warn!("Error occurred when trying to retrieve weather details: {err:#}"),
        }
    }

    /// Requests an image of the current weather for the current month.
    pub async fn generate_image_now(&mut self) -> SubmitOutcome {
        let month = Local::now().format("%B").to_string();
        self.generate_image(&month).await
    }

    /// Submits an image order for the stored weather and starts polling for the result.
    pub async fn generate_image(&mut self, month: &str) -> SubmitOutcome {
        let Some(description) = self.description() else {
            warn!("No weather description available, not generating an image");
            return SubmitOutcome::NoWeather;
        };
        if self.image.borrow().is_pending() {
            return SubmitOutcome::AlreadyPending;
        }

        let Some(images) = self.images.clone() else {
            warn!("No image service configured, not generating an image");
            return SubmitOutcome::Failed;
        };

        let city = self.snapshot.as_ref().and_then(WeatherSnapshot::city);
        let prompt = build_prompt(description, city, month);

        let order = match images.submit(&prompt).await {
            Ok(order) => order,
            Err(err) => {
                warn!("Error occurred when trying to generate an image: {err:#}");
                return SubmitOutcome::Failed;
            }
        };

        let next = match self.image.borrow().submitted(order.clone()) {
            Ok(next) => next,
            Err(err) => {
                warn!("Ignoring image order {order}: {err}");
                return SubmitOutcome::AlreadyPending;
            }
        };
        self.image.send_replace(next);
        info!(order_id = %order, prompt = %prompt, "Image order submitted");

        self.poll =
            Some(PollTask::spawn(images, order.clone(), self.poll_interval, self.image.clone()));

        SubmitOutcome::Submitted(order)
    }

    /// Waits until the pending order has an image. Returns `None` if no order was submitted.
    pub async fn wait_for_image(&self) -> Option<String> {
        let mut rx = self.image.subscribe();
        let state = rx
            .wait_for(|s| !s.is_pending())
            .await
            .ok()
            .map(|s| s.clone())?;

        state.image_url().map(str::to_owned)
    }

    /// Tears the widget down, cancelling any poll in flight.
    pub fn unmount(mut self) {
        if let Some(poll) = self.poll.take().filter(|p| !p.is_finished()) {
            info!(order_id = %poll.order(), "Unmounting with image order pending");
            poll.cancel();
        }
    }

    fn description(&self) -> Option<&str> {
        self.snapshot.as_ref().and_then(WeatherSnapshot::primary_description)
    }
}
