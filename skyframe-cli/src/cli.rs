use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode};
use skyframe_core::{
    Config, FixedGeolocator, ImageState, Location, OrderId, OrderStatus, ProviderId,
    SubmitOutcome, WeatherWidget, art::image_generator_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skyframe", version, about = "Current weather, and an AI picture of it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, "openweather" or "neurallove".
        provider: String,
    },

    /// Show the current weather.
    Show {
        #[command(flatten)]
        at: LocationArgs,
    },

    /// Show the current weather and generate an image of it.
    Generate {
        #[command(flatten)]
        at: LocationArgs,

        /// Print the order id and exit instead of waiting for the image.
        #[arg(long)]
        no_wait: bool,
    },

    /// Check an image order started with `generate --no-wait`.
    Status {
        /// Order id printed by `generate`.
        order: String,
    },
}

/// Where to look; defaults to the configured home location.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    pub lon: Option<f64>,
}

impl LocationArgs {
    fn resolve(&self, config: &Config) -> anyhow::Result<Location> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Location::new(lat, lon),
            _ => Ok(config.home_location()),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => {
                let id = ProviderId::try_from(provider.as_str())?;
                configure(id)
            }
            Command::Show { at } => {
                let widget = mounted_widget(&at).await?;
                print_weather(&widget);
                Ok(())
            }
            Command::Generate { at, no_wait } => {
                let mut widget = mounted_widget(&at).await?;
                print_weather(&widget);
                generate(&mut widget, no_wait).await;
                widget.unmount();
                Ok(())
            }
            Command::Status { order } => status(OrderId::new(order)).await,
        }
    }
}

fn configure(id: ProviderId) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let help = match id {
        ProviderId::OpenWeather => "Key from https://home.openweathermap.org/api_keys",
        ProviderId::NeuralLove => {
            "Sent verbatim as the Authorization header, e.g. \"Bearer <key>\""
        }
    };
    let api_key = Password::new(&format!("{id} API key:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message(help)
        .prompt()
        .context("Failed to read API key")?;
    config.upsert_provider_api_key(id, api_key.trim().to_string());

    let set_home = Confirm::new("Set a home location?")
        .with_default(config.location.is_none())
        .prompt()
        .context("Failed to read answer")?;
    if set_home {
        let lat =
            CustomType::<f64>::new("Latitude:").prompt().context("Failed to read latitude")?;
        let lon =
            CustomType::<f64>::new("Longitude:").prompt().context("Failed to read longitude")?;
        config.location = Some(Location::new(lat, lon)?);
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn status(order: OrderId) -> anyhow::Result<()> {
    let config = Config::load()?;
    let generator = image_generator_from_config(&config)?;

    match generator.order_status(&order).await? {
        OrderStatus::Ready { image_url } => println!("{image_url}"),
        OrderStatus::InProgress => println!("Order {order} is still generating."),
    }
    Ok(())
}

async fn mounted_widget(at: &LocationArgs) -> anyhow::Result<WeatherWidget> {
    let config = Config::load()?;
    let location = at.resolve(&config)?;

    let mut widget = WeatherWidget::from_config(&config)?;
    widget.mount(&FixedGeolocator(location)).await;
    Ok(widget)
}

fn print_weather(widget: &WeatherWidget) {
    match widget.display(&chrono::Local::now()) {
        Some(display) => println!("{display}\n"),
        None => println!("Weather is unavailable for {}.\n", widget.location()),
    }
}

async fn generate(widget: &mut WeatherWidget, no_wait: bool) {
    let order = match widget.generate_image_now().await {
        SubmitOutcome::Submitted(order) => order,
        SubmitOutcome::NoWeather => {
            println!("No weather description to draw, skipping the image.");
            return;
        }
        SubmitOutcome::AlreadyPending => {
            println!("An image is already being generated.");
            return;
        }
        SubmitOutcome::Failed => {
            println!("The image service did not accept the request.");
            return;
        }
    };

    if no_wait {
        println!("Image order: {order} (check it with `skyframe status {order}`)");
        return;
    }

    println!("Generating image (order {order})...");
    tokio::select! {
        url = widget.wait_for_image() => match url {
            Some(url) => println!("{url}"),
            None => println!("No image was produced."),
        },
        _ = tokio::signal::ctrl_c() => {
            if let ImageState::Pending { order } = widget.image_state() {
                println!("Stopped waiting for order {order}.");
            }
        }
    }
}
