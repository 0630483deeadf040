mod cache;
mod clock;
mod config;
mod content;
mod display;
mod error;
mod geolocate;
mod orchestrator;
mod session;
mod weather;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::content::gemini::GeminiClient;
use crate::content::ContentGenerator;
use crate::geolocate::Geolocator;
use crate::orchestrator::{Orchestrator, Resolution};
use crate::session::{DisplayedTemps, Session};
use crate::weather::openweather::OpenWeatherClient;
use crate::weather::TempUnit;

#[derive(Parser)]
#[command(name = "skycast", version, about = "Weather lookup with offline fallback and weather-matched trivia")]
struct Cli {
    /// Config file (defaults to ./skycast.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current weather and 5-day forecast for a city
    Weather {
        /// City name, e.g. "London" or "New York"
        city: String,
        /// Show temperatures in °F
        #[arg(long)]
        imperial: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Weather for the city detected from your IP address
    Here {
        #[arg(long)]
        imperial: bool,
        #[arg(long)]
        json: bool,
    },
    /// Interactive session: type a city, or :units, :history, :here, :quit
    Shell,
}

struct App {
    config: AppConfig,
    orchestrator: Arc<Orchestrator>,
    geolocator: Geolocator,
}

impl App {
    fn build(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let client = OpenWeatherClient::new(
            &config.base_url,
            &config.openweather_api_key,
            config.request_timeout(),
        )
        .context("Failed to create weather client")?;

        let content = match config.gemini_key() {
            Some(key) => ContentGenerator::new(Arc::new(
                GeminiClient::new(
                    key,
                    &config.gemini_base_url,
                    &config.gemini_model,
                    config.request_timeout(),
                )
                .context("Failed to create Gemini client")?,
            )),
            None => ContentGenerator::disabled(),
        };
        let cache = CacheStore::new(config.cache_ttl()?);
        info!(
            "Cache TTL {}s, lifestyle content from {}",
            cache.ttl().num_seconds(),
            if content.is_ai_enabled() { "Gemini" } else { "static table" }
        );

        let orchestrator = Orchestrator::new(
            Arc::new(client),
            content,
            cache,
            Arc::new(SystemClock),
            config.resolve_timeout(),
        );
        let geolocator = Geolocator::new(&config.geolocation_url, config.request_timeout())?;

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            geolocator,
        })
    }

    fn unit(&self, imperial: bool) -> TempUnit {
        if imperial {
            TempUnit::Fahrenheit
        } else {
            self.config.display_unit
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skycast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env if present (override system env vars)
    dotenvy::dotenv_override().ok();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let app = App::build(config)?;

    match cli.command {
        Commands::Weather { city, imperial, json } => {
            let res = exit_on_error(app.orchestrator.resolve(&city).await);
            print_resolution(&res, app.unit(imperial), json)?;
        }
        Commands::Here { imperial, json } => {
            let city = exit_on_error(app.geolocator.detect_city().await);
            let res = exit_on_error(app.orchestrator.resolve(&city).await);
            print_resolution(&res, app.unit(imperial), json)?;
        }
        Commands::Shell => run_shell(&app).await?,
    }

    Ok(())
}

/// Print the short message for user-facing failures and exit non-zero.
fn exit_on_error<T>(result: Result<T, error::AppError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!("Command failed: {}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn print_resolution(res: &Resolution, unit: TempUnit, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(res)?);
    } else {
        println!("\n{}\n", display::render(res, DisplayedTemps::new(&res.snapshot, unit)));
    }
    Ok(())
}

async fn run_shell(app: &App) -> Result<()> {
    let mut session = Session::new(
        app.orchestrator.clone(),
        app.config.display_unit,
        app.config.history_limit,
    );
    info!("Interactive session started ({})", session.unit().symbol());
    println!("Type a city name, or :units, :history, :here, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" | ":q" | ":exit" => break,
            ":units" => {
                session.toggle_units();
                show_current(&session);
            }
            ":history" => {
                if session.history().is_empty() {
                    println!("No recent searches");
                }
                for (i, city) in session.history().entries().iter().enumerate() {
                    println!("  {}. {}", i + 1, city);
                }
            }
            ":here" => match app.geolocator.detect_city().await {
                Ok(city) => search_and_show(&mut session, &city).await,
                Err(e) => eprintln!("{}", e.user_message()),
            },
            city => search_and_show(&mut session, city).await,
        }
        prompt()?;
    }

    Ok(())
}

async fn search_and_show(session: &mut Session, city: &str) {
    match session.search(city).await {
        Ok(()) => show_current(session),
        Err(e) => eprintln!("{}", e.user_message()),
    }
}

fn show_current(session: &Session) {
    match (session.current(), session.displayed()) {
        (Some(res), Some(temps)) => println!("\n{}\n", display::render(res, temps)),
        _ => println!("Units: {}", session.unit().symbol()),
    }
}

fn prompt() -> Result<()> {
    print!("skycast> ");
    std::io::stdout().flush()?;
    Ok(())
}
