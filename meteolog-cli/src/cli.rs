use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{CustomType, validator::Validation};
use meteolog_core::{
    Config, Coordinator, InteractiveLoop, MenuExit, PollLoop, ProviderConfig, SampleStore,
    Sampler, Settings, SqliteStore, XlsxExporter, provider::provider_from_settings,
};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::console;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteolog", version, about = "Record current weather and export it to a spreadsheet")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sample on an interval and offer the export menu until exit.
    Run(Overrides),

    /// Interactively write the config file.
    Configure {
        /// Write to this file instead of the platform config location.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Fetch current conditions once and print the normalized sample.
    Sample(Overrides),
}

/// Values that take precedence over the config file.
#[derive(Debug, Args)]
pub struct Overrides {
    /// Seconds between samples.
    #[arg(long, env = "INTERVAL")]
    pub interval: Option<u64>,

    #[arg(long, env = "LATITUDE", allow_hyphen_values = true)]
    pub latitude: Option<f64>,

    #[arg(long, env = "LONGITUDE", allow_hyphen_values = true)]
    pub longitude: Option<f64>,

    /// How many of the most recent samples an export contains.
    #[arg(long, env = "ROW_COUNT")]
    pub row_count: Option<usize>,

    /// SQLite database file.
    #[arg(long, env = "METEOLOG_DB")]
    pub database: Option<PathBuf>,

    /// Spreadsheet written by the export command.
    #[arg(long, env = "METEOLOG_EXPORT")]
    pub export: Option<PathBuf>,

    /// Provider timezone sent with each request.
    #[arg(long, env = "METEOLOG_TIMEZONE")]
    pub timezone: Option<String>,

    /// Read this config file instead of the platform config location.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Overrides {
    /// Load the config file and layer these overrides on top.
    fn resolve(self) -> anyhow::Result<Config> {
        let file = match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
        .context("Failed to load configuration")?;

        let overrides = Config {
            interval_secs: self.interval,
            latitude: self.latitude,
            longitude: self.longitude,
            row_count: self.row_count,
            database_path: self.database,
            export_path: self.export,
            provider: ProviderConfig {
                timezone: self.timezone,
                ..Default::default()
            },
        };

        Ok(file.merged_with(overrides))
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run(overrides) => {
                let settings = overrides
                    .resolve()?
                    .settings()
                    .context("Invalid configuration")?;
                record(settings).await
            }
            Command::Configure { config } => configure(config),
            Command::Sample(overrides) => sample_once(overrides.resolve()?).await,
        }
    }
}

async fn record(settings: Settings) -> anyhow::Result<()> {
    let store = SqliteStore::open(&settings.database_path).with_context(|| {
        format!("Failed to open database {}", settings.database_path.display())
    })?;
    store
        .initialize_schema()
        .await
        .context("Failed to initialize database schema")?;
    let store = Arc::new(store);

    let provider = provider_from_settings(&settings.provider)
        .context("Failed to set up weather provider")?;
    let sampler = Sampler::new(Arc::from(provider), settings.location);
    let poll = PollLoop::new(sampler, Arc::clone(&store), settings.interval);

    let input = console::spawn_stdin_reader().context("Failed to start console reader")?;
    let menu = InteractiveLoop::new(
        store,
        Arc::new(XlsxExporter::new()),
        input,
        tokio::io::stdout(),
        settings.row_count,
        settings.export_path.clone(),
    );

    let shutdown = CancellationToken::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            on_ctrl_c.cancel();
        }
    });

    let report = Coordinator::new(poll, menu)
        .run(shutdown)
        .await
        .context("Weather recording stopped because of an error")?;

    if report.menu_exit != MenuExit::Operator {
        info!(exit = ?report.menu_exit, "stopped without an explicit exit");
    }
    Ok(())
}

async fn sample_once(config: Config) -> anyhow::Result<()> {
    let location = config.location().context("Invalid configuration")?;
    let provider_settings = config.provider_settings().context("Invalid configuration")?;
    let provider = provider_from_settings(&provider_settings)
        .context("Failed to set up weather provider")?;

    let sampler = Sampler::new(Arc::from(provider), location);
    let sample = sampler
        .fetch()
        .await
        .context("No sample available; run with -v for the provider error")?;

    println!("{}", serde_json::to_string_pretty(&sample)?);
    Ok(())
}

fn positive<T: PartialOrd + Default>(value: &T) -> Result<Validation, inquire::CustomUserError> {
    if *value > T::default() {
        Ok(Validation::Valid)
    } else {
        Ok(Validation::Invalid("Must be greater than zero".into()))
    }
}

fn within(limit: f64) -> impl Fn(&f64) -> Result<Validation, inquire::CustomUserError> + Clone {
    move |value: &f64| {
        if (-limit..=limit).contains(value) {
            Ok(Validation::Valid)
        } else {
            Ok(Validation::Invalid(format!("Must be between -{limit} and {limit}").into()))
        }
    }
}

fn configure(path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut cfg = match &path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    let mut interval = CustomType::<u64>::new("Seconds between samples:")
        .with_validator(positive::<u64>);
    if let Some(current) = cfg.interval_secs {
        interval = interval.with_default(current);
    }
    cfg.interval_secs = Some(interval.prompt()?);

    let mut latitude = CustomType::<f64>::new("Latitude:").with_validator(within(90.0));
    if let Some(current) = cfg.latitude {
        latitude = latitude.with_default(current);
    }
    cfg.latitude = Some(latitude.prompt()?);

    let mut longitude = CustomType::<f64>::new("Longitude:").with_validator(within(180.0));
    if let Some(current) = cfg.longitude {
        longitude = longitude.with_default(current);
    }
    cfg.longitude = Some(longitude.prompt()?);

    let mut rows = CustomType::<usize>::new("Samples per export:")
        .with_validator(positive::<usize>);
    if let Some(current) = cfg.row_count {
        rows = rows.with_default(current);
    }
    cfg.row_count = Some(rows.prompt()?);

    if let Err(err) = cfg.settings() {
        warn!(error = %err, "saved configuration is still incomplete");
    }

    let saved_to = match path {
        Some(path) => {
            cfg.save_to(&path)?;
            path
        }
        None => cfg.save()?,
    };
    println!("Configuration saved to {}", saved_to.display());

    Ok(())
}
