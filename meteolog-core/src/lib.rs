//! Core library for the `meteolog` weather recorder.
//!
//! This crate defines:
//! - Configuration loading and validation
//! - The weather provider abstraction and its Open-Meteo client
//! - Unit normalization and the sampler built on it
//! - The poll loop, the operator menu and the coordinator that runs both
//! - Storage (SQLite) and spreadsheet export collaborators
//!
//! It is used by `meteolog-cli`, but can also be embedded in other binaries.

pub mod config;
pub mod export;
pub mod menu;
pub mod model;
pub mod normalize;
pub mod poller;
pub mod provider;
pub mod sampler;
pub mod shutdown;
pub mod storage;

pub use config::{Config, ConfigError, ProviderConfig, ProviderSettings, Settings};
pub use export::{ExportError, ExportOutcome, SpreadsheetExporter, XlsxExporter};
pub use menu::{Command, InteractiveLoop, MenuError, MenuExit};
pub use model::{Coordinates, PrecipitationKind, StoredSample, WeatherSample, WindDirection};
pub use poller::{PollLoop, SampleSink};
pub use provider::{CurrentConditions, ProviderError, WeatherProvider};
pub use sampler::Sampler;
pub use shutdown::{Coordinator, ShutdownError, ShutdownReport};
pub use storage::{MemoryStore, SampleStore, SqliteStore, StorageError};
