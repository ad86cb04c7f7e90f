use crate::{config::ProviderSettings, model::Coordinates, provider::open_meteo::OpenMeteoProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;

pub mod open_meteo;

/// Raw current-conditions block, before normalization.
///
/// Every field is optional: whatever the provider leaves out is absent, not an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CurrentConditions {
    #[serde(rename = "temperature_2m")]
    pub temperature: Option<f64>,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: Option<f64>,
    /// Degrees.
    #[serde(rename = "wind_direction_10m")]
    pub wind_direction: Option<f64>,
    /// Hectopascals.
    #[serde(rename = "surface_pressure")]
    pub surface_pressure: Option<f64>,
    pub precipitation: Option<f64>,
    pub rain: Option<f64>,
    pub showers: Option<f64>,
    pub snowfall: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("request to weather provider failed")]
    Transport(#[from] reqwest::Error),

    #[error("weather provider responded with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse weather provider JSON")]
    Decode(#[from] serde_json::Error),

    #[error("weather provider response has no `current` block")]
    MissingCurrent,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_conditions(
        &self,
        location: Coordinates,
    ) -> Result<CurrentConditions, ProviderError>;
}

/// Construct the configured provider.
pub fn provider_from_settings(
    settings: &ProviderSettings,
) -> Result<Box<dyn WeatherProvider>, ProviderError> {
    Ok(Box::new(OpenMeteoProvider::new(settings)?))
}
