//! One fetch-and-normalize cycle against the weather provider.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    model::{Coordinates, WeatherSample},
    normalize::{compass, precipitation_kind, pressure_mmhg},
    provider::{CurrentConditions, ProviderError, WeatherProvider},
};

#[derive(Debug, Clone)]
pub struct Sampler {
    provider: Arc<dyn WeatherProvider>,
    location: Coordinates,
}

impl Sampler {
    pub fn new(provider: Arc<dyn WeatherProvider>, location: Coordinates) -> Self {
        Self { provider, location }
    }

    pub fn location(&self) -> Coordinates {
        self.location
    }

    /// Fetch current conditions and normalize them.
    ///
    /// Every failure is logged here and comes back as `None`; there is no
    /// retry within a call.
    pub async fn fetch(&self) -> Option<WeatherSample> {
        match self.provider.current_conditions(self.location).await {
            Ok(conditions) => {
                let sample = build_sample(&conditions, self.location);
                debug!(
                    temperature = ?sample.temperature,
                    wind = %sample.wind_direction,
                    pressure = sample.pressure,
                    "sampled current conditions"
                );
                Some(sample)
            }
            Err(ProviderError::Status { status, body }) => {
                warn!(%status, body = %body, "weather provider returned an error status");
                None
            }
            Err(err) => {
                warn!(error = %err, source = ?std::error::Error::source(&err), "weather request failed");
                None
            }
        }
    }
}

/// Builds a fresh sample from the raw block; the input is left untouched.
pub fn build_sample(conditions: &CurrentConditions, location: Coordinates) -> WeatherSample {
    // Bearings arrive as JSON numbers; whole degrees are what the compass uses.
    let bearing = conditions.wind_direction.map(|d| d.trunc() as i64);

    WeatherSample {
        temperature: conditions.temperature,
        wind_speed: conditions.wind_speed,
        wind_direction: compass(bearing),
        pressure: pressure_mmhg(conditions.surface_pressure),
        precipitation_amount: conditions.precipitation,
        precipitation_kind: precipitation_kind(
            conditions.snowfall,
            conditions.showers,
            conditions.rain,
        ),
        location,
    }
}
