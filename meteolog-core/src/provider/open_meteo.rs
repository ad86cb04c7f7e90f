use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{config::ProviderSettings, model::Coordinates};

use super::{CurrentConditions, ProviderError, WeatherProvider};

/// Current-condition fields requested on every call.
const CURRENT_FIELDS: &str = "temperature_2m,precipitation,rain,showers,snowfall,surface_pressure,wind_speed_10m,wind_direction_10m";

/// Open-Meteo forecast endpoint, asked for current conditions only.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    timezone: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        // No idle connections are kept, so every call dials afresh.
        let http = Client::builder()
            .timeout(settings.timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            timezone: settings.timezone.clone(),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current: Option<CurrentConditions>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_conditions(
        &self,
        location: Coordinates,
    ) -> Result<CurrentConditions, ProviderError> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", CURRENT_FIELDS),
                ("wind_speed_unit", "ms"),
                ("timezone", self.timezone.as_str()),
                ("forecast_days", "1"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: OmResponse = serde_json::from_str(&body)?;
        debug!(%status, bytes = body.len(), "received current conditions");

        parsed.current.ok_or(ProviderError::MissingCurrent)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
