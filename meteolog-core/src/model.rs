use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Fixed point the recorder samples for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// One normalized reading of current conditions.
///
/// Built once per poll cycle by the sampler and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSample {
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    /// Meters per second.
    pub wind_speed: Option<f64>,
    pub wind_direction: WindDirection,
    /// Millimeters of mercury; 0 when the provider gave no pressure.
    pub pressure: u32,
    /// Millimeters.
    pub precipitation_amount: Option<f64>,
    pub precipitation_kind: PrecipitationKind,
    #[serde(flatten)]
    pub location: Coordinates,
}

/// A sample as it sits in storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSample {
    pub id: i64,
    #[serde(flatten)]
    pub sample: WeatherSample,
    pub created_at: DateTime<Utc>,
}

/// Eight-point compass label, plus the two markers for unusable bearings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    /// The provider sent no bearing.
    Invalid,
    /// The bearing was outside 0..=359.
    Unknown,
}

impl WindDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindDirection::North => "N",
            WindDirection::NorthEast => "NE",
            WindDirection::East => "E",
            WindDirection::SouthEast => "SE",
            WindDirection::South => "S",
            WindDirection::SouthWest => "SW",
            WindDirection::West => "W",
            WindDirection::NorthWest => "NW",
            WindDirection::Invalid => "Invalid direction",
            WindDirection::Unknown => "Unknown direction",
        }
    }

    pub const fn all() -> &'static [WindDirection] {
        &[
            WindDirection::North,
            WindDirection::NorthEast,
            WindDirection::East,
            WindDirection::SouthEast,
            WindDirection::South,
            WindDirection::SouthWest,
            WindDirection::West,
            WindDirection::NorthWest,
            WindDirection::Invalid,
            WindDirection::Unknown,
        ]
    }
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WindDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Returned when a stored label is not part of a closed label set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} label '{label}'")]
pub struct LabelError {
    pub kind: &'static str,
    pub label: String,
}

impl FromStr for WindDirection {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WindDirection::all()
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| LabelError {
                kind: "wind direction",
                label: s.to_string(),
            })
    }
}

/// Which kinds of precipitation were falling.
///
/// Rendered as the present kinds in the order snow, showers, rain, joined with
/// ", " and capitalized (`"Snow, rain"`), or `"No precipitation"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrecipitationKind {
    pub snow: bool,
    pub showers: bool,
    pub rain: bool,
}

const NO_PRECIPITATION: &str = "No precipitation";
const SNOW: &str = "snow";
const SHOWERS: &str = "showers";
const RAIN: &str = "rain";

impl PrecipitationKind {
    pub fn is_none(&self) -> bool {
        !(self.snow || self.showers || self.rain)
    }

    pub fn label(&self) -> String {
        let parts: Vec<&str> = [(self.snow, SNOW), (self.showers, SHOWERS), (self.rain, RAIN)]
            .into_iter()
            .filter_map(|(present, label)| present.then_some(label))
            .collect();

        if parts.is_empty() {
            return NO_PRECIPITATION.to_string();
        }

        capitalize(&parts.join(", "))
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for PrecipitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for PrecipitationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl FromStr for PrecipitationKind {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unrecognised = || LabelError {
            kind: "precipitation",
            label: s.to_string(),
        };

        if s == NO_PRECIPITATION {
            return Ok(Self::default());
        }

        let mut kind = Self::default();
        for part in s.split(", ") {
            match part.to_lowercase().as_str() {
                SNOW if !kind.snow => kind.snow = true,
                SHOWERS if !kind.showers => kind.showers = true,
                RAIN if !kind.rain => kind.rain = true,
                _ => return Err(unrecognised()),
            }
        }

        // Only the canonical spelling round-trips.
        if kind.label() != s {
            return Err(unrecognised());
        }

        Ok(kind)
    }
}
