//! Conversions from raw provider fields to the values stored in a sample.
//!
//! Everything here is pure. The exact sector boundaries and the snow, showers,
//! rain ordering are visible in persisted and exported data.

use crate::model::{PrecipitationKind, WindDirection};

/// Hectopascals per 100 millimeters of mercury.
const HPA_PER_100_MMHG: f64 = 133.322;

/// Maps a bearing in degrees onto an eight-point compass label.
pub fn compass(bearing: Option<i64>) -> WindDirection {
    let Some(degrees) = bearing else {
        return WindDirection::Invalid;
    };

    match degrees {
        338..=359 | 0..=22 => WindDirection::North,
        23..=67 => WindDirection::NorthEast,
        68..=112 => WindDirection::East,
        113..=157 => WindDirection::SouthEast,
        158..=202 => WindDirection::South,
        203..=247 => WindDirection::SouthWest,
        248..=292 => WindDirection::West,
        293..=337 => WindDirection::NorthWest,
        _ => WindDirection::Unknown,
    }
}

/// Converts surface pressure from hPa to whole mmHg.
///
/// Absent, zero, negative and NaN inputs all come out as 0.
pub fn pressure_mmhg(hpa: Option<f64>) -> u32 {
    match hpa {
        Some(value) if value > 0.0 => (value / HPA_PER_100_MMHG * 100.0) as u32,
        _ => 0,
    }
}

/// Classifies precipitation from the three magnitudes the provider reports.
///
/// A kind counts as present only when its magnitude is strictly positive;
/// absent magnitudes count as zero.
pub fn precipitation_kind(
    snowfall: Option<f64>,
    showers: Option<f64>,
    rain: Option<f64>,
) -> PrecipitationKind {
    let positive = |v: Option<f64>| v.is_some_and(|v| v > 0.0);

    PrecipitationKind {
        snow: positive(snowfall),
        showers: positive(showers),
        rain: positive(rain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_valid_bearing_maps_to_a_compass_point() {
        for degrees in 0..=359 {
            let direction = compass(Some(degrees));
            assert!(
                !matches!(direction, WindDirection::Invalid | WindDirection::Unknown),
                "{degrees} mapped to {direction}"
            );
        }
    }

    #[test]
    fn compass_sector_boundaries() {
        let cases = [
            (338, WindDirection::North),
            (359, WindDirection::North),
            (0, WindDirection::North),
            (22, WindDirection::North),
            (23, WindDirection::NorthEast),
            (67, WindDirection::NorthEast),
            (68, WindDirection::East),
            (112, WindDirection::East),
            (113, WindDirection::SouthEast),
            (157, WindDirection::SouthEast),
            (158, WindDirection::South),
            (202, WindDirection::South),
            (203, WindDirection::SouthWest),
            (247, WindDirection::SouthWest),
            (248, WindDirection::West),
            (292, WindDirection::West),
            (293, WindDirection::NorthWest),
            (337, WindDirection::NorthWest),
        ];

        for (degrees, expected) in cases {
            assert_eq!(compass(Some(degrees)), expected, "bearing {degrees}");
        }
    }

    #[test]
    fn missing_and_out_of_range_bearings_are_distinct() {
        assert_eq!(compass(None), WindDirection::Invalid);
        assert_eq!(compass(Some(400)), WindDirection::Unknown);
        assert_eq!(compass(Some(360)), WindDirection::Unknown);
        assert_eq!(compass(Some(-1)), WindDirection::Unknown);
    }

    #[test]
    fn pressure_absent_or_zero_is_zero() {
        assert_eq!(pressure_mmhg(None), 0);
        assert_eq!(pressure_mmhg(Some(0.0)), 0);
        assert_eq!(pressure_mmhg(Some(-5.0)), 0);
        assert_eq!(pressure_mmhg(Some(f64::NAN)), 0);
    }

    #[test]
    fn standard_atmosphere_is_about_760_mmhg() {
        let mmhg = pressure_mmhg(Some(1013.25));
        assert!((759..=761).contains(&mmhg), "got {mmhg}");
    }

    #[test]
    fn pressure_truncates() {
        // 999.9 hPa is 749.99... mmHg
        assert_eq!(pressure_mmhg(Some(999.9)), 749);
    }

    #[test]
    fn no_precipitation_when_all_zero_or_absent() {
        assert_eq!(
            precipitation_kind(Some(0.0), Some(0.0), Some(0.0)).label(),
            "No precipitation"
        );
        assert_eq!(precipitation_kind(None, None, None).label(), "No precipitation");
    }

    #[test]
    fn snow_comes_before_rain_regardless_of_magnitude() {
        let kind = precipitation_kind(Some(2.0), Some(0.0), Some(1.0));
        assert_eq!(kind.label(), "Snow, rain");

        let kind = precipitation_kind(Some(0.1), Some(0.0), Some(9.0));
        assert_eq!(kind.label(), "Snow, rain");
    }

    #[test]
    fn showers_sit_between_snow_and_rain() {
        assert_eq!(
            precipitation_kind(None, Some(0.3), Some(0.2)).label(),
            "Showers, rain"
        );
        assert_eq!(
            precipitation_kind(Some(0.5), Some(0.3), None).label(),
            "Snow, showers"
        );
    }
}
