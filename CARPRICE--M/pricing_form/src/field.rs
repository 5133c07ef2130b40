use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::collector::InputError;

/// Number of form fields, and the width of every feature vector.
pub const FIELD_COUNT: usize = 9;

/// Inclusive range and initial value of a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldBounds {
    /// Smallest accepted value.
    pub min: f64,
    /// Largest accepted value.
    pub max: f64,
    /// Value shown on first render.
    pub default: f64,
}

impl FieldBounds {
    const fn new(min: f64, max: f64, default: f64) -> Self {
        Self { min, max, default }
    }

    /// True when `value` lies within `[min, max]`.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Nearest accepted value.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// One automobile attribute collected by the form.
///
/// Declaration order is the training order of the bundled model and the order
/// of [`CarField::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarField {
    /// Distance between front and rear axles.
    WheelBase,
    /// Overall length.
    Length,
    /// Overall width.
    Width,
    /// Unladen weight.
    CurbWeight,
    /// Engine displacement.
    EngineSize,
    /// Engine power.
    Horsepower,
    /// Fuel economy in town.
    CityMpg,
    /// Fuel economy on the highway.
    HighwayMpg,
    /// Engine speed at peak power.
    PeakRpm,
}

impl CarField {
    /// Every field in canonical order.
    pub const ALL: [Self; FIELD_COUNT] = [
        Self::WheelBase,
        Self::Length,
        Self::Width,
        Self::CurbWeight,
        Self::EngineSize,
        Self::Horsepower,
        Self::CityMpg,
        Self::HighwayMpg,
        Self::PeakRpm,
    ];

    /// Position in the canonical order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Machine key, also the model feature name.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::WheelBase => "wheel_base",
            Self::Length => "length",
            Self::Width => "width",
            Self::CurbWeight => "curb_weight",
            Self::EngineSize => "engine_size",
            Self::Horsepower => "horsepower",
            Self::CityMpg => "city_mpg",
            Self::HighwayMpg => "highway_mpg",
            Self::PeakRpm => "peak_rpm",
        }
    }

    /// Column title used by the summary table and the chart.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::WheelBase => "Wheel base",
            Self::Length => "Length",
            Self::Width => "Width",
            Self::CurbWeight => "Curb weight",
            Self::EngineSize => "Engine size",
            Self::Horsepower => "Horsepower",
            Self::CityMpg => "City consumption",
            Self::HighwayMpg => "Highway consumption",
            Self::PeakRpm => "Peak engine speed",
        }
    }

    /// Sidebar label, e.g. `Wheel base (wheel_base)`.
    #[must_use]
    pub fn label(self) -> String {
        format!("{} ({})", self.title(), self.key())
    }

    /// Accepted range and default.
    #[must_use]
    pub const fn bounds(self) -> FieldBounds {
        match self {
            Self::WheelBase => FieldBounds::new(50.0, 130.0, 90.0),
            Self::Length => FieldBounds::new(100.0, 200.0, 150.0),
            Self::Width => FieldBounds::new(50.0, 100.0, 65.0),
            Self::CurbWeight => FieldBounds::new(500.0, 5000.0, 2000.0),
            Self::EngineSize => FieldBounds::new(50.0, 500.0, 120.0),
            Self::Horsepower => FieldBounds::new(50.0, 1000.0, 110.0),
            Self::CityMpg => FieldBounds::new(10.0, 100.0, 20.0),
            Self::HighwayMpg => FieldBounds::new(10.0, 100.0, 30.0),
            Self::PeakRpm => FieldBounds::new(1000.0, 10000.0, 5000.0),
        }
    }

    /// Looks a field up by key. Hyphens are accepted in place of underscores.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|field| field.key() == normalized)
    }
}

impl fmt::Display for CarField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CarField {
    type Err = InputError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::from_key(raw).ok_or_else(|| InputError::UnknownField(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_matches_indices() {
        let keys: Vec<_> = CarField::ALL.iter().map(|field| field.key()).collect();
        assert_eq!(
            keys,
            vec![
                "wheel_base",
                "length",
                "width",
                "curb_weight",
                "engine_size",
                "horsepower",
                "city_mpg",
                "highway_mpg",
                "peak_rpm"
            ]
        );
        for (idx, field) in CarField::ALL.iter().enumerate() {
            assert_eq!(field.index(), idx);
        }
    }

    #[test]
    fn defaults_lie_within_bounds() {
        for field in CarField::ALL {
            let bounds = field.bounds();
            assert!(bounds.min < bounds.max, "{field}");
            assert!(bounds.contains(bounds.default), "{field}");
        }
        assert_eq!(CarField::CityMpg.bounds().default, 20.0);
        assert_eq!(CarField::HighwayMpg.bounds().default, 30.0);
    }

    #[test]
    fn parses_keys_and_labels() {
        assert_eq!("peak-rpm".parse::<CarField>().unwrap(), CarField::PeakRpm);
        assert_eq!(" Horsepower ".parse::<CarField>().unwrap(), CarField::Horsepower);
        assert!(matches!(
            "torque".parse::<CarField>(),
            Err(InputError::UnknownField(name)) if name == "torque"
        ));
        assert_eq!(CarField::WheelBase.label(), "Wheel base (wheel_base)");
    }
}
