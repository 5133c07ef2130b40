use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::field::{CarField, FIELD_COUNT};

/// The nine field values of one car, stored in canonical field order.
///
/// Rebuilt from collector state on every render pass and never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FIELD_COUNT],
}

impl FeatureVector {
    /// Every field at its default.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            values: CarField::ALL.map(|field| field.bounds().default),
        }
    }

    /// Wraps values given in canonical order.
    #[must_use]
    pub const fn from_values(values: [f64; FIELD_COUNT]) -> Self {
        Self { values }
    }

    /// Value of one field.
    #[must_use]
    pub const fn get(&self, field: CarField) -> f64 {
        self.values[field.index()]
    }

    pub(crate) fn set(&mut self, field: CarField, value: f64) {
        self.values[field.index()] = value;
    }

    /// Values in canonical order.
    #[must_use]
    pub const fn as_array(&self) -> &[f64; FIELD_COUNT] {
        &self.values
    }

    /// `(field, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (CarField, f64)> + '_ {
        CarField::ALL.into_iter().map(|field| (field, self.get(field)))
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FIELD_COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.key(), &value)?;
        }
        map.end()
    }
}
