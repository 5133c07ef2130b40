use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::feature::FeatureVector;

/// Pixel size of the rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for ChartDimensions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
        }
    }
}

/// One bar: a field title and its current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    /// Field title.
    pub feature: String,
    /// Field value.
    pub value: f64,
}

/// Bar chart of the current inputs, one row per field in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    /// Section heading.
    pub title: String,
    /// X axis title.
    pub x_title: String,
    /// Y axis title.
    pub y_title: String,
    /// Size hint for graphical hosts.
    pub dimensions: ChartDimensions,
    /// Long-form dataset.
    pub rows: Vec<ChartRow>,
}

impl BarChart {
    /// Melts a feature vector into one row per field.
    #[must_use]
    pub fn from_features(features: &FeatureVector, dimensions: ChartDimensions) -> Self {
        Self {
            title: "Interactive view of the characteristics".into(),
            x_title: "Characteristics".into(),
            y_title: "Value".into(),
            dimensions,
            rows: features
                .iter()
                .map(|(field, value)| ChartRow {
                    feature: field.title().into(),
                    value,
                })
                .collect(),
        }
    }

    /// Vega-Lite v5 bar specification with the dataset inlined.
    #[must_use]
    pub fn to_vega_lite(&self) -> Value {
        let values: Vec<Value> = self
            .rows
            .iter()
            .map(|row| json!({ "feature": row.feature, "value": row.value }))
            .collect();
        json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "title": self.title,
            "width": self.dimensions.width,
            "height": self.dimensions.height,
            "data": { "values": values },
            "mark": "bar",
            "encoding": {
                "x": { "field": "feature", "type": "nominal", "sort": null, "title": self.x_title },
                "y": { "field": "value", "type": "quantitative", "title": self.y_title },
                "color": { "field": "feature", "type": "nominal", "legend": null },
                "tooltip": [
                    { "field": "feature", "type": "nominal" },
                    { "field": "value", "type": "quantitative" }
                ]
            }
        })
    }

    /// Horizontal ASCII bars scaled so the largest value spans `bar_width` cells.
    #[must_use]
    pub fn render_ascii(&self, bar_width: usize) -> Vec<String> {
        let label_width = self
            .rows
            .iter()
            .map(|row| row.feature.chars().count())
            .max()
            .unwrap_or(0);
        let peak = self
            .rows
            .iter()
            .map(|row| row.value.abs())
            .fold(0.0_f64, f64::max);
        self.rows
            .iter()
            .map(|row| {
                let cells = if peak > 0.0 {
                    bar_cells(row.value.abs() / peak, bar_width)
                } else {
                    0
                };
                format!(
                    "{:<label_width$} | {:<bar_width$} {}",
                    row.feature,
                    "#".repeat(cells),
                    row.value
                )
            })
            .collect()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn bar_cells(ratio: f64, bar_width: usize) -> usize {
    if bar_width == 0 {
        return 0;
    }
    let cells = (ratio * bar_width as f64).round() as usize;
    if ratio > 0.0 {
        cells.clamp(1, bar_width)
    } else {
        0
    }
}
