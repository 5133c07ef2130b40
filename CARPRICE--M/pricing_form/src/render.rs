use std::{fmt::Write as _, str::FromStr};

use anyhow::{bail, Result};

use crate::page::{PredictionPanel, RenderedPage};

/// How a host prints rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal text.
    #[default]
    Text,
    /// Pretty-printed JSON document.
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("unknown output format {other:?}"),
        }
    }
}

impl OutputFormat {
    /// Renders `page` in this format.
    pub fn render(self, page: &RenderedPage, text: &TextRenderer) -> Result<String> {
        match self {
            Self::Text => Ok(text.render(page)),
            Self::Json => Ok(serde_json::to_string_pretty(page)?),
        }
    }
}

/// Plain-text host for terminals.
#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    bar_width: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self { bar_width: 40 }
    }
}

impl TextRenderer {
    /// Renderer whose longest chart bar spans `bar_width` cells.
    #[must_use]
    pub const fn new(bar_width: usize) -> Self {
        Self { bar_width }
    }

    /// Renders the page top to bottom.
    #[must_use]
    pub fn render(&self, page: &RenderedPage) -> String {
        let mut out = String::new();
        heading(&mut out, &page.header.title, '=');
        if let Some(subtitle) = &page.header.subtitle {
            let _ = writeln!(out, "{subtitle}");
        }
        let _ = writeln!(out, "{}\n", page.header.description);

        heading(&mut out, &page.sidebar.header, '-');
        let label_width = page
            .sidebar
            .widgets
            .iter()
            .map(|widget| widget.label.chars().count())
            .max()
            .unwrap_or(0);
        for widget in &page.sidebar.widgets {
            let _ = writeln!(
                out,
                "{:<label_width$} [{}..{}] = {}",
                widget.label, widget.min, widget.max, widget.value
            );
        }
        out.push('\n');

        let titles: Vec<&str> = page.summary.columns.keys().map(String::as_str).collect();
        let values: Vec<String> = page
            .summary
            .columns
            .iter()
            .map(|(title, value)| format!("{value:>width$}", width = title.chars().count()))
            .collect();
        let _ = writeln!(out, "{}", titles.join(" | "));
        let _ = writeln!(out, "{}\n", values.join(" | "));

        for notice in &page.notices {
            let _ = writeln!(out, "! {notice}");
        }
        if !page.notices.is_empty() {
            out.push('\n');
        }

        match &page.prediction {
            Some(PredictionPanel::Success { heading: title, text, .. }) => {
                heading(&mut out, title, '-');
                let _ = writeln!(out, "{text}\n");
            }
            Some(PredictionPanel::Failure { message }) => {
                let _ = writeln!(out, "ERROR: {message}\n");
            }
            None => {}
        }

        heading(&mut out, &page.chart.title, '-');
        for line in page.chart.render_ascii(self.bar_width) {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "\n{}", page.footer);
        out
    }
}

fn heading(out: &mut String, title: &str, underline: char) {
    let _ = writeln!(out, "{title}");
    let _ = writeln!(
        out,
        "{}",
        underline.to_string().repeat(title.chars().count())
    );
}
