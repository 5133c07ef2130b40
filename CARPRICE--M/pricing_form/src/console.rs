//! JSON-lines console host: one command per line on stdin, one full page
//! render per command on stdout.

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use shared_logging::LogLevel;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::{
    collector::InputCollector,
    field::CarField,
    page::{PageAction, PricingPage, RenderedPage},
    render::{OutputFormat, TextRenderer},
    telemetry::FormTelemetry,
};

/// Commands accepted from the console.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleCommand {
    /// Edit one field.
    Set {
        /// Field key.
        field: String,
        /// New value.
        value: f64,
    },
    /// Press the predict button.
    Predict,
    /// Restore one field, or all fields when none is named.
    Reset {
        /// Field key.
        #[serde(default)]
        field: Option<String>,
    },
    /// Re-render without changes.
    Show,
    /// End the session.
    Quit,
}

/// Result of handling one command.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    /// Page to print.
    Render(Box<RenderedPage>),
    /// Stop reading.
    Quit,
}

/// One interactive session over a page and its collector.
#[derive(Debug)]
pub struct ConsoleSession {
    id: Uuid,
    page: PricingPage,
    collector: InputCollector,
    format: OutputFormat,
    renderer: TextRenderer,
    telemetry: Option<FormTelemetry>,
    handled: usize,
}

impl ConsoleSession {
    /// Creates a session.
    #[must_use]
    pub fn new(page: PricingPage, collector: InputCollector) -> Self {
        Self {
            id: Uuid::new_v4(),
            page,
            collector,
            format: OutputFormat::Text,
            renderer: TextRenderer::default(),
            telemetry: None,
            handled: 0,
        }
    }

    /// Output format for renders.
    #[must_use]
    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Option<FormTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Number of commands that produced a render, malformed ones included.
    #[must_use]
    pub const fn handled(&self) -> usize {
        self.handled
    }

    /// Session identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current field state.
    #[must_use]
    pub const fn collector(&self) -> &InputCollector {
        &self.collector
    }

    /// Applies one command and runs a full render pass.
    pub fn handle(&mut self, command: ConsoleCommand) -> SessionStep {
        if command == ConsoleCommand::Quit {
            return SessionStep::Quit;
        }
        self.handled += 1;
        let mut notice = None;
        let action = match command {
            ConsoleCommand::Quit => return SessionStep::Quit,
            ConsoleCommand::Predict => PageAction::Predict,
            ConsoleCommand::Show => PageAction::Idle,
            ConsoleCommand::Set { field, value } => {
                if let Err(err) = self.collector.set_by_name(&field, value) {
                    notice = Some(err.to_string());
                }
                PageAction::Idle
            }
            ConsoleCommand::Reset { field: None } => {
                self.collector.reset();
                PageAction::Idle
            }
            ConsoleCommand::Reset { field: Some(name) } => {
                match name.parse::<CarField>() {
                    Ok(field) => self.collector.reset_field(field),
                    Err(err) => notice = Some(err.to_string()),
                }
                PageAction::Idle
            }
        };
        let mut page = self.page.render(&self.collector, action);
        if let Some(notice) = notice {
            page = page.with_notice(notice);
        }
        SessionStep::Render(Box::new(page))
    }

    /// Parses and applies one input line. Blank lines yield `None`; malformed
    /// commands re-render the page with a notice.
    pub fn handle_line(&mut self, line: &str) -> Option<SessionStep> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<ConsoleCommand>(line) {
            Ok(command) => Some(self.handle(command)),
            Err(err) => {
                self.handled += 1;
                self.log(
                    LogLevel::Warn,
                    "console.invalid_command",
                    json!({ "error": err.to_string() }),
                );
                let page = self
                    .page
                    .render(&self.collector, PageAction::Idle)
                    .with_notice(format!("invalid console command: {err}"));
                Some(SessionStep::Render(Box::new(page)))
            }
        }
    }

    /// Prints the initial page, then processes lines until `quit` or end of input.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let initial = self.page.render(&self.collector, PageAction::Idle);
        self.write_page(&mut writer, &initial).await?;
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            match self.handle_line(&line) {
                None => continue,
                Some(SessionStep::Quit) => break,
                Some(SessionStep::Render(page)) => self.write_page(&mut writer, &page).await?,
            }
        }
        writer.flush().await?;
        self.log(
            LogLevel::Info,
            "console.shutdown",
            json!({ "commands": self.handled }),
        );
        Ok(())
    }

    /// Runs over the process's stdin and stdout.
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.run(stdin, tokio::io::stdout()).await
    }

    async fn write_page<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        page: &RenderedPage,
    ) -> Result<()> {
        let body = match self.format {
            OutputFormat::Text => self.renderer.render(page),
            OutputFormat::Json => serde_json::to_string(page)?,
        };
        writer.write_all(body.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        Ok(())
    }

    fn log(&self, level: LogLevel, message: &str, metadata: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let metadata = match metadata {
                serde_json::Value::Object(mut map) => {
                    map.insert("session".into(), json!(self.id));
                    serde_json::Value::Object(map)
                }
                other => other,
            };
            let _ = telemetry.log(level, message, metadata);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chart::ChartDimensions,
        page::PredictionPanel,
        predictor::{tests::fakes::Recorder, Predictor},
    };
    use std::sync::Arc;

    fn session() -> ConsoleSession {
        let names = CarField::ALL.iter().map(|field| field.key().to_string()).collect();
        let predictor = Predictor::new(Arc::new(Recorder::new(Some(names))), None).unwrap();
        let page = PricingPage::new(predictor, "dollars", ChartDimensions::default());
        ConsoleSession::new(page, InputCollector::default())
    }

    fn rendered(step: Option<SessionStep>) -> RenderedPage {
        match step {
            Some(SessionStep::Render(page)) => *page,
            other => panic!("expected a render, got {other:?}"),
        }
    }

    #[test]
    fn set_then_predict_uses_edited_value() {
        let mut session = session();
        let page = rendered(session.handle_line(r#"{"type":"set","field":"wheel_base","value":120}"#));
        assert!(page.prediction.is_none());
        let page = rendered(session.handle_line(r#"{"type":"predict"}"#));
        assert!(matches!(
            page.prediction,
            Some(PredictionPanel::Success { price, .. }) if price == 120.0
        ));
        assert_eq!(session.collector().wheel_base(), 120.0);
    }

    #[test]
    fn bad_input_becomes_notice_and_session_continues() {
        let mut session = session();
        let page = rendered(session.handle_line("{not json"));
        assert!(page.notices[0].starts_with("invalid console command"));
        let page = rendered(session.handle_line(r#"{"type":"set","field":"torque","value":1}"#));
        assert_eq!(page.notices, vec!["unknown field \"torque\"".to_string()]);
        let page = rendered(session.handle_line(r#"{"type":"reset","field":"nope"}"#));
        assert_eq!(page.notices.len(), 1);
        assert!(session.handle_line("   ").is_none());
        assert_eq!(session.handle_line(r#"{"type":"quit"}"#), Some(SessionStep::Quit));
        assert_eq!(session.handled(), 3);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut session = session();
        session.handle(ConsoleCommand::Set {
            field: "length".into(),
            value: 199.0,
        });
        session.handle(ConsoleCommand::Set {
            field: "width".into(),
            value: 99.0,
        });
        session.handle(ConsoleCommand::Reset {
            field: Some("length".into()),
        });
        assert_eq!(session.collector().length(), 150.0);
        assert_eq!(session.collector().width(), 99.0);
        session.handle(ConsoleCommand::Reset { field: None });
        assert_eq!(session.collector().width(), 65.0);
    }

    #[tokio::test]
    async fn run_renders_initial_page_and_each_command() {
        let telemetry = FormTelemetry::in_memory("pricing_form");
        let mut session = session()
            .with_format(OutputFormat::Json)
            .with_telemetry(Some(telemetry.clone()));
        let input = b"{\"type\":\"show\"}\n\n{\"type\":\"predict\"}\n{oops\n{\"type\":\"quit\"}\n{\"type\":\"show\"}\n";
        let mut output = Vec::new();
        session
            .run(BufReader::new(&input[..]), &mut output)
            .await
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        let pages: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(pages.len(), 4);
        assert!(pages[1].get("prediction").is_none());
        assert_eq!(pages[2]["prediction"]["status"], "success");
        assert_eq!(pages[3]["notices"].as_array().unwrap().len(), 1);
        let shutdown = telemetry.captured().pop().unwrap();
        assert_eq!(shutdown.message, "console.shutdown");
        assert_eq!(shutdown.metadata["commands"], pages.len() - 1);
    }
}
