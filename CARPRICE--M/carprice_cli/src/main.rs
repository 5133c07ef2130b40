use std::path::PathBuf;

use anyhow::{Context, Result};
use carprice_form::{
    AppConfig, BarChart, CarField, ConsoleSession, InputCollector, InputError, OutputFormat,
    PageAction, PricingPage, TextRenderer,
};
use carprice_regression::ModelArtifact;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use shared_logging::LogLevel;

const CONFIG_FILE: &str = "carprice.toml";

#[derive(Parser, Debug)]
#[command(name = "carprice", version, about = "Car price prediction form")]
struct Cli {
    /// TOML configuration; `carprice.toml` in the working directory is used when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Model artifact, overriding the configured path.
    #[arg(long, global = true)]
    model: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Renders the page once for the given field values.
    Render(RenderArgs),
    /// Interactive session reading JSON-line commands from stdin.
    Console {
        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,
    },
    /// Prints the field table.
    Schema,
    /// Prints the Vega-Lite chart specification for the given field values.
    ChartSpec(FieldArgs),
    /// Prints model artifact metadata.
    InspectModel,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    fields: FieldArgs,
    /// Presses the predict button.
    #[arg(long)]
    predict: bool,
    #[arg(long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
}

#[derive(Args, Debug, Default)]
struct FieldArgs {
    #[arg(long)]
    wheel_base: Option<f64>,
    #[arg(long)]
    length: Option<f64>,
    #[arg(long)]
    width: Option<f64>,
    #[arg(long)]
    curb_weight: Option<f64>,
    #[arg(long)]
    engine_size: Option<f64>,
    #[arg(long)]
    horsepower: Option<f64>,
    #[arg(long)]
    city_mpg: Option<f64>,
    #[arg(long)]
    highway_mpg: Option<f64>,
    #[arg(long)]
    peak_rpm: Option<f64>,
}

impl FieldArgs {
    fn values(&self) -> [(CarField, Option<f64>); 9] {
        [
            (CarField::WheelBase, self.wheel_base),
            (CarField::Length, self.length),
            (CarField::Width, self.width),
            (CarField::CurbWeight, self.curb_weight),
            (CarField::EngineSize, self.engine_size),
            (CarField::Horsepower, self.horsepower),
            (CarField::CityMpg, self.city_mpg),
            (CarField::HighwayMpg, self.highway_mpg),
            (CarField::PeakRpm, self.peak_rpm),
        ]
    }

    /// Applies every given flag; errors are collected so the page still renders.
    fn apply(&self, collector: &mut InputCollector) -> Vec<InputError> {
        self.values()
            .into_iter()
            .filter_map(|(field, value)| value.map(|value| (field, value)))
            .filter_map(|(field, value)| collector.set(field, value).err())
            .collect()
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Render(args) => {
            println!("{}", handle_render(&config, &args)?);
            Ok(())
        }
        Commands::Console { format } => handle_console(&config, format.into()),
        Commands::Schema => {
            println!("{:<12} {:>8} {:>8} {:>8}  label", "field", "min", "max", "default");
            for field in CarField::ALL {
                let bounds = field.bounds();
                println!(
                    "{:<12} {:>8} {:>8} {:>8}  {}",
                    field.key(),
                    bounds.min,
                    bounds.max,
                    bounds.default,
                    field.label()
                );
            }
            Ok(())
        }
        Commands::ChartSpec(fields) => {
            println!("{}", chart_spec(&config, &fields)?);
            Ok(())
        }
        Commands::InspectModel => {
            let artifact = ModelArtifact::load(&config.model_path)
                .with_context(|| format!("loading {}", config.model_path.display()))?;
            let summary = json!({
                "path": config.model_path,
                "artifact": artifact.summary(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None if PathBuf::from(CONFIG_FILE).exists() => AppConfig::load(CONFIG_FILE)?,
        None => AppConfig::default(),
    };
    if let Some(model) = &cli.model {
        config.model_path.clone_from(model);
    }
    Ok(config)
}

fn chart_spec(config: &AppConfig, fields: &FieldArgs) -> Result<String> {
    let mut collector = InputCollector::new(config.out_of_range);
    if let Some(err) = fields.apply(&mut collector).into_iter().next() {
        return Err(err).context("applying field values");
    }
    let chart = BarChart::from_features(&collector.snapshot(), config.chart);
    Ok(serde_json::to_string_pretty(&chart.to_vega_lite())?)
}

fn handle_render(config: &AppConfig, args: &RenderArgs) -> Result<String> {
    let telemetry = config.logging.telemetry("carprice")?;
    let page = PricingPage::from_config(config, telemetry.clone())?;
    let mut collector = InputCollector::new(config.out_of_range).with_telemetry(telemetry);
    let errors = args.fields.apply(&mut collector);
    let action = if args.predict {
        PageAction::Predict
    } else {
        PageAction::Idle
    };
    let rendered = errors
        .iter()
        .fold(page.render(&collector, action), |rendered, err| {
            rendered.with_notice(err.to_string())
        });
    OutputFormat::from(args.format).render(&rendered, &TextRenderer::default())
}

fn handle_console(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let telemetry = config.logging.telemetry("carprice")?;
    let page = PricingPage::from_config(config, telemetry.clone())?;
    let collector = InputCollector::new(config.out_of_range).with_telemetry(telemetry.clone());
    let mut session = ConsoleSession::new(page, collector)
        .with_format(format)
        .with_telemetry(telemetry.clone());
    if let Some(telemetry) = &telemetry {
        let _ = telemetry.log(
            LogLevel::Info,
            "console.started",
            json!({ "session": session.id(), "model": config.model_path }),
        );
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting console runtime")?;
    runtime.block_on(session.run_stdio())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carprice_form::OutOfRangePolicy;

    fn bundled_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.model_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../final_model.json");
        config
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_render_flags() {
        let cli = Cli::parse_from([
            "carprice",
            "--model",
            "m.json",
            "render",
            "--wheel-base",
            "100",
            "--peak-rpm",
            "6000",
            "--predict",
            "--format",
            "json",
        ]);
        assert_eq!(cli.model, Some(PathBuf::from("m.json")));
        match cli.command {
            Commands::Render(args) => {
                assert!(args.predict);
                assert_eq!(args.fields.wheel_base, Some(100.0));
                assert_eq!(args.fields.peak_rpm, Some(6000.0));
                assert!(matches!(args.format, FormatArg::Json));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn field_flags_apply_in_place() {
        let mut collector = InputCollector::new(OutOfRangePolicy::Reject);
        let fields = FieldArgs {
            horsepower: Some(200.0),
            width: Some(500.0),
            ..FieldArgs::default()
        };
        let errors = fields.apply(&mut collector);
        assert_eq!(errors.len(), 1);
        assert_eq!(collector.horsepower(), 200.0);
        assert_eq!(collector.width(), 65.0);
    }

    #[test]
    fn render_predicts_and_reports_rejected_flags() {
        let mut config = bundled_config();
        config.out_of_range = OutOfRangePolicy::Reject;
        let args = RenderArgs {
            fields: FieldArgs {
                width: Some(500.0),
                ..FieldArgs::default()
            },
            predict: true,
            format: FormatArg::Json,
        };
        let page: serde_json::Value =
            serde_json::from_str(&handle_render(&config, &args).unwrap()).unwrap();
        assert_eq!(page["prediction"]["status"], "success");
        assert_eq!(page["prediction"]["price"], 14_000.0);
        assert_eq!(page["notices"].as_array().unwrap().len(), 1);

        let text = handle_render(
            &config,
            &RenderArgs {
                fields: FieldArgs::default(),
                predict: false,
                format: FormatArg::Text,
            },
        )
        .unwrap();
        assert!(text.contains("Car Price Prediction"));
        assert!(!text.contains("The estimated price"));
    }

    #[test]
    fn render_fails_without_model() {
        let mut config = AppConfig::default();
        config.model_path = PathBuf::from("does/not/exist.json");
        let args = RenderArgs {
            fields: FieldArgs::default(),
            predict: true,
            format: FormatArg::Text,
        };
        assert!(handle_render(&config, &args).is_err());
    }

    #[test]
    fn chart_spec_reflects_flags_and_rejects_bad_values() {
        let mut config = bundled_config();
        let fields = FieldArgs {
            horsepower: Some(300.0),
            ..FieldArgs::default()
        };
        let spec: serde_json::Value =
            serde_json::from_str(&chart_spec(&config, &fields).unwrap()).unwrap();
        assert_eq!(spec["mark"], "bar");
        assert_eq!(spec["data"]["values"][5]["value"], 300.0);
        assert_eq!(spec["width"], 800);

        config.out_of_range = OutOfRangePolicy::Reject;
        let fields = FieldArgs {
            peak_rpm: Some(1.0),
            ..FieldArgs::default()
        };
        assert!(chart_spec(&config, &fields).is_err());
    }
}
