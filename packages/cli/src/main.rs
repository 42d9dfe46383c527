#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line dashboard for the road accident analytics service.
//!
//! Each subcommand renders one view for the given filters; without a
//! subcommand an interactive session lets the user pick filters from the
//! option catalog and re-renders both views whenever they change.
//!
//! Uses `indicatif-log-bridge` (via [`roadwatch_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and spinners never fight for the terminal.

mod interactive;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use roadwatch_analytics::trend::options_for_reduction;
use roadwatch_cli_utils::with_spinner;
use roadwatch_client::{
    CatalogLoader, ClientConfig, DashboardApi, Endpoint, HttpDashboardApi, SegmentView,
    TrendView, views::FAILED_MESSAGE,
};
use roadwatch_filter::{FilterStore, compose};
use roadwatch_filter_models::{FilterError, FilterState, QueryOverrides};

#[derive(Parser)]
#[command(name = "roadwatch", about = "Road accident dashboard client")]
struct Cli {
    /// TOML config file (`base_url`, `timeout_secs`, `max_retries`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// API base URL; overrides the config file and `ROADWATCH_API_URL`
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Shared filter selections.
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Year, e.g. 2024
    #[arg(long)]
    year: Option<String>,
    /// Month number, 1-12
    #[arg(long)]
    month: Option<String>,
    /// Time of day, e.g. "Plena Noite"
    #[arg(long)]
    phase: Option<String>,
    /// Accident type
    #[arg(long)]
    accident_type: Option<String>,
    /// Weather condition
    #[arg(long)]
    weather: Option<String>,
}

impl FilterArgs {
    fn to_state(&self) -> Result<FilterState, FilterError> {
        FilterState::new()
            .with_year(self.year.as_deref().unwrap_or_default())
            .with_phase(self.phase.as_deref().unwrap_or_default())
            .with_accident_type(self.accident_type.as_deref().unwrap_or_default())
            .with_weather(self.weather.as_deref().unwrap_or_default())
            .with_month(self.month.as_deref().unwrap_or_default())
    }
}

/// Road and KM stretch, local to the view that uses them.
#[derive(Args, Debug, Clone, Default)]
struct RoadArgs {
    /// Federal road number, e.g. 116
    #[arg(long)]
    road: Option<String>,
    /// First kilometer of the stretch
    #[arg(long)]
    km_start: Option<String>,
    /// Last kilometer of the stretch
    #[arg(long)]
    km_end: Option<String>,
}

impl RoadArgs {
    fn to_overrides(&self) -> QueryOverrides {
        QueryOverrides::new()
            .road(self.road.as_deref().unwrap_or_default())
            .km_range(
                self.km_start.as_deref().unwrap_or_default(),
                self.km_end.as_deref().unwrap_or_default(),
            )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the selectable filter values
    Options,
    /// Accident distribution and causes per KM bucket
    Segments {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        road: RoadArgs,
        /// Print the aggregated rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Historical accidents followed by the model forecast
    Forecast {
        #[command(flatten)]
        filters: FilterArgs,
        /// Federal road number, e.g. 101
        #[arg(long)]
        road: Option<String>,
        /// Simulated accident reduction in percent (0-100), applied to the
        /// forecast only
        #[arg(long, default_value = "0")]
        reduction: f64,
        /// Half-width of the uncertainty band around forecast values
        #[arg(long, default_value = "3")]
        margin: f64,
        /// Print the merged series as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the composed query string without sending it
    Query {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        road: RoadArgs,
    },
    /// Print a pre-aggregated endpoint (causas, rankings, evolucao,
    /// distribuicoes, areas-criticas, kpis) as JSON
    Raw {
        /// Endpoint path
        endpoint: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Replace the server-side dataset with a CSV file
    Upload {
        /// Path to a `.csv` file
        file: PathBuf,
    },
    /// Pick filters from menus and watch both views update
    Interactive,
}

fn build_api(cli: &Cli) -> Result<Arc<dyn DashboardApi>, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.api_url {
        config.base_url.clone_from(url);
        config = config.validate()?;
    }
    log::debug!("Using API at {}", config.base_url);
    Ok(Arc::new(HttpDashboardApi::new(config)?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = roadwatch_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command.as_ref() else {
        return interactive::run(build_api(&cli)?, &multi).await;
    };

    match command {
        Commands::Options => {
            let api = build_api(&cli)?;
            let store = FilterStore::new();
            with_spinner(&multi, "Loading options...", CatalogLoader::new(api).load(&store)).await;
            render::catalog(&store.catalog());
        }
        Commands::Segments {
            filters,
            road,
            json,
        } => {
            let filters = filters.to_state()?;
            let view = SegmentView::new(build_api(&cli)?);
            with_spinner(
                &multi,
                "Loading KM distribution...",
                view.refresh(&filters, &road.to_overrides()),
            )
            .await;
            if !json {
                println!("Filters: {}", render::filter_summary(&filters));
            }
            render::segments(&view.state(), *json);
        }
        Commands::Forecast {
            filters,
            road,
            reduction,
            margin,
            json,
        } => {
            let filters = filters.to_state()?;
            let overrides = QueryOverrides::new().road(road.as_deref().unwrap_or_default());
            let options = options_for_reduction(*reduction, *margin);
            let view = TrendView::new(build_api(&cli)?);
            with_spinner(
                &multi,
                "Loading forecast...",
                view.refresh(&filters, &overrides, options),
            )
            .await;
            if !json {
                println!("Filters: {}", render::filter_summary(&filters));
            }
            render::trend(&view.state(), *json);
        }
        Commands::Query { filters, road } => {
            let params = compose(&filters.to_state()?, &road.to_overrides());
            if params.is_empty() {
                println!("(no filters)");
            } else {
                println!("{params}");
            }
        }
        Commands::Raw { endpoint, filters } => {
            let endpoint = endpoint
                .parse::<Endpoint>()
                .ok()
                .filter(|e| Endpoint::PASSTHROUGH.contains(e))
                .ok_or_else(|| format!("Unknown endpoint '{endpoint}'"))?;
            let params = compose(&filters.to_state()?, &QueryOverrides::new());
            let api = build_api(&cli)?;
            match with_spinner(&multi, "Loading...", api.fetch_raw(endpoint, &params)).await {
                Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
                Err(e) => {
                    log::warn!("{endpoint} request failed: {e}");
                    println!("{FAILED_MESSAGE}");
                }
            }
        }
        Commands::Upload { file } => {
            let api = build_api(&cli)?;
            let result = with_spinner(&multi, "Uploading dataset...", api.upload(file)).await;
            match result {
                Ok(receipt) => {
                    if let Some(message) = receipt.message {
                        log::info!("Server: {message}");
                    }
                    println!("Upload complete. Reload to see the updated data.");
                }
                Err(e) => {
                    log::error!("Upload of {} failed: {e}", file.display());
                    return Err("Upload failed. Check the file and try again.".into());
                }
            }
        }
        Commands::Interactive => {
            interactive::run(build_api(&cli)?, &multi).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory as _;
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_flags_build_state() {
        let cli = Cli::parse_from([
            "roadwatch",
            "query",
            "--year",
            "2024",
            "--month",
            "03",
            "--weather",
            "Chuva",
            "--road",
            "116",
            "--km-start",
            "abc",
        ]);
        let Some(Commands::Query { filters, road }) = cli.command else {
            panic!("expected query command");
        };
        let params = compose(&filters.to_state().unwrap(), &road.to_overrides());
        assert_eq!(params.encode(), "ano=2024&br=116&condicao_met=Chuva&mes=3");
    }

    #[test]
    fn raw_takes_an_endpoint_path() {
        let cli = Cli::parse_from(["roadwatch", "raw", "areas-criticas", "--year", "2023"]);
        let Some(Commands::Raw { endpoint, filters }) = cli.command else {
            panic!("expected raw command");
        };
        assert_eq!(endpoint.parse::<Endpoint>().unwrap(), Endpoint::CriticalAreas);
        assert_eq!(filters.year.as_deref(), Some("2023"));
    }

    #[test]
    fn invalid_month_is_rejected() {
        let filters = FilterArgs {
            month: Some("13".to_string()),
            ..FilterArgs::default()
        };
        assert!(filters.to_state().is_err());
    }

    #[test]
    fn forecast_defaults() {
        let cli = Cli::parse_from(["roadwatch", "forecast", "--road", "101"]);
        let Some(Commands::Forecast {
            reduction, margin, ..
        }) = cli.command
        else {
            panic!("expected forecast command");
        };
        assert!(reduction.abs() < f64::EPSILON);
        assert!((margin - 3.0).abs() < f64::EPSILON);
    }
}
