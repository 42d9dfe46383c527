//! Interactive dashboard session.
//!
//! A `dialoguer` menu runs on a blocking thread and replaces the filter
//! state in the shared store; the async side follows the store and
//! re-renders both views on every version. The menu waits for the render
//! of its own change before prompting again so output and prompts do not
//! interleave.

use std::sync::Arc;
use std::sync::mpsc;

use dialoguer::{Input, Select};
use roadwatch_analytics::trend::options_for_reduction;
use roadwatch_cli_utils::{MultiProgress, with_spinner};
use roadwatch_client::{DashboardApi, DashboardSession};
use roadwatch_filter_models::{FilterDimension, FilterState, QueryOverrides, month_label};

use crate::render;

/// Default uncertainty band around forecast values.
const DEFAULT_MARGIN: f64 = 3.0;

/// Menu entries.
enum MenuAction {
    Pick(FilterDimension),
    Road,
    Reduction,
    Clear,
    Quit,
}

impl MenuAction {
    const ALL: &[Self] = &[
        Self::Pick(FilterDimension::Year),
        Self::Pick(FilterDimension::Month),
        Self::Pick(FilterDimension::Phase),
        Self::Pick(FilterDimension::AccidentType),
        Self::Pick(FilterDimension::Weather),
        Self::Road,
        Self::Reduction,
        Self::Clear,
        Self::Quit,
    ];

    fn label(&self, filters: &FilterState) -> String {
        match self {
            Self::Pick(dimension) => format!(
                "{} [{}]",
                dimension.label(),
                filters.get(*dimension).unwrap_or("any")
            ),
            Self::Road => "Road / KM stretch".to_string(),
            Self::Reduction => "Simulated accident reduction".to_string(),
            Self::Clear => "Clear all filters".to_string(),
            Self::Quit => "Quit".to_string(),
        }
    }
}

/// Runs the interactive session until the user quits.
///
/// # Errors
///
/// Returns an error if the terminal prompts fail.
pub async fn run(
    api: Arc<dyn DashboardApi>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Arc::new(DashboardSession::new(api));
    session.set_merge_options(options_for_reduction(0.0, DEFAULT_MARGIN));

    println!("Road Accident Dashboard");
    println!();

    if !with_spinner(multi, "Loading options...", session.load_catalog()).await {
        println!("No options available yet. Filters can still be typed in.");
    }

    let (rendered_tx, rendered_rx) = mpsc::channel::<u64>();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

    let menu = tokio::task::spawn_blocking({
        let session = Arc::clone(&session);
        move || {
            let result = menu_loop(&session, &rendered_rx);
            let _ = done_tx.send(());
            result
        }
    });

    let view_session = Arc::clone(&session);
    session
        .follow(
            move |version| {
                let filters = view_session.store().snapshot().filters;
                println!();
                println!("== Filters: {} ==", render::filter_summary(&filters));
                println!();
                render::segments(&view_session.segments().state(), false);
                println!();
                render::trend(&view_session.trend().state(), false);
                println!();
                let _ = rendered_tx.send(version);
            },
            async {
                let _ = done_rx.await;
            },
        )
        .await;

    menu.await??;
    Ok(())
}

/// Blocks until the render of `version` (or a later one) has finished.
fn wait_for_render(rendered: &mpsc::Receiver<u64>, version: u64) {
    while let Ok(done) = rendered.recv() {
        if done >= version {
            break;
        }
    }
}

fn menu_loop(
    session: &DashboardSession,
    rendered: &mpsc::Receiver<u64>,
) -> Result<(), dialoguer::Error> {
    let store = session.store();
    let mut expected = store.snapshot().version;

    loop {
        wait_for_render(rendered, expected);

        let filters = store.snapshot().filters;
        let labels: Vec<String> = MenuAction::ALL
            .iter()
            .map(|action| action.label(&filters))
            .collect();

        let idx = Select::new()
            .with_prompt("Change a filter")
            .items(&labels)
            .default(0)
            .interact()?;

        expected = match &MenuAction::ALL[idx] {
            MenuAction::Pick(dimension) => {
                let Some(next) = pick_value(session, &filters, *dimension)? else {
                    continue;
                };
                session.apply(next)
            }
            MenuAction::Road => {
                session.set_segment_overrides(prompt_road(true)?);
                // Overrides are view-local; re-apply the same filters to
                // trigger a refresh.
                session.apply((*filters).clone())
            }
            MenuAction::Reduction => {
                let percent: String = Input::new()
                    .with_prompt("Reduction in percent (0-100)")
                    .default("0".to_string())
                    .interact_text()?;
                let percent = percent.trim().parse().unwrap_or(0.0);
                session.set_merge_options(options_for_reduction(percent, DEFAULT_MARGIN));
                session.set_trend_overrides(prompt_road(false)?);
                session.apply((*filters).clone())
            }
            MenuAction::Clear => session.store().clear(),
            MenuAction::Quit => return Ok(()),
        };
    }
}

/// Prompts for a value of `dimension` from the catalog; `None` if the
/// selection was not usable.
fn pick_value(
    session: &DashboardSession,
    filters: &FilterState,
    dimension: FilterDimension,
) -> Result<Option<FilterState>, dialoguer::Error> {
    let values = session.store().catalog().values_for(dimension);

    let value = if values.is_empty() {
        Input::<String>::new()
            .with_prompt(format!("{} (empty for any)", dimension.label()))
            .allow_empty(true)
            .interact_text()?
    } else {
        let mut labels = vec!["(any)".to_string()];
        labels.extend(values.iter().map(|v| {
            if dimension == FilterDimension::Month {
                v.parse()
                    .ok()
                    .and_then(month_label)
                    .map_or_else(|| v.clone(), String::from)
            } else {
                v.clone()
            }
        }));
        let idx = Select::new()
            .with_prompt(dimension.label())
            .items(&labels)
            .default(0)
            .max_length(20)
            .interact()?;
        if idx == 0 {
            String::new()
        } else {
            values[idx - 1].clone()
        }
    };

    match filters.clone().with(dimension, &value) {
        Ok(next) => Ok(Some(next)),
        Err(e) => {
            println!("{e}");
            Ok(None)
        }
    }
}

fn prompt_road(with_km: bool) -> Result<QueryOverrides, dialoguer::Error> {
    let road: String = Input::new()
        .with_prompt("Road (BR number, empty for all)")
        .allow_empty(true)
        .interact_text()?;
    let mut overrides = QueryOverrides::new().road(&road);

    if with_km {
        let start: String = Input::new()
            .with_prompt("KM start (empty for none)")
            .allow_empty(true)
            .interact_text()?;
        let end: String = Input::new()
            .with_prompt("KM end (empty for none)")
            .allow_empty(true)
            .interact_text()?;
        overrides = overrides.km_range(&start, &end);
    }

    Ok(overrides)
}
