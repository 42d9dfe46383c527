#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the roadwatch tools.
//!
//! Provides [`init_logger`], which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while spinners redraw, and
//! [`with_spinner`] for showing a spinner while a request is outstanding.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Adds a ticking spinner with `message` to `multi`.
#[must_use]
pub fn spinner(multi: &MultiProgress, message: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new_spinner());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar
}

/// Awaits `future` behind a spinner, clearing it once the future resolves.
pub async fn with_spinner<F: Future>(multi: &MultiProgress, message: &str, future: F) -> F::Output {
    let bar = spinner(multi, message);
    let output = future.await;
    bar.finish_and_clear();
    multi.remove(&bar);
    output
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while spinners redraw.
///
/// Returns the [`MultiProgress`] that all spinners must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    // Build the pretty-env-logger logger manually so we can wrap it.
    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spinner_passes_output_through() {
        let multi = MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden());
        let value = with_spinner(&multi, "Loading...", async { 42 }).await;
        assert_eq!(value, 42);
    }

    #[test]
    fn init_logger_is_idempotent() {
        let _ = init_logger();
        let _ = init_logger();
    }
}
