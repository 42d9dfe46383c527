//! View controllers for the dashboard.
//!
//! A view owns the last applied result of one endpoint. Refreshing it
//! composes the query, fetches, validates and analyses the response, and
//! applies the outcome only if no newer refresh of the same view has been
//! issued in the meantime. The generation check and the write happen under
//! one lock, so a superseded response can never overwrite a newer one.
//!
//! Failures never escape a view: they are logged and the view shows
//! [`ViewState::Failed`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use roadwatch_analytics::{aggregate, merge};
use roadwatch_analytics_models::{MergeOptions, SegmentAnalysis, TrendSeries};
use roadwatch_filter::{FilterStore, QueryParams, compose};
use roadwatch_filter_models::{FilterState, QueryOverrides};

use crate::ClientError;
use crate::api::DashboardApi;
use crate::generation::{RequestToken, RequestTracker};

/// Shown while a request is outstanding.
pub const LOADING_MESSAGE: &str = "Loading...";

/// Shown when the service returned no data for the query.
pub const EMPTY_MESSAGE: &str = "No data for the selected filters.";

/// Shown when the service could not be reached or answered nonsense.
pub const FAILED_MESSAGE: &str = "Data is temporarily unavailable. Please try again.";

/// What a view currently displays.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewState<T> {
    /// Never refreshed.
    #[default]
    Idle,
    /// A refresh is outstanding.
    Loading,
    /// The last applied response had no data.
    Empty,
    /// The last applied response.
    Ready(T),
    /// The last applied request failed. Details are in the log.
    Failed,
}

impl<T> ViewState<T> {
    /// Returns `true` while a refresh is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The applied data, if any.
    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// User-facing status text for states without data.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Loading => Some(LOADING_MESSAGE),
            Self::Empty => Some(EMPTY_MESSAGE),
            Self::Failed => Some(FAILED_MESSAGE),
            Self::Idle | Self::Ready(_) => None,
        }
    }
}

/// Whether a finished refresh changed the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response was applied.
    Applied,
    /// A newer refresh was issued first; the response was dropped.
    Stale,
}

#[derive(Debug)]
struct Slot<T> {
    state: ViewState<T>,
    applied_query: Option<String>,
}

/// Token issuing and guarded state shared by every view.
#[derive(Debug)]
struct Controller<T> {
    name: &'static str,
    tracker: RequestTracker,
    slot: Mutex<Slot<T>>,
}

impl<T: Clone> Controller<T> {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            tracker: RequestTracker::new(),
            slot: Mutex::new(Slot {
                state: ViewState::Idle,
                applied_query: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, query: &str) -> RequestToken {
        let mut slot = self.lock();
        let token = self.tracker.begin();
        slot.state = ViewState::Loading;
        log::debug!("{} request {token}: {query}", self.name);
        token
    }

    /// `Ok(None)` means the response had no data.
    fn finish(
        &self,
        token: RequestToken,
        query: String,
        result: Result<Option<T>, ClientError>,
    ) -> RefreshOutcome {
        let mut slot = self.lock();
        if !self.tracker.is_current(token) {
            log::debug!("Discarding stale {} response {token}", self.name);
            return RefreshOutcome::Stale;
        }

        slot.state = match result {
            Ok(Some(value)) => ViewState::Ready(value),
            Ok(None) => ViewState::Empty,
            Err(e) => {
                log::warn!("{} request failed for '{query}': {e}", self.name);
                ViewState::Failed
            }
        };
        slot.applied_query = Some(query);
        RefreshOutcome::Applied
    }

    fn state(&self) -> ViewState<T> {
        self.lock().state.clone()
    }

    fn applied_query(&self) -> Option<String> {
        self.lock().applied_query.clone()
    }
}

/// Accident distribution along a road, by KM bucket.
pub struct SegmentView {
    api: Arc<dyn DashboardApi>,
    inner: Controller<Arc<SegmentAnalysis>>,
}

impl SegmentView {
    /// Creates an idle view backed by `api`.
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            inner: Controller::new("KM distribution"),
        }
    }

    /// Fetches and aggregates the KM distribution for `filters` with the
    /// view's road/KM `overrides`.
    pub async fn refresh(
        &self,
        filters: &FilterState,
        overrides: &QueryOverrides,
    ) -> RefreshOutcome {
        let params = compose(filters, overrides);
        let query = params.encode();
        let token = self.inner.begin(&query);

        let result = self.api.km_distribution(&params).await.map(|records| {
            if records.is_empty() {
                None
            } else {
                Some(Arc::new(aggregate(&records)))
            }
        });

        self.inner.finish(token, query, result)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ViewState<Arc<SegmentAnalysis>> {
        self.inner.state()
    }

    /// Encoded query of the last applied response.
    #[must_use]
    pub fn applied_query(&self) -> Option<String> {
        self.inner.applied_query()
    }
}

/// Historical accident counts followed by the model forecast.
pub struct TrendView {
    api: Arc<dyn DashboardApi>,
    inner: Controller<Arc<TrendSeries>>,
}

impl TrendView {
    /// Creates an idle view backed by `api`.
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            inner: Controller::new("Forecast"),
        }
    }

    /// Fetches both series and merges them with `options`.
    ///
    /// The reduction factor is applied here, never sent to the service.
    pub async fn refresh(
        &self,
        filters: &FilterState,
        overrides: &QueryOverrides,
        options: MergeOptions,
    ) -> RefreshOutcome {
        let params: QueryParams = compose(filters, overrides);
        let query = params.encode();
        let token = self.inner.begin(&query);

        let result = self.api.forecast(&params).await.map(|response| {
            let series = TrendSeries {
                points: merge(&response.historical, &response.forecast, options),
                metrics: response.metrics,
                causes: response.causes,
            };
            (!series.is_empty()).then(|| Arc::new(series))
        });

        self.inner.finish(token, query, result)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ViewState<Arc<TrendSeries>> {
        self.inner.state()
    }

    /// Encoded query of the last applied response.
    #[must_use]
    pub fn applied_query(&self) -> Option<String> {
        self.inner.applied_query()
    }
}

/// Populates the store's option catalog.
pub struct CatalogLoader {
    api: Arc<dyn DashboardApi>,
}

impl CatalogLoader {
    /// Creates a loader backed by `api`.
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    /// Fetches the catalog into `store`. On failure the previous catalog
    /// is kept and `false` is returned.
    pub async fn load(&self, store: &FilterStore) -> bool {
        match self.api.options().await {
            Ok(catalog) => {
                log::info!(
                    "Loaded options: {} years, {} conditions, {} types, {} phases",
                    catalog.years.len(),
                    catalog.conditions.len(),
                    catalog.types.len(),
                    catalog.phases.len(),
                );
                store.set_catalog(catalog);
                true
            }
            Err(e) => {
                log::warn!("Option catalog unavailable, keeping the previous one: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::endpoint::Endpoint;
    use crate::test_support::{GatedApi, ScriptedApi, segments_body};

    fn year(y: &str) -> FilterState {
        FilterState::new().with_year(y)
    }

    #[tokio::test]
    async fn segments_are_aggregated_into_ready_state() {
        let api = ScriptedApi::default().with(
            Endpoint::KmDistribution,
            json!({ "segments": [
                { "bucketLabel": "0-10", "totalAccidents": 12, "severityIndex": 1.8,
                  "dominantCause": "speeding", "causeCounts": { "speeding": 9, "rain": 3 } },
                { "bucketLabel": "10-20", "totalAccidents": 20, "severityIndex": 2.6,
                  "dominantCause": "overtaking", "causeCounts": { "overtaking": 15 } }
            ]}),
        );
        let view = SegmentView::new(Arc::new(api));

        let outcome = view
            .refresh(&year("2024"), &QueryOverrides::new().road("116"))
            .await;
        assert_eq!(outcome, RefreshOutcome::Applied);

        let state = view.state();
        let analysis = state.ready().unwrap();
        assert_eq!(analysis.causes, vec!["speeding", "rain", "overtaking"]);
        assert_eq!(analysis.insight.as_ref().unwrap().bucket_label, "10-20");
        assert_eq!(view.applied_query().as_deref(), Some("ano=2024&br=116"));
    }

    #[tokio::test]
    async fn zero_records_is_the_empty_state() {
        let api = ScriptedApi::default().with(Endpoint::KmDistribution, json!({ "segments": [] }));
        let view = SegmentView::new(Arc::new(api));
        view.refresh(&FilterState::new(), &QueryOverrides::new()).await;
        assert_eq!(view.state(), ViewState::Empty);
        assert_eq!(view.state().message(), Some(EMPTY_MESSAGE));
    }

    #[tokio::test]
    async fn transport_and_shape_failures_degrade() {
        let view = SegmentView::new(Arc::new(ScriptedApi::default()));
        view.refresh(&FilterState::new(), &QueryOverrides::new()).await;
        assert_eq!(view.state(), ViewState::Failed);
        assert_eq!(view.state().message(), Some(FAILED_MESSAGE));

        let api = ScriptedApi::default().with(Endpoint::KmDistribution, json!("oops"));
        let view = SegmentView::new(Arc::new(api));
        assert_eq!(
            view.refresh(&FilterState::new(), &QueryOverrides::new()).await,
            RefreshOutcome::Applied
        );
        assert_eq!(view.state(), ViewState::Failed);
    }

    #[tokio::test]
    async fn older_response_arriving_last_is_discarded() {
        let (api, mut started) = GatedApi::new();
        let old = api.gate("ano=2023");
        let new = api.gate("ano=2024");
        let view = Arc::new(SegmentView::new(Arc::new(api)));

        let first = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.refresh(&year("2023"), &QueryOverrides::new()).await }
        });
        assert_eq!(started.recv().await.unwrap(), "ano=2023");
        assert!(view.state().is_loading());

        let second = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.refresh(&year("2024"), &QueryOverrides::new()).await }
        });
        assert_eq!(started.recv().await.unwrap(), "ano=2024");

        new.send(segments_body("2024 bucket")).unwrap();
        assert_eq!(second.await.unwrap(), RefreshOutcome::Applied);

        old.send(segments_body("2023 bucket")).unwrap();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Stale);

        let state = view.state();
        assert_eq!(state.ready().unwrap().rows[0].bucket_label, "2024 bucket");
        assert_eq!(view.applied_query().as_deref(), Some("ano=2024"));
    }

    #[tokio::test]
    async fn stale_failure_does_not_clobber_newer_result() {
        let (api, mut started) = GatedApi::new();
        let old = api.gate("ano=2023");
        let new = api.gate("ano=2024");
        let view = Arc::new(SegmentView::new(Arc::new(api)));

        let first = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.refresh(&year("2023"), &QueryOverrides::new()).await }
        });
        started.recv().await.unwrap();
        let second = tokio::spawn({
            let view = Arc::clone(&view);
            async move { view.refresh(&year("2024"), &QueryOverrides::new()).await }
        });
        started.recv().await.unwrap();

        new.send(segments_body("fresh")).unwrap();
        second.await.unwrap();
        // Dropping the gate fails the older request.
        drop(old);
        assert_eq!(first.await.unwrap(), RefreshOutcome::Stale);
        assert!(view.state().ready().is_some());
    }

    #[tokio::test]
    async fn trend_merges_with_client_side_reduction() {
        let api = ScriptedApi::default().with(
            Endpoint::Forecast,
            json!({
                "historical": [{ "date": "2024-01", "value": 40.0 }, { "date": "2024-02", "value": 42.0 }],
                "forecast": [{ "date": "2024-03", "value": 50.0 }],
                "metrics": { "mae": 5.07 },
                "causas_principais": ["Velocidade", "Sono"]
            }),
        );
        let api = Arc::new(api);
        let view = TrendView::new(Arc::clone(&api) as Arc<dyn DashboardApi>);

        let options = MergeOptions::default()
            .with_reduction_factor(0.8)
            .with_uncertainty_margin(4.0);
        view.refresh(&FilterState::new(), &QueryOverrides::new().road("101"), options)
            .await;

        let state = view.state();
        let series = state.ready().unwrap();
        assert_eq!(series.historical().count(), 2);
        let forecast: Vec<_> = series.forecast().collect();
        assert!((forecast[0].value - 40.0).abs() < 1e-9);
        assert!((forecast[0].uncertainty_low.unwrap() - 36.0).abs() < 1e-9);
        assert!((forecast[0].uncertainty_high.unwrap() - 44.0).abs() < 1e-9);
        assert!(series.metrics.is_some());
        assert_eq!(series.causes, vec!["Velocidade", "Sono"]);

        let calls = api.calls();
        assert_eq!(calls, vec![(Endpoint::Forecast, "br=101".to_string())]);
    }

    #[tokio::test]
    async fn trend_without_points_is_empty() {
        let api = ScriptedApi::default().with(Endpoint::Forecast, json!({}));
        let view = TrendView::new(Arc::new(api));
        view.refresh(&FilterState::new(), &QueryOverrides::new(), MergeOptions::default())
            .await;
        assert_eq!(view.state(), ViewState::Empty);
    }

    #[tokio::test]
    async fn catalog_failure_keeps_previous_catalog() {
        let store = FilterStore::new();
        let api = ScriptedApi::default().with(
            Endpoint::Options,
            json!({ "years": [2023, 2024], "conditions": [], "types": [], "phases": ["Noite"] }),
        );
        assert!(CatalogLoader::new(Arc::new(api)).load(&store).await);
        assert_eq!(store.catalog().years, vec!["2023", "2024"]);

        assert!(!CatalogLoader::new(Arc::new(ScriptedApi::default())).load(&store).await);
        assert_eq!(store.catalog().phases, vec!["Noite"]);
    }

    #[test]
    fn idle_view_has_no_message() {
        let view = SegmentView::new(Arc::new(ScriptedApi::default()));
        assert_eq!(view.state(), ViewState::Idle);
        assert!(view.state().message().is_none());
        assert!(view.applied_query().is_none());
    }
}
